//! Business-safety rules applied to generated assistant text.
//!
//! Every [`ViolationKind`] owns exactly one row of the rule table: a detection pattern,
//! a severity, a neutral replacement phrase and a disclaimer paragraph. New categories
//! are added as rows, never as branches in `repair`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use enquiry_core::Character;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationKind {
    #[serde(rename = "pricing:exact")]
    PricingExact,
    #[serde(rename = "legal:promise")]
    LegalPromise,
    #[serde(rename = "vendor:bias")]
    VendorBias,
    #[serde(rename = "privacy:leak")]
    PrivacyLeak,
    #[serde(rename = "unsafe:advice")]
    UnsafeAdvice,
    #[serde(rename = "timeline:guarantee")]
    TimelineGuarantee,
    #[serde(rename = "approval:guarantee")]
    ApprovalGuarantee,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 7] = [
        Self::PricingExact,
        Self::LegalPromise,
        Self::VendorBias,
        Self::PrivacyLeak,
        Self::UnsafeAdvice,
        Self::TimelineGuarantee,
        Self::ApprovalGuarantee,
    ];

    pub fn tag(&self) -> &'static str {
        self.rule().tag
    }

    pub fn severity(&self) -> Severity {
        self.rule().severity
    }

    fn index(&self) -> usize {
        match self {
            Self::PricingExact => 0,
            Self::LegalPromise => 1,
            Self::VendorBias => 2,
            Self::PrivacyLeak => 3,
            Self::UnsafeAdvice => 4,
            Self::TimelineGuarantee => 5,
            Self::ApprovalGuarantee => 6,
        }
    }

    fn rule(&self) -> &'static GuardrailRule {
        &RULES[self.index()]
    }

    fn pattern(&self) -> &'static Regex {
        &PATTERNS[self.index()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

struct GuardrailRule {
    kind: ViolationKind,
    tag: &'static str,
    pattern: &'static str,
    severity: Severity,
    replacement: &'static str,
    disclaimer: &'static str,
}

const APPROVAL_NOTE: &str = "**Note:** Approval timelines depend on local authorities. We'll guide you through the process but cannot guarantee specific outcomes or timelines.";
const APPROVAL_SUPPORT: &str = "will assist with and support the approval process";

static RULES: [GuardrailRule; 7] = [
    GuardrailRule {
        kind: ViolationKind::PricingExact,
        tag: "pricing:exact",
        pattern: r"(?i)(?:₹|\brs\.?|\binr)[,\s]*\d{1,3}(?:,\d{2,3})*(?:\.\d+)?(?:\s*(?:lakh|lac|cr|crore)s?)?",
        severity: Severity::Medium,
        replacement: "a budget range based on materials, scope, and market rates",
        disclaimer: "**Note:** Exact pricing isn't provided at this stage. We'll share a detailed Bill of Quantities (BOQ) after site assessment and requirement finalization.",
    },
    GuardrailRule {
        kind: ViolationKind::LegalPromise,
        tag: "legal:promise",
        pattern: r"(?i)\b(?:guarantee[sd]?|promise[sd]?|assure[sd]?|certif(?:y|ied))\s+(?:approval|permit|license|clearance|sanction)",
        severity: Severity::High,
        replacement: APPROVAL_SUPPORT,
        disclaimer: APPROVAL_NOTE,
    },
    GuardrailRule {
        kind: ViolationKind::VendorBias,
        tag: "vendor:bias",
        pattern: r"(?i)\b(?:only use|must use|exclusively|always choose)\s+(?:brand|vendor|supplier|manufacturer)\s+\w+",
        severity: Severity::Medium,
        replacement: "will recommend from our panel of certified vendors",
        disclaimer: "**Note:** We maintain vendor neutrality and will provide multiple certified options for your consideration.",
    },
    GuardrailRule {
        kind: ViolationKind::PrivacyLeak,
        tag: "privacy:leak",
        pattern: r"(?i)\b(?:password|api[-_]?key|token|secret|private[-_]?key|camera\s+feed|live\s+stream|admin\s+portal)",
        severity: Severity::High,
        replacement: "[REDACTED - SENSITIVE INFORMATION]",
        disclaimer: "**Security Note:** Sensitive credentials and access information are never shared through this channel.",
    },
    GuardrailRule {
        kind: ViolationKind::UnsafeAdvice,
        tag: "unsafe:advice",
        pattern: r"(?i)\b(?:skip|bypass|ignore|disable)\s+(?:safety|security|compliance|permit|inspection)",
        severity: Severity::High,
        replacement: "ensure proper compliance with safety and regulatory requirements for",
        disclaimer: "**Safety Note:** All projects must comply with applicable safety standards and building codes.",
    },
    GuardrailRule {
        kind: ViolationKind::TimelineGuarantee,
        tag: "timeline:guarantee",
        pattern: r"(?i)\b(?:definitely|guaranteed|certainly|will\s+(?:be\s+)?complete[sd]?)\s+(?:in|within|by)\s+\d+\s+(?:day|week|month)s?",
        severity: Severity::Medium,
        replacement: "is typically completed within the estimated timeframe, subject to factors like weather, material availability, and approvals",
        disclaimer: "**Note:** Timelines are estimates and may vary based on external factors beyond our control.",
    },
    GuardrailRule {
        kind: ViolationKind::ApprovalGuarantee,
        tag: "approval:guarantee",
        pattern: r"(?i)\b(?:will\s+(?:definitely\s+)?get|guaranteed|assured)\s+(?:approval|permit|clearance|sanction|noc)",
        severity: Severity::High,
        replacement: APPROVAL_SUPPORT,
        disclaimer: APPROVAL_NOTE,
    },
];

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| Regex::new(rule.pattern).expect("guardrail patterns are valid regexes"))
        .collect()
});

static PREFLIGHT_CHECKS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(?i)\b(?:tell|give|provide)\s+(?:exact|specific)\s+price",
            "Prompt requests exact pricing - this may lead to violations",
        ),
        (
            r"(?i)\b(?:guarantee|promise|assure)\b",
            "Prompt contains guarantee language - may trigger violations",
        ),
        (r"(?i)\b(?:best|only|always)\s+(?:vendor|brand|supplier)", "Prompt may encourage vendor bias"),
    ]
    .into_iter()
    .map(|(pattern, warning)| {
        (Regex::new(pattern).expect("preflight patterns are valid regexes"), warning)
    })
    .collect()
});

const UNIVERSAL_GUARDRAILS: [&str; 6] = [
    "Always maintain professional and ethical standards",
    "Provide ranges and estimates, not exact prices",
    "Never guarantee government approvals or timelines",
    "Respect privacy and data security",
    "Promote safety and compliance",
    "Remain vendor-neutral unless explicitly authorized",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationDetail {
    pub kind: ViolationKind,
    pub matches: Vec<String>,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub kind: ViolationKind,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartRepair {
    pub repaired: String,
    pub violations: Vec<ViolationSummary>,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub issues: Vec<ViolationDetail>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCount {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailReport {
    pub scanned_at: DateTime<Utc>,
    pub text_length: usize,
    pub violations: Vec<ViolationCount>,
    pub compliant: bool,
    pub requires_repair: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightResult {
    pub safe: bool,
    pub warnings: Vec<String>,
}

/// Guardrail block injected into system prompts: the universal rules followed by the
/// character's own.
pub fn preamble(character: &Character) -> String {
    let rules: Vec<String> = UNIVERSAL_GUARDRAILS
        .iter()
        .map(|rule| (*rule).to_owned())
        .chain(character.guardrails.iter().cloned())
        .enumerate()
        .map(|(index, rule)| format!("{}. {rule}", index + 1))
        .collect();

    format!("[CRITICAL GUARDRAILS]\n{}", rules.join("\n"))
}

/// Matched kinds in table order.
pub fn scan(text: &str) -> Vec<ViolationKind> {
    ViolationKind::ALL.into_iter().filter(|kind| kind.pattern().is_match(text)).collect()
}

pub fn scan_detailed(text: &str) -> Vec<ViolationDetail> {
    ViolationKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let mut seen = BTreeSet::new();
            let matches: Vec<String> = kind
                .pattern()
                .find_iter(text)
                .map(|found| found.as_str().to_owned())
                .filter(|found| seen.insert(found.clone()))
                .collect();
            (!matches.is_empty()).then(|| ViolationDetail {
                kind,
                matches,
                severity: kind.severity(),
            })
        })
        .collect()
}

/// Replaces the first match of each listed kind with its neutral phrase and appends the
/// kind's disclaimer. Shared disclaimers are appended once.
pub fn repair(text: &str, kinds: &[ViolationKind]) -> String {
    let mut repaired = text.to_owned();
    let mut disclaimers: Vec<&'static str> = Vec::new();

    for kind in kinds {
        let rule = kind.rule();
        repaired = kind.pattern().replace(&repaired, rule.replacement).into_owned();
        if !disclaimers.contains(&rule.disclaimer) {
            disclaimers.push(rule.disclaimer);
        }
    }

    for disclaimer in disclaimers {
        repaired.push_str("\n\n");
        repaired.push_str(disclaimer);
    }
    repaired
}

/// Repairs every detected kind in one pass. Only the first match of each kind is rewritten,
/// so text with several matches of one kind still violates afterwards.
pub fn smart_repair(text: &str) -> SmartRepair {
    let detailed = scan_detailed(text);
    if detailed.is_empty() {
        return SmartRepair { repaired: text.to_owned(), violations: Vec::new(), changed: false };
    }

    let kinds: Vec<ViolationKind> = detailed.iter().map(|detail| detail.kind).collect();
    SmartRepair {
        repaired: repair(text, &kinds),
        violations: detailed
            .iter()
            .map(|detail| ViolationSummary { kind: detail.kind, severity: detail.severity })
            .collect(),
        changed: true,
    }
}

pub fn validate(text: &str) -> ComplianceReport {
    let issues = scan_detailed(text);
    ComplianceReport { compliant: issues.is_empty(), issues }
}

pub fn create_report(text: &str) -> GuardrailReport {
    let detailed = scan_detailed(text);
    GuardrailReport {
        scanned_at: Utc::now(),
        text_length: text.chars().count(),
        violations: detailed
            .iter()
            .map(|detail| ViolationCount {
                kind: detail.kind,
                severity: detail.severity,
                count: detail.matches.len(),
            })
            .collect(),
        compliant: detailed.is_empty(),
        requires_repair: detailed.iter().any(|detail| detail.severity == Severity::High),
    }
}

/// Flags prompt wording that tends to provoke violations.
pub fn preflight_prompt(prompt: &str) -> PreflightResult {
    let warnings: Vec<String> = PREFLIGHT_CHECKS
        .iter()
        .filter(|(pattern, _)| pattern.is_match(prompt))
        .map(|(_, warning)| (*warning).to_owned())
        .collect();
    PreflightResult { safe: warnings.is_empty(), warnings }
}
