//! Heuristic text-to-slot extraction.
//!
//! Rules are looked up by parameter id (optionally narrowed to services). A rule that finds
//! nothing, or a parameter without a rule, falls back to the caller's verbatim text so the
//! dialogue never stalls on parameters lacking a bespoke heuristic.

use once_cell::sync::Lazy;
use regex::Regex;

use enquiry_core::{SlotExtractor, SlotValue};

use crate::text::contains_word;

struct Utterance<'a> {
    raw: &'a str,
    normalized: String,
}

struct ExtractionRule {
    parameters: &'static [&'static str],
    /// Empty means every service.
    services: &'static [&'static str],
    handler: fn(&Utterance<'_>) -> Option<SlotValue>,
}

impl ExtractionRule {
    fn applies(&self, service: &str, parameter_id: &str) -> bool {
        self.parameters.contains(&parameter_id)
            && (self.services.is_empty() || self.services.contains(&service))
    }
}

static RULES: [ExtractionRule; 14] = [
    ExtractionRule { parameters: &["spaceType"], services: &[], handler: space_type },
    ExtractionRule { parameters: &["propertyType"], services: &[], handler: property_type },
    ExtractionRule {
        parameters: &["areaSqft", "totalAreaSqft", "availableRoofAreaSqft"],
        services: &[],
        handler: area,
    },
    ExtractionRule { parameters: &["bhkRoomCount"], services: &[], handler: room_count },
    ExtractionRule { parameters: &["stylePreference"], services: &[], handler: style },
    ExtractionRule {
        parameters: &["floorPlanAvailability"],
        services: &[],
        handler: floor_plan,
    },
    ExtractionRule {
        parameters: &["timeline", "installationTimeline"],
        services: &[],
        handler: timeline,
    },
    ExtractionRule {
        parameters: &["desiredSolarType"],
        services: &["solar_services"],
        handler: solar_type,
    },
    ExtractionRule {
        parameters: &["backupRequirement", "interestedInSubsidy"],
        services: &["solar_services"],
        handler: yes_no,
    },
    ExtractionRule {
        parameters: &["automationFocus"],
        services: &["home_automation"],
        handler: automation_focus,
    },
    ExtractionRule {
        parameters: &["monthlyBillInr"],
        services: &["solar_services"],
        handler: bill_amount,
    },
    ExtractionRule {
        parameters: &["numberOfFloors"],
        services: &["construction"],
        handler: floors,
    },
    ExtractionRule {
        parameters: &["wiringAge"],
        services: &["electrical_services"],
        handler: wiring_age,
    },
    ExtractionRule { parameters: &["roomsToAutomate"], services: &[], handler: verbatim },
];

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("extraction patterns are valid regexes")
}

static SPACE_TYPE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\b(home|house|apartment|flat|villa|office|retail|shop|business|commercial)\b")
});
static PROPERTY_TYPE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"\b(independent house|apartment|villa|office|retail|commercial|industrial|institutional|school|house|business)\b",
    )
});
static AREA: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(\d{1,3}(?:,\d{3})+|\d{3,6})\s*(sq\s*ft|square\s*feet|sq\s*m|m2|yards?|yds?)")
});
// A count must not follow a digit or decimal point.
static BHK: Lazy<Regex> = Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*bhk"));
static BEDROOMS: Lazy<Regex> = Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*bedrooms?"));
static MONTHS: Lazy<Regex> = Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*months?"));
static WEEKS: Lazy<Regex> = Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*weeks?"));
static FLEXIBLE: Lazy<Regex> = Lazy::new(|| pattern(r"\b(flexible|no rush|whenever)\b"));
static SHARE_LATER: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(later|will share|i'll share|ill share|share later)\b"));
static NEGATIVE_PLAN: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(no|nope|don't have|dont have|not available)\b"));
static AFFIRMATIVE_PLAN: Lazy<Regex> =
    Lazy::new(|| pattern(r"\b(yes|yeah|have|available|ready)\b"));
static YES: Lazy<Regex> = Lazy::new(|| pattern(r"\b(yes|yeah|yep|true|sure)\b"));
static NO: Lazy<Regex> = Lazy::new(|| pattern(r"\b(no|nope|false|not required)\b"));
static SOLAR_TYPE: Lazy<Regex> = Lazy::new(|| pattern(r"\b(on[- ]?grid|hybrid|off[- ]?grid)\b"));
static RUPEE_PREFIXED: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?:₹|\brs\.?|\binr)\s*(\d{1,3}(?:,\d{2,3})+|\d+)"));
static RUPEE_SUFFIXED: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(\d{1,3}(?:,\d{2,3})+|\d{3,6})\s*(?:rupees|rs\b|inr\b|/-)")
});
static G_PLUS: Lazy<Regex> = Lazy::new(|| pattern(r"\bg\s*\+\s*(\d{1,2})\b"));
static FLOORS_PLUS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*\+\s*(?:floors?|storeys?)"));
static FLOOR_COUNT: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,2})\s*(?:floors?|storeys?|stories)"));
static GROUND_ONLY: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\b(ground(?: floor)? only|only ground|single (?:floor|storey)|just ground)\b")
});
static YEARS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?:^|[^\d.])(\d{1,3})\s*\+?\s*(?:years?|yrs?)"));
static LIST_DELIMITER: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\s*(?:,|;|\band\b)\s*"));

const STYLES: [(&[&str], &str); 4] = [
    (&["modern", "contemporary", "minimalist", "scandinavian"], "Modern"),
    (&["european", "classic", "traditional", "vintage"], "European/Classic"),
    (&["cozy", "warm", "rustic", "bohemian"], "Cozy & Classic"),
    (&["luxury", "premium", "high-end"], "Luxury"),
];

const AUTOMATION_FOCUS: [(&[&str], &str); 6] = [
    (&["lighting", "ambience", "lights"], "Lighting & Ambience"),
    (&["security", "safety", "cctv", "camera", "cameras"], "Security & Safety"),
    (&["climate", "energy", "ac", "thermostat"], "Climate & Energy"),
    (&["entertainment", "media", "tv", "music"], "Entertainment & Media"),
    (&["whole home", "entire", "whole house"], "Whole Home Suite"),
    (&["not sure", "unsure"], "Not Sure"),
];

const SOLAR_TYPES: [(&str, &str); 3] =
    [("on", "On-grid"), ("hybrid", "Hybrid"), ("off", "Off-grid")];

/// Rule-table extractor used by the dialogue machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleExtractor;

impl SlotExtractor for RuleExtractor {
    fn extract(&self, service: &str, parameter_id: &str, raw_text: &str) -> Option<SlotValue> {
        extract(service, parameter_id, raw_text)
    }
}

/// `None` only for blank input.
pub fn extract(service: &str, parameter_id: &str, raw_text: &str) -> Option<SlotValue> {
    let raw = raw_text.trim();
    if raw.is_empty() {
        return None;
    }
    let utterance = Utterance { raw, normalized: raw.to_lowercase() };

    RULES
        .iter()
        .find(|rule| rule.applies(service, parameter_id))
        .and_then(|rule| (rule.handler)(&utterance))
        .or_else(|| Some(SlotValue::text(raw)))
}

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern.captures(text).and_then(|captures| captures.get(1)).map(|found| found.as_str())
}

fn capture_number(pattern: &Regex, text: &str) -> Option<i64> {
    capture(pattern, text).and_then(|digits| digits.replace(',', "").parse().ok())
}

fn lookup_label(table: &[(&[&str], &'static str)], text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| contains_word(text, keyword)))
        .map(|(_, label)| *label)
}

fn verbatim(utterance: &Utterance<'_>) -> Option<SlotValue> {
    Some(SlotValue::text(utterance.raw))
}

fn space_type(utterance: &Utterance<'_>) -> Option<SlotValue> {
    capture(&SPACE_TYPE, &utterance.normalized).map(SlotValue::text)
}

fn property_type(utterance: &Utterance<'_>) -> Option<SlotValue> {
    capture(&PROPERTY_TYPE, &utterance.normalized).map(SlotValue::text)
}

fn area(utterance: &Utterance<'_>) -> Option<SlotValue> {
    capture_number(&AREA, &utterance.normalized).map(SlotValue::Number)
}

fn room_count(utterance: &Utterance<'_>) -> Option<SlotValue> {
    capture_number(&BHK, &utterance.normalized)
        .or_else(|| capture_number(&BEDROOMS, &utterance.normalized))
        .map(SlotValue::Number)
}

fn style(utterance: &Utterance<'_>) -> Option<SlotValue> {
    lookup_label(&STYLES, &utterance.normalized).map(SlotValue::text)
}

fn floor_plan(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let text = &utterance.normalized;
    let label = if SHARE_LATER.is_match(text) {
        "I'll share later"
    } else if NEGATIVE_PLAN.is_match(text) {
        "No"
    } else if AFFIRMATIVE_PLAN.is_match(text) {
        "Yes"
    } else {
        return None;
    };
    Some(SlotValue::text(label))
}

fn timeline(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let text = &utterance.normalized;
    let plural = |count: i64, unit: &str| {
        if count == 1 {
            format!("1 {unit}")
        } else {
            format!("{count} {unit}s")
        }
    };

    if let Some(months) = capture_number(&MONTHS, text) {
        return Some(SlotValue::Text(plural(months, "month")));
    }
    if let Some(weeks) = capture_number(&WEEKS, text) {
        return Some(SlotValue::Text(plural(weeks, "week")));
    }
    FLEXIBLE.is_match(text).then(|| SlotValue::text("Flexible"))
}

fn solar_type(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let found = capture(&SOLAR_TYPE, &utterance.normalized)?;
    SOLAR_TYPES
        .iter()
        .find(|(prefix, _)| found.starts_with(prefix))
        .map(|(_, label)| SlotValue::text(*label))
}

fn yes_no(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let text = &utterance.normalized;
    if YES.is_match(text) {
        Some(SlotValue::Flag(true))
    } else if NO.is_match(text) {
        Some(SlotValue::Flag(false))
    } else {
        None
    }
}

fn bill_amount(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let text = &utterance.normalized;
    let amounts: Vec<&str> = RUPEE_PREFIXED
        .captures_iter(text)
        .chain(RUPEE_SUFFIXED.captures_iter(text))
        .filter_map(|captures| captures.get(1).map(|found| found.as_str()))
        .collect();

    // A band such as "₹1,500 - ₹3,000" is kept verbatim.
    match amounts.as_slice() {
        [single] => single.replace(',', "").parse().ok().map(SlotValue::Number),
        _ => None,
    }
}

fn floors(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let text = &utterance.normalized;
    if let Some(upper) = capture_number(&G_PLUS, text) {
        return Some(SlotValue::Text(format!("G+{upper}")));
    }
    if let Some(count) = capture_number(&FLOORS_PLUS, text) {
        return Some(SlotValue::Text(format!("{count}+ Floors")));
    }
    if GROUND_ONLY.is_match(text) {
        return Some(SlotValue::text("G"));
    }
    capture_number(&FLOOR_COUNT, text).and_then(|count| match count {
        0 => None,
        1 => Some(SlotValue::text("G")),
        2..=4 => Some(SlotValue::Text(format!("G+{}", count - 1))),
        _ => Some(SlotValue::text("4+ Floors")),
    })
}

fn wiring_age(utterance: &Utterance<'_>) -> Option<SlotValue> {
    capture_number(&YEARS, &utterance.normalized).map(SlotValue::Number)
}

/// One distinct label is returned as text, several as an ordered list.
fn automation_focus(utterance: &Utterance<'_>) -> Option<SlotValue> {
    let segments: Vec<&str> = LIST_DELIMITER
        .split(utterance.raw)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    let labels: Vec<String> = if segments.len() > 1 {
        segments
            .iter()
            .map(|segment| {
                lookup_label(&AUTOMATION_FOCUS, &segment.to_lowercase())
                    .map(str::to_owned)
                    .unwrap_or_else(|| (*segment).to_owned())
            })
            .collect()
    } else {
        AUTOMATION_FOCUS
            .iter()
            .filter(|(keywords, _)| {
                keywords.iter().any(|keyword| contains_word(&utterance.normalized, keyword))
            })
            .map(|(_, label)| (*label).to_owned())
            .collect()
    };

    let mut distinct: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        if !distinct.contains(&label) {
            distinct.push(label);
        }
    }

    match distinct.len() {
        0 => None,
        1 => distinct.pop().map(SlotValue::Text),
        _ => Some(SlotValue::List(distinct)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use enquiry_core::flows::Capture;
    use enquiry_core::{
        DialogueMachine, DialoguePolicy, DialogueSession, ParameterSchemaRegistry, SlotExtractor,
        SlotValue,
    };

    use super::{extract, RuleExtractor, RULES};

    fn text(value: &str) -> Option<SlotValue> {
        Some(SlotValue::text(value))
    }

    #[test]
    fn blank_input_is_absent() {
        assert_eq!(extract("painting", "propertyType", "   "), None);
        assert_eq!(extract("painting", "propertyType", ""), None);
    }

    #[test]
    fn unknown_parameters_keep_verbatim_text() {
        assert_eq!(
            extract("interior_design", "specialZonesFocus", "  Kids Room & Pooja  "),
            text("Kids Room & Pooja")
        );
        assert_eq!(extract("home_automation", "homeType", "Villa"), text("Villa"));
    }

    #[test]
    fn rules_fall_back_to_raw_text_when_nothing_matches() {
        assert_eq!(extract("interior_design", "stylePreference", "Japandi"), text("Japandi"));
        assert_eq!(extract("interior_design", "areaSqft", "about 40 sqft"), text("about 40 sqft"));
    }

    #[test]
    fn areas_parse_digits_with_units() {
        assert_eq!(
            extract("interior_design", "areaSqft", "Roughly 1,200 sq ft"),
            Some(SlotValue::Number(1200))
        );
        assert_eq!(
            extract("solar_services", "availableRoofAreaSqft", "800sqft terrace"),
            Some(SlotValue::Number(800))
        );
        assert_eq!(
            extract("painting", "totalAreaSqft", "2500 square feet"),
            Some(SlotValue::Number(2500))
        );
    }

    #[test]
    fn room_counts_read_bhk_then_bedrooms() {
        assert_eq!(
            extract("interior_design", "bhkRoomCount", "It's a 3BHK"),
            Some(SlotValue::Number(3))
        );
        assert_eq!(
            extract("interior_design", "bhkRoomCount", "2 bedrooms"),
            Some(SlotValue::Number(2))
        );
        assert_eq!(
            extract("interior_design", "bhkRoomCount", "a 10 BHK bungalow"),
            Some(SlotValue::Number(10))
        );
        assert_eq!(
            extract("interior_design", "bhkRoomCount", "12 bedrooms"),
            Some(SlotValue::Number(12))
        );
        assert_eq!(extract("interior_design", "bhkRoomCount", "123 bhk"), text("123 bhk"));
    }

    #[test]
    fn categorical_tables_map_to_canonical_labels() {
        assert_eq!(
            extract("interior_design", "stylePreference", "Something minimalist please"),
            text("Modern")
        );
        assert_eq!(
            extract("interior_design", "stylePreference", "rustic vibes"),
            text("Cozy & Classic")
        );
        assert_eq!(
            extract("solar_services", "desiredSolarType", "Probably OFF GRID"),
            text("Off-grid")
        );
        assert_eq!(extract("interior_design", "spaceType", "My Flat in Pune"), text("flat"));
        assert_eq!(
            extract("electrical_services", "propertyType", "An Independent House"),
            text("independent house")
        );
    }

    #[test]
    fn floor_plan_prefers_later_then_negative() {
        assert_eq!(
            extract("interior_design", "floorPlanAvailability", "No, I'll share later"),
            text("I'll share later")
        );
        assert_eq!(
            extract("interior_design", "floorPlanAvailability", "It's not available"),
            text("No")
        );
        assert_eq!(extract("interior_design", "floorPlanAvailability", "yes I have it"), text("Yes"));
    }

    #[test]
    fn timelines_normalise_units() {
        assert_eq!(extract("construction", "timeline", "within 6 months"), text("6 months"));
        assert_eq!(extract("painting", "timeline", "in 1 week"), text("1 week"));
        assert_eq!(extract("construction", "timeline", "18 months"), text("18 months"));
        assert_eq!(extract("construction", "timeline", "1.5 months"), text("1.5 months"));
        assert_eq!(
            extract("solar_services", "installationTimeline", "no rush at all"),
            text("Flexible")
        );
    }

    #[test]
    fn yes_no_parameters_become_flags() {
        assert_eq!(
            extract("solar_services", "backupRequirement", "Yes, power cuts are frequent"),
            Some(SlotValue::Flag(true))
        );
        assert_eq!(
            extract("solar_services", "interestedInSubsidy", "nope"),
            Some(SlotValue::Flag(false))
        );
        assert_eq!(
            extract("solar_services", "backupRequirement", "Considering later"),
            text("Considering later")
        );
    }

    #[test]
    fn bill_amounts_need_a_single_rupee_figure() {
        assert_eq!(
            extract("solar_services", "monthlyBillInr", "around ₹2,500 a month"),
            Some(SlotValue::Number(2500))
        );
        assert_eq!(
            extract("solar_services", "monthlyBillInr", "4000 rupees"),
            Some(SlotValue::Number(4000))
        );
        assert_eq!(
            extract("solar_services", "monthlyBillInr", "₹1,500 - ₹3,000"),
            text("₹1,500 - ₹3,000")
        );
    }

    #[test]
    fn floors_and_wiring_age_are_normalised() {
        assert_eq!(extract("construction", "numberOfFloors", "g + 2"), text("G+2"));
        assert_eq!(extract("construction", "numberOfFloors", "3 floors"), text("G+2"));
        assert_eq!(extract("construction", "numberOfFloors", "ground only"), text("G"));
        assert_eq!(
            extract("electrical_services", "wiringAge", "about 12 years old"),
            Some(SlotValue::Number(12))
        );
        assert_eq!(extract("construction", "numberOfFloors", "10 floors"), text("4+ Floors"));
        assert_eq!(
            extract("electrical_services", "wiringAge", "over 100 years"),
            Some(SlotValue::Number(100))
        );
    }

    #[test]
    fn automation_focus_returns_single_label_or_list() {
        assert_eq!(
            extract("home_automation", "automationFocus", "Mostly CCTV"),
            text("Security & Safety")
        );
        assert_eq!(
            extract("home_automation", "automationFocus", "security and safety"),
            text("Security & Safety")
        );
        assert_eq!(
            extract("home_automation", "automationFocus", "Lighting, cameras and AC"),
            Some(SlotValue::List(vec![
                "Lighting & Ambience".to_owned(),
                "Security & Safety".to_owned(),
                "Climate & Energy".to_owned(),
            ]))
        );
        assert_eq!(
            extract("home_automation", "automationFocus", "Lighting, garden sprinklers"),
            Some(SlotValue::List(vec![
                "Lighting & Ambience".to_owned(),
                "garden sprinklers".to_owned(),
            ]))
        );
        assert_eq!(
            extract("home_automation", "automationFocus", "robot vacuum"),
            text("robot vacuum")
        );
    }

    #[test]
    fn lighting_and_security_selects_both_categories() {
        assert_eq!(
            extract("home_automation", "automationFocus", "lighting and security"),
            Some(SlotValue::List(vec![
                "Lighting & Ambience".to_owned(),
                "Security & Safety".to_owned(),
            ]))
        );
    }

    #[test]
    fn property_type_ignores_trailing_home() {
        assert_eq!(
            extract("solar_services", "propertyType", "it's an independent house for my home"),
            text("independent house")
        );
    }

    #[test]
    fn solar_walk_captures_property_type_then_asks_roof() {
        let machine = DialogueMachine::new(
            Arc::new(ParameterSchemaRegistry::builtin()),
            DialoguePolicy::default(),
        );
        let session = DialogueSession::new("solar_services", "solar-asha");

        let opened = machine.advance(&session, "hi, I want solar", &RuleExtractor).expect("trigger");
        assert_eq!(opened.capture, Capture::Trigger);
        assert_eq!(opened.next_parameter.map(|p| p.id), Some("propertyType".to_owned()));

        let answered = machine
            .advance(&opened.session, "it's an independent house for my home", &RuleExtractor)
            .expect("answer");
        assert_eq!(
            answered.capture,
            Capture::Captured {
                parameter_id: "propertyType".to_owned(),
                value: SlotValue::text("independent house"),
            }
        );
        assert_eq!(
            answered.session.parameters.get("propertyType"),
            Some(&SlotValue::text("independent house"))
        );
        assert_eq!(answered.next_parameter.clone().map(|p| p.id), Some("roofTypeOrientation".to_owned()));
        assert!(!answered.is_completed());
    }

    #[test]
    fn service_scoped_rules_do_not_leak() {
        assert_eq!(
            extract("painting", "automationFocus", "lighting and tv"),
            text("lighting and tv")
        );
    }

    #[test]
    fn extractor_trait_delegates_to_rules() {
        assert_eq!(RuleExtractor.extract("painting", "timeline", "2 months"), text("2 months"));
        assert!(RULES.iter().all(|rule| !rule.parameters.is_empty()));
    }
}
