use enquiry_agent::guardrails;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ScanOutput {
    report: guardrails::GuardrailReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    repaired: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preflight: Option<guardrails::PreflightResult>,
}

/// Exit code 0 when the text is compliant, 1 otherwise.
pub fn run(text: &str, as_prompt: bool) -> CommandResult {
    let report = guardrails::create_report(text);
    let repair = guardrails::smart_repair(text);
    let preflight = as_prompt.then(|| guardrails::preflight_prompt(text));

    let clean = report.compliant && preflight.as_ref().map(|result| result.safe).unwrap_or(true);
    let output = ScanOutput {
        report,
        repaired: repair.changed.then_some(repair.repaired),
        preflight,
    };

    CommandResult::json("scan", if clean { 0 } else { 1 }, &output)
}
