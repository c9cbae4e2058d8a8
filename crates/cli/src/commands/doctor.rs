use std::collections::BTreeSet;

use enquiry_core::config::{AppConfig, LlmProvider, LoadOptions};
use enquiry_core::{CharacterRegistry, ParameterSchemaRegistry};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => build_report(Ok(&config)),
        Err(error) => build_report(Err(error.to_string())),
    };
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        return CommandResult::json("doctor", exit_code, &report);
    }

    CommandResult::text(exit_code, render_human(&report))
}

pub fn build_report(config: Result<&AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_provider(config));
            match CharacterRegistry::open(&config.registry.characters_path) {
                Ok(registry) => {
                    checks.push(DoctorCheck {
                        name: "character_registry",
                        status: CheckStatus::Pass,
                        details: format!(
                            "loaded `{}`",
                            config.registry.characters_path.display()
                        ),
                    });
                    checks.push(check_service_coverage(&registry));
                }
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "character_registry",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                    checks.push(skipped("service_coverage", "character registry did not load"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            checks.push(skipped("llm_provider", "configuration did not load"));
            checks.push(skipped("character_registry", "configuration did not load"));
            checks.push(skipped("service_coverage", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn check_llm_provider(config: &AppConfig) -> DoctorCheck {
    let details = match config.llm.provider {
        LlmProvider::Mock => "mock provider; questions are generated offline".to_string(),
        LlmProvider::Gemini => {
            format!("gemini `{}` via {} (api key configured)", config.llm.model, config.llm.base_url)
        }
    };
    DoctorCheck { name: "llm_provider", status: CheckStatus::Pass, details }
}

fn check_service_coverage(registry: &CharacterRegistry) -> DoctorCheck {
    let configured: BTreeSet<String> = match registry.services() {
        Ok(services) => services.into_iter().collect(),
        Err(error) => {
            return DoctorCheck {
                name: "service_coverage",
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    };

    let schemas = ParameterSchemaRegistry::builtin();
    let missing: Vec<&str> =
        schemas.services().filter(|service| !configured.contains(*service)).collect();
    if missing.is_empty() {
        DoctorCheck {
            name: "service_coverage",
            status: CheckStatus::Pass,
            details: format!("{} services have a character", configured.len()),
        }
    } else {
        DoctorCheck {
            name: "service_coverage",
            status: CheckStatus::Fail,
            details: format!("no character for: {}", missing.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
