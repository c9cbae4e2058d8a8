use std::path::PathBuf;

use enquiry_agent::{guardrails, prompt};
use enquiry_core::config::{AppConfig, LoadOptions};
use enquiry_core::{CharacterRegistry, RegistryError};

use crate::commands::CommandResult;

/// Prints the composed enquiry prompt. `registry` overrides `registry.characters_path`.
pub fn run(service: &str, registry: Option<PathBuf>) -> CommandResult {
    let path = match registry {
        Some(path) => path,
        None => match AppConfig::load(LoadOptions::default()) {
            Ok(config) => config.registry.characters_path,
            Err(error) => {
                return CommandResult::failure("prompt", "config_validation", error.to_string(), 2)
            }
        },
    };

    let registry = match CharacterRegistry::open(&path) {
        Ok(registry) => registry,
        Err(error) => return CommandResult::failure("prompt", "registry", error.to_string(), 2),
    };

    match registry.pick(service) {
        Ok(character) => CommandResult::text(
            0,
            prompt::compose_enquiry_prompt(&character, &guardrails::preamble(&character)),
        ),
        Err(error @ RegistryError::UnknownService(_)) => {
            CommandResult::failure("prompt", "unknown_service", error.to_string(), 1)
        }
        Err(error) => CommandResult::failure("prompt", "registry", error.to_string(), 2),
    }
}
