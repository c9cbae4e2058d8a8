use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use enquiry_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in effective_fields(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());
    let secret = |present: bool| (if present { "<redacted>" } else { "<unset>" }).to_string();

    vec![
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["ENQUIRY_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["ENQUIRY_SERVER_PORT", "ENQUIRY_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["ENQUIRY_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field("llm.provider", format!("{:?}", config.llm.provider), &["ENQUIRY_LLM_PROVIDER"]),
        field("llm.model", config.llm.model.clone(), &["ENQUIRY_LLM_MODEL"]),
        field("llm.base_url", config.llm.base_url.clone(), &["ENQUIRY_LLM_BASE_URL"]),
        field("llm.api_key", secret(config.llm.api_key.is_some()), &["ENQUIRY_LLM_API_KEY"]),
        field("llm.temperature", config.llm.temperature.to_string(), &["ENQUIRY_LLM_TEMPERATURE"]),
        field("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["ENQUIRY_LLM_TIMEOUT_SECS"]),
        field("llm.max_retries", config.llm.max_retries.to_string(), &["ENQUIRY_LLM_MAX_RETRIES"]),
        field(
            "registry.characters_path",
            config.registry.characters_path.display().to_string(),
            &["ENQUIRY_REGISTRY_CHARACTERS_PATH"],
        ),
        field(
            "dialogue.enable_eq",
            config.dialogue.enable_eq.to_string(),
            &["ENQUIRY_DIALOGUE_ENABLE_EQ"],
        ),
        field(
            "dialogue.enable_guardrails",
            config.dialogue.enable_guardrails.to_string(),
            &["ENQUIRY_DIALOGUE_ENABLE_GUARDRAILS"],
        ),
        field(
            "dialogue.max_reprompts",
            optional(config.dialogue.max_reprompts.map(|value| value.to_string())),
            &["ENQUIRY_DIALOGUE_MAX_REPROMPTS"],
        ),
        field(
            "dialogue.session_ttl_minutes",
            config.dialogue.session_ttl_minutes.to_string(),
            &["ENQUIRY_DIALOGUE_SESSION_TTL_MINUTES"],
        ),
        field("webhook.url", optional(config.webhook.url.clone()), &["ENQUIRY_WEBHOOK_URL"]),
        field("webhook.secret", secret(config.webhook.secret.is_some()), &["ENQUIRY_WEBHOOK_SECRET"]),
        field(
            "webhook.max_attempts",
            config.webhook.max_attempts.to_string(),
            &["ENQUIRY_WEBHOOK_MAX_ATTEMPTS"],
        ),
        field(
            "webhook.initial_backoff_ms",
            config.webhook.initial_backoff_ms.to_string(),
            &["ENQUIRY_WEBHOOK_INITIAL_BACKOFF_MS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["ENQUIRY_LOGGING_LEVEL", "ENQUIRY_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ENQUIRY_LOGGING_FORMAT", "ENQUIRY_LOG_FORMAT"],
        ),
    ]
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("enquiry.toml"), PathBuf::from("config/enquiry.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use enquiry_core::config::AppConfig;
    use secrecy::SecretString;

    use super::{contains_path, effective_fields, field_source};

    #[test]
    fn secrets_are_redacted() {
        let mut config = AppConfig::default();
        config.webhook.secret = Some(SecretString::from("hook-secret".to_string()));

        let fields = effective_fields(&config);
        let secret = fields.iter().find(|(key, _, _)| *key == "webhook.secret").expect("field");
        let api_key = fields.iter().find(|(key, _, _)| *key == "llm.api_key").expect("field");

        assert_eq!(secret.1, "<redacted>");
        assert_eq!(api_key.1, "<unset>");
        assert!(fields.iter().all(|(_, value, _)| !value.contains("hook-secret")));
    }

    #[test]
    fn file_source_is_reported_for_present_keys() {
        let doc: toml::Value = "[dialogue]\nenable_eq = false\n".parse().expect("toml");

        assert!(contains_path(&doc, "dialogue.enable_eq"));
        assert!(!contains_path(&doc, "dialogue.max_reprompts"));
        assert_eq!(
            field_source("dialogue.enable_eq", &["ENQUIRY_TEST_UNSET_KEY"], Some(&doc), None),
            "file (config file)"
        );
        assert_eq!(field_source("webhook.url", &[], Some(&doc), None), "default");
    }
}
