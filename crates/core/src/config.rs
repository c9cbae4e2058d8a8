use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub registry: RegistryConfig,
    pub dialogue: DialogueConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub characters_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct DialogueConfig {
    pub enable_eq: bool,
    pub enable_guardrails: bool,
    /// Unset means a parameter is re-asked until answered.
    pub max_reprompts: Option<u32>,
    pub session_ttl_minutes: u64,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub secret: Option<SecretString>,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    Mock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub characters_path: Option<PathBuf>,
    pub webhook_url: Option<String>,
    pub enable_eq: Option<bool>,
    pub enable_guardrails: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8082,
                graceful_shutdown_secs: 15,
            },
            llm: LlmConfig {
                provider: LlmProvider::Mock,
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-1.5-flash".to_string(),
                temperature: 0.35,
                timeout_secs: 30,
                max_retries: 2,
            },
            registry: RegistryConfig { characters_path: PathBuf::from("config/characters.json") },
            dialogue: DialogueConfig {
                enable_eq: true,
                enable_guardrails: true,
                max_reprompts: None,
                session_ttl_minutes: 45,
            },
            webhook: WebhookConfig {
                url: None,
                secret: None,
                max_attempts: 3,
                initial_backoff_ms: 500,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|mock)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("enquiry.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(registry) = patch.registry {
            if let Some(characters_path) = registry.characters_path {
                self.registry.characters_path = characters_path;
            }
        }

        if let Some(dialogue) = patch.dialogue {
            if let Some(enable_eq) = dialogue.enable_eq {
                self.dialogue.enable_eq = enable_eq;
            }
            if let Some(enable_guardrails) = dialogue.enable_guardrails {
                self.dialogue.enable_guardrails = enable_guardrails;
            }
            if let Some(max_reprompts) = dialogue.max_reprompts {
                self.dialogue.max_reprompts = Some(max_reprompts);
            }
            if let Some(session_ttl_minutes) = dialogue.session_ttl_minutes {
                self.dialogue.session_ttl_minutes = session_ttl_minutes;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(url) = webhook.url {
                self.webhook.url = Some(url);
            }
            if let Some(secret) = webhook.secret {
                self.webhook.secret = Some(secret_value(secret));
            }
            if let Some(max_attempts) = webhook.max_attempts {
                self.webhook.max_attempts = max_attempts;
            }
            if let Some(initial_backoff_ms) = webhook.initial_backoff_ms {
                self.webhook.initial_backoff_ms = initial_backoff_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ENQUIRY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("ENQUIRY_SERVER_PORT").or_else(|| read_env("ENQUIRY_PORT"));
        if let Some(value) = port {
            self.server.port = parse_u16("ENQUIRY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ENQUIRY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ENQUIRY_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("ENQUIRY_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ENQUIRY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("ENQUIRY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("ENQUIRY_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("ENQUIRY_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("ENQUIRY_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("ENQUIRY_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("ENQUIRY_REGISTRY_CHARACTERS_PATH") {
            self.registry.characters_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("ENQUIRY_DIALOGUE_ENABLE_EQ") {
            self.dialogue.enable_eq = parse_bool("ENQUIRY_DIALOGUE_ENABLE_EQ", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_DIALOGUE_ENABLE_GUARDRAILS") {
            self.dialogue.enable_guardrails =
                parse_bool("ENQUIRY_DIALOGUE_ENABLE_GUARDRAILS", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_DIALOGUE_MAX_REPROMPTS") {
            self.dialogue.max_reprompts =
                Some(parse_u32("ENQUIRY_DIALOGUE_MAX_REPROMPTS", &value)?);
        }
        if let Some(value) = read_env("ENQUIRY_DIALOGUE_SESSION_TTL_MINUTES") {
            self.dialogue.session_ttl_minutes =
                parse_u64("ENQUIRY_DIALOGUE_SESSION_TTL_MINUTES", &value)?;
        }

        if let Some(value) = read_env("ENQUIRY_WEBHOOK_URL") {
            self.webhook.url = Some(value);
        }
        if let Some(value) = read_env("ENQUIRY_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("ENQUIRY_WEBHOOK_MAX_ATTEMPTS") {
            self.webhook.max_attempts = parse_u32("ENQUIRY_WEBHOOK_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("ENQUIRY_WEBHOOK_INITIAL_BACKOFF_MS") {
            self.webhook.initial_backoff_ms =
                parse_u64("ENQUIRY_WEBHOOK_INITIAL_BACKOFF_MS", &value)?;
        }

        let log_level =
            read_env("ENQUIRY_LOGGING_LEVEL").or_else(|| read_env("ENQUIRY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ENQUIRY_LOGGING_FORMAT").or_else(|| read_env("ENQUIRY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(characters_path) = overrides.characters_path {
            self.registry.characters_path = characters_path;
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.webhook.url = Some(webhook_url);
        }
        if let Some(enable_eq) = overrides.enable_eq {
            self.dialogue.enable_eq = enable_eq;
        }
        if let Some(enable_guardrails) = overrides.enable_guardrails {
            self.dialogue.enable_guardrails = enable_guardrails;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_llm(&self.llm)?;
        validate_registry(&self.registry)?;
        validate_dialogue(&self.dialogue)?;
        validate_webhook(&self.webhook)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("enquiry.toml"), PathBuf::from("config/enquiry.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Gemini => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the gemini provider. Set ENQUIRY_LLM_API_KEY or use provider = \"mock\" for local runs".to_string(),
                ));
            }
            if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
                return Err(ConfigError::Validation(
                    "llm.base_url must start with http:// or https://".to_string(),
                ));
            }
            if llm.model.trim().is_empty() {
                return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
            }
        }
        LlmProvider::Mock => {}
    }

    Ok(())
}

fn validate_registry(registry: &RegistryConfig) -> Result<(), ConfigError> {
    if registry.characters_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "registry.characters_path must point to a character registry JSON file".to_string(),
        ));
    }

    Ok(())
}

fn validate_dialogue(dialogue: &DialogueConfig) -> Result<(), ConfigError> {
    if dialogue.session_ttl_minutes == 0 {
        return Err(ConfigError::Validation(
            "dialogue.session_ttl_minutes must be greater than zero".to_string(),
        ));
    }

    if dialogue.max_reprompts == Some(0) {
        return Err(ConfigError::Validation(
            "dialogue.max_reprompts must be at least 1 when set (omit it for no cap)".to_string(),
        ));
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if let Some(url) = &webhook.url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "webhook.url must start with http:// or https://".to_string(),
            ));
        }
    }

    if webhook.max_attempts == 0 || webhook.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "webhook.max_attempts must be in range 1..=10".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    llm: Option<LlmPatch>,
    registry: Option<RegistryPatch>,
    dialogue: Option<DialoguePatch>,
    webhook: Option<WebhookPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryPatch {
    characters_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DialoguePatch {
    enable_eq: Option<bool>,
    enable_guardrails: Option<bool>,
    max_reprompts: Option<u32>,
    session_ttl_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    url: Option<String>,
    secret: Option<String>,
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn missing_path(dir: &TempDir) -> Option<PathBuf> {
        Some(dir.path().join("absent.toml"))
    }

    #[test]
    fn defaults_match_service_baseline() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: missing_path(&dir), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.server.port == 8082, "default port should be 8082")?;
        ensure(config.dialogue.session_ttl_minutes == 45, "default ttl should be 45 minutes")?;
        ensure(config.dialogue.max_reprompts.is_none(), "reprompts should be unbounded")?;
        ensure(config.webhook.max_attempts == 3, "webhook should retry three times")?;
        ensure(config.webhook.initial_backoff_ms == 500, "webhook backoff should start at 500ms")?;
        ensure(matches!(config.llm.provider, LlmProvider::Mock), "default provider is mock")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ENQUIRY_GEMINI_KEY", "gem-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("enquiry.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "gemini"
api_key = "${TEST_ENQUIRY_GEMINI_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let key = config.llm.api_key.as_ref().map(|key| key.expose_secret().to_string());
            ensure(key.as_deref() == Some("gem-from-env"), "api key should come from env")?;
            Ok(())
        })();

        clear_vars(&["TEST_ENQUIRY_GEMINI_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENQUIRY_LOG_LEVEL", "warn");
        env::set_var("ENQUIRY_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let config = AppConfig::load(LoadOptions {
                config_path: missing_path(&dir),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ENQUIRY_LOG_LEVEL", "ENQUIRY_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENQUIRY_WEBHOOK_URL", "https://env.example/hook");
        env::set_var("ENQUIRY_DIALOGUE_SESSION_TTL_MINUTES", "30");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("enquiry.toml");
            fs::write(
                &path,
                r#"
[server]
port = 9000

[dialogue]
session_ttl_minutes = 10
max_reprompts = 3

[webhook]
url = "https://file.example/hook"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 9000, "file port should override default")?;
            ensure(config.dialogue.max_reprompts == Some(3), "file reprompt cap should apply")?;
            ensure(config.dialogue.session_ttl_minutes == 30, "env ttl should win over file")?;
            ensure(
                config.webhook.url.as_deref() == Some("https://env.example/hook"),
                "env webhook url should win over file",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["ENQUIRY_WEBHOOK_URL", "ENQUIRY_DIALOGUE_SESSION_TTL_MINUTES"]);
        result
    }

    #[test]
    fn gemini_without_api_key_fails_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENQUIRY_LLM_PROVIDER", "gemini");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let error = match AppConfig::load(LoadOptions {
                config_path: missing_path(&dir),
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["ENQUIRY_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENQUIRY_WEBHOOK_MAX_ATTEMPTS", "many");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let error = AppConfig::load(LoadOptions {
                config_path: missing_path(&dir),
                ..LoadOptions::default()
            })
            .err()
            .ok_or_else(|| "expected env override failure".to_string())?;
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "ENQUIRY_WEBHOOK_MAX_ATTEMPTS"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["ENQUIRY_WEBHOOK_MAX_ATTEMPTS"]);
        result
    }

    #[test]
    fn zero_reprompt_cap_is_rejected() {
        let mut config = AppConfig::default();
        config.dialogue.max_reprompts = Some(0);

        let error = config.validate().expect_err("zero cap should be rejected");
        assert!(error.to_string().contains("dialogue.max_reprompts"));
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ENQUIRY_LLM_API_KEY", "gem-secret-value");
        env::set_var("ENQUIRY_WEBHOOK_SECRET", "hook-secret-value");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let config = AppConfig::load(LoadOptions {
                config_path: missing_path(&dir),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gem-secret-value"), "debug output should not contain api key")?;
            ensure(
                !debug.contains("hook-secret-value"),
                "debug output should not contain webhook secret",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["ENQUIRY_LLM_API_KEY", "ENQUIRY_WEBHOOK_SECRET"]);
        result
    }
}
