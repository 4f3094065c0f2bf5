//! Settings for aiagent.
//!
//! Settings are built once at startup and passed by reference to whatever
//! needs them. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `aiagent.toml` in the working directory
//! 3. process environment (a `.env` file is loaded into it first, without
//!    overriding variables that are already set)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "aiagent.toml";

/// Dotenv file looked up in the working directory.
pub const ENV_FILE: &str = ".env";

/// Environment variables recognized by [`Settings`].
const ENV_KEYS: &[&str] = &[
    "PROJECT_NAME",
    "API_V1_STR",
    "SECRET_KEY",
    "ALGORITHM",
    "ACCESS_TOKEN_EXPIRE_MINUTES",
    "DEFAULT_LLM_PROVIDER",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
    "OLLAMA_BASE_URL",
    "OLLAMA_MODEL_NAME",
    "AGENT_MAX_ITERATIONS",
    "LOG_DIR",
    "LOG_FILE",
];

/// Process-wide settings.
#[derive(Debug)]
pub struct Settings {
    /// Project name, used in logs
    pub project_name: String,
    /// API prefix of the HTTP surface
    pub api_v1_str: String,
    /// Token signing secret (required)
    pub secret_key: SecretString,
    /// Token signing algorithm
    pub algorithm: String,
    /// Access token lifetime in minutes
    pub access_token_expire_minutes: u64,
    /// Provider used when none is named explicitly
    pub default_llm_provider: String,
    /// API key sent to OpenAI-compatible endpoints (Ollama accepts any value)
    pub openai_api_key: SecretString,
    /// API key for Gemini
    pub gemini_api_key: SecretString,
    /// Ollama server URL
    pub ollama_base_url: String,
    /// Ollama model identifier
    pub ollama_model_name: String,
    /// Upper bound on model turns per agent run
    pub agent_max_iterations: usize,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Log file name inside `log_dir`
    pub log_file: String,
}

/// Wire shape of [`Settings`]; secrets are still plain strings here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RawSettings {
    project_name: String,
    api_v1_str: String,
    secret_key: Option<String>,
    algorithm: String,
    access_token_expire_minutes: u64,
    default_llm_provider: String,
    openai_api_key: String,
    gemini_api_key: String,
    ollama_base_url: String,
    ollama_model_name: String,
    agent_max_iterations: usize,
    log_dir: PathBuf,
    log_file: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            project_name: "ai-agent".to_string(),
            api_v1_str: "/api/v1".to_string(),
            secret_key: None,
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 60 * 24 * 7,
            default_llm_provider: "ollama".to_string(),
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model_name: "qwq:32b".to_string(),
            agent_max_iterations: 10,
            log_dir: PathBuf::from("logs"),
            log_file: "app.log".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from defaults and a signing secret.
    ///
    /// Useful for tests and embedders that do not read the environment.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self::assemble(RawSettings::default(), secret_key.into())
    }

    /// Load settings from the working directory and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(SETTINGS_FILE), Path::new(ENV_FILE))
    }

    /// Load settings from explicit file locations.
    pub fn load_from(settings_file: &Path, env_file: &Path) -> Result<Self> {
        match dotenvy::from_path(env_file) {
            Ok(()) => tracing::debug!(path = %env_file.display(), "Loaded env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("{}: {}", env_file.display(), e))),
        }

        Self::from_figment(Self::figment(settings_file))
    }

    /// The layered figment without any `.env` handling.
    pub fn figment(settings_file: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(settings_file))
            .merge(Env::raw().only(ENV_KEYS))
    }

    /// Extract and validate settings from a figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let raw: RawSettings = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        let settings = Self::from_raw(raw)?;

        let result = settings.validate();
        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Settings validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        Ok(settings)
    }

    /// Log every validation warning; returns how many there were.
    ///
    /// Loading does not log warnings itself, since it normally runs before
    /// the subscriber is installed. Call this once logging is up.
    pub fn log_warnings(&self) -> usize {
        let result = self.validate();
        let warnings = result.warnings();
        for warning in &warnings {
            tracing::warn!("Settings warning - {}: {}", warning.field, warning.message);
        }
        warnings.len()
    }

    fn from_raw(mut raw: RawSettings) -> Result<Self> {
        let secret_key = raw
            .secret_key
            .take()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("SECRET_KEY is required".to_string()))?;

        Ok(Self::assemble(raw, secret_key))
    }

    fn assemble(raw: RawSettings, secret_key: String) -> Self {
        Self {
            project_name: raw.project_name,
            api_v1_str: raw.api_v1_str,
            secret_key: SecretString::from(secret_key),
            algorithm: raw.algorithm,
            access_token_expire_minutes: raw.access_token_expire_minutes,
            default_llm_provider: raw.default_llm_provider,
            openai_api_key: SecretString::from(raw.openai_api_key),
            gemini_api_key: SecretString::from(raw.gemini_api_key),
            ollama_base_url: raw.ollama_base_url,
            ollama_model_name: raw.ollama_model_name,
            agent_max_iterations: raw.agent_max_iterations,
            log_dir: raw.log_dir,
            log_file: raw.log_file,
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.default_llm_provider.is_empty() {
            result.add_error("default_llm_provider", "Provider name cannot be empty");
        }

        if self.ollama_model_name.is_empty() {
            result.add_error("ollama_model_name", "Model name cannot be empty");
        }

        if !is_http_url(&self.ollama_base_url) {
            result.add_error(
                "ollama_base_url",
                "base_url must start with http:// or https://",
            );
        }

        if self.agent_max_iterations == 0 {
            result.add_error(
                "agent_max_iterations",
                "agent_max_iterations must be greater than 0",
            );
        }

        if self.access_token_expire_minutes == 0 {
            result.add_warning(
                "access_token_expire_minutes",
                "tokens expire immediately",
            );
        }

        if self.default_llm_provider == "gemini" && self.gemini_api_key.expose_secret().is_empty() {
            result.add_warning("gemini_api_key", "API key is empty string");
        }

        if self.log_file.is_empty() {
            result.add_error("log_file", "log_file cannot be empty");
        }

        result
    }

    /// Full path of the log file.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }
}

/// Configuration of one provider adapter.
///
/// Immutable once the adapter has been constructed.
#[derive(Debug)]
pub struct ProviderSettings {
    /// Registry name of the provider
    pub provider_name: String,
    /// Model identifier sent to the endpoint
    pub model_name: String,
    /// Endpoint base URL (OpenAI-compatible, without `/chat/completions`)
    pub base_url: String,
    /// Bearer token
    pub api_key: SecretString,
    /// Sampling temperature
    pub temperature: f32,
    /// Retries for transient failures, on top of the first attempt
    pub max_retries: u32,
}

impl ProviderSettings {
    /// Apply per-call overrides.
    pub fn with_overrides(mut self, overrides: ProviderOverrides) -> Self {
        if let Some(model) = overrides.model_name {
            self.model_name = model;
        }
        if let Some(url) = overrides.base_url {
            self.base_url = url;
        }
        if let Some(key) = overrides.api_key {
            self.api_key = key;
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(retries) = overrides.max_retries {
            self.max_retries = retries;
        }
        self
    }

    /// Copy these settings, secret included.
    pub fn duplicate(&self) -> Self {
        Self {
            provider_name: self.provider_name.clone(),
            model_name: self.model_name.clone(),
            base_url: self.base_url.clone(),
            api_key: clone_secret(&self.api_key),
            temperature: self.temperature,
            max_retries: self.max_retries,
        }
    }
}

/// Optional overrides applied on top of a provider's defaults.
#[derive(Debug, Default)]
pub struct ProviderOverrides {
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub temperature: Option<f32>,
    pub max_retries: Option<u32>,
}

impl ProviderOverrides {
    /// No overrides.
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    /// Override the endpoint URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Override the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the retry count.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}

/// Copy a secret without exposing it anywhere but the new box.
pub fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Settings field name
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}
