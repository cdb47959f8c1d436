//! Configuration management for the certificate agent.
//!
//! Configuration is read once at startup from environment variables (a `.env`
//! file in the working directory is loaded first, if present):
//! - `CEDULA` - Required. Identification number used to log into the portal.
//! - `PASSWORD` - Required. Numeric passcode typed on the portal's keypad.
//! - `OPENROUTER_API_KEY` - Required. API key for the inference backend.
//! - `OPENROUTER_BASE_URL` - Optional. Defaults to `https://openrouter.ai/api/v1`.
//! - `DOWNLOADS_DIR` - Optional. Where PDFs are written. Defaults to `/app/Downloads`.
//! - `PRIMARY_MODEL` - Optional. Short name of the first model tried. Defaults to `llama4`.
//! - `ALTERNATE_MODEL` - Optional. Short name of the fallback model. Defaults to `gemini`.
//! - `MODEL_LLAMA4` / `MODEL_GEMINI` - Optional. Override the backend identifiers.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations per attempt. Defaults to `50`.
//! - `MCP_COMMAND` - Optional. Browser tool server executable. Defaults to `node`.
//! - `MCP_ARGS` - Optional. Whitespace-separated arguments. Defaults to `/app/playwright/dist/index.js`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_DOWNLOADS_DIR: &str = "/app/Downloads";
pub const DEFAULT_MCP_COMMAND: &str = "node";
pub const DEFAULT_MCP_ARGS: &str = "/app/playwright/dist/index.js";
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Unknown model name '{0}' (known: {1})")]
    UnknownModel(String, String),
}

/// Portal login credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Identification number (cédula)
    pub cedula: String,
    /// Numeric passcode
    pub password: String,
}

impl Credentials {
    pub fn new(cedula: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            cedula: cedula.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cedula", &self.cedula)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable mapping from a short model name to a backend model identifier.
#[derive(Debug, Clone)]
pub struct ModelTable {
    models: BTreeMap<String, String>,
}

impl ModelTable {
    /// The two models the agent alternates between.
    pub fn defaults() -> Self {
        let mut models = BTreeMap::new();
        models.insert("llama4".to_string(), "meta-llama/llama-4-scout".to_string());
        models.insert(
            "gemini".to_string(),
            "google/gemini-2.0-flash-001".to_string(),
        );
        Self { models }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            models: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up the backend identifier for a short name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.models.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Comma-separated list of short names, for error messages.
    pub fn known_names(&self) -> String {
        self.models.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Sampling settings sent with every model request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSettings {
    pub temperature: Option<f64>,
    pub parallel_tool_calls: Option<bool>,
}

impl ModelSettings {
    /// Low temperature, one tool call per turn.
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.2),
            parallel_tool_calls: Some(false),
        }
    }
}

/// How to launch the browser automation tool server.
#[derive(Debug, Clone)]
pub struct BrowserServerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for BrowserServerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_MCP_COMMAND.to_string(),
            args: vec![DEFAULT_MCP_ARGS.to_string()],
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Portal credentials substituted into the task script
    pub credentials: Credentials,

    /// Inference API key
    pub api_key: String,

    /// Inference API base URL (OpenAI-compatible)
    pub base_url: String,

    /// Directory downloaded certificates are written to
    pub downloads_dir: PathBuf,

    /// Short name -> backend model identifier
    pub models: ModelTable,

    /// Short name of the model used on the first attempt
    pub primary_model: String,

    /// Short name of the model used on retries
    pub alternate_model: String,

    /// Sampling settings
    pub model_settings: ModelSettings,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Browser tool server launch settings
    pub browser: BrowserServerConfig,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `CEDULA`, `PASSWORD` or
    /// `OPENROUTER_API_KEY` is not set, and `ConfigError::InvalidValue` if a
    /// credential is empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Credentials::new(required("CEDULA")?, required("PASSWORD")?);
        let api_key = required("OPENROUTER_API_KEY")?;

        let base_url = std::env::var("OPENROUTER_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidValue("OPENROUTER_BASE_URL".to_string(), e.to_string()))?;

        let downloads_dir = std::env::var("DOWNLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOWNLOADS_DIR));

        let defaults = ModelTable::defaults();
        let models = ModelTable::from_pairs(["llama4", "gemini"].into_iter().map(|key| {
            let var = format!("MODEL_{}", key.to_uppercase());
            let id = std::env::var(&var)
                .unwrap_or_else(|_| defaults.get(key).unwrap_or_default().to_string());
            (key, id)
        }));

        let primary_model = std::env::var("PRIMARY_MODEL").unwrap_or_else(|_| "llama4".to_string());
        let alternate_model =
            std::env::var("ALTERNATE_MODEL").unwrap_or_else(|_| "gemini".to_string());

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| DEFAULT_MAX_ITERATIONS.to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e)))?;

        let browser = BrowserServerConfig {
            command: std::env::var("MCP_COMMAND")
                .unwrap_or_else(|_| DEFAULT_MCP_COMMAND.to_string()),
            args: std::env::var("MCP_ARGS")
                .unwrap_or_else(|_| DEFAULT_MCP_ARGS.to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        };

        let config = Self {
            credentials,
            api_key,
            base_url,
            downloads_dir,
            models,
            primary_model,
            alternate_model,
            model_settings: ModelSettings::deterministic(),
            max_iterations,
            browser,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(credentials: Credentials, api_key: String, downloads_dir: PathBuf) -> Self {
        Self {
            credentials,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            downloads_dir,
            models: ModelTable::defaults(),
            primary_model: "llama4".to_string(),
            alternate_model: "gemini".to_string(),
            model_settings: ModelSettings::deterministic(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            browser: BrowserServerConfig::default(),
        }
    }

    /// Check credentials are non-empty and both selected model names resolve
    /// in the model table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("CEDULA", &self.credentials.cedula),
            ("PASSWORD", &self.credentials.password),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must not be empty".to_string(),
                ));
            }
        }
        for key in [&self.primary_model, &self.alternate_model] {
            if !self.models.contains(key) {
                return Err(ConfigError::UnknownModel(
                    key.clone(),
                    self.models.known_names(),
                ));
            }
        }
        if self.browser.command.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "MCP_COMMAND".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
