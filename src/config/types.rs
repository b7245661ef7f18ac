use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory - computed from home, not serialized
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub default_temperature: f64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub refinement: RefinementConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_log_level() -> String {
    "info".into()
}

/// Model call bounds and per-role temperatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_stock_temperature")]
    pub stock_temperature: f64,
    #[serde(default = "default_writer_temperature")]
    pub writer_temperature: f64,
    #[serde(default)]
    pub judge_temperature: f64,
    /// Base URL for a local Ollama server.
    #[serde(default)]
    pub ollama_url: Option<String>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_stock_temperature() -> f64 {
    0.3
}

fn default_writer_temperature() -> f64 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            stock_temperature: default_stock_temperature(),
            writer_temperature: default_writer_temperature(),
            judge_temperature: 0.0,
            ollama_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on graph steps per run or resume.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default = "default_refinement_provider")]
    pub provider: String,
    #[serde(default = "default_refinement_model")]
    pub model: String,
    /// Drafts scoring at or above this value end the loop.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_revisions")]
    pub max_revisions: u32,
}

fn default_refinement_provider() -> String {
    "ollama".into()
}

fn default_refinement_model() -> String {
    "deepseek-v3.1".into()
}

fn default_threshold() -> f64 {
    7.0
}

fn default_max_revisions() -> u32 {
    3
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            provider: default_refinement_provider(),
            model: default_refinement_model(),
            threshold: default_threshold(),
            max_revisions: default_max_revisions(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_session_backend")]
    pub backend: SessionBackend,
    #[serde(default = "default_session_db")]
    pub db_path: String,
}

fn default_session_backend() -> SessionBackend {
    SessionBackend::Sqlite
}

fn default_session_db() -> String {
    "~/.graphmind/sessions.db".into()
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            db_path: default_session_db(),
        }
    }
}

impl SessionsConfig {
    /// Session database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
    #[serde(default = "default_market_data_endpoint")]
    pub market_data_endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

fn default_search_endpoint() -> String {
    "https://api.duckduckgo.com".into()
}

fn default_market_data_endpoint() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_max_search_results() -> usize {
    5
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_endpoint: default_search_endpoint(),
            market_data_endpoint: default_market_data_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            max_search_results: default_max_search_results(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let graphmind_dir = home.join(".graphmind");

        Self {
            data_dir: graphmind_dir.clone(),
            config_path: graphmind_dir.join("config.toml"),
            api_key: None,
            default_provider: Some("groq".to_string()),
            default_model: Some("openai/gpt-oss-120b".to_string()),
            default_temperature: 0.8,
            log_level: default_log_level(),
            model: ModelConfig::default(),
            agent: AgentConfig::default(),
            refinement: RefinementConfig::default(),
            sessions: SessionsConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

fn validate_temperature(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=2.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{field} must be within 0.0..=2.0 (got {value})"
        )))
    }
}

fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_temperature("default_temperature", self.default_temperature)?;
        validate_temperature("model.stock_temperature", self.model.stock_temperature)?;
        validate_temperature("model.writer_temperature", self.model.writer_temperature)?;
        validate_temperature("model.judge_temperature", self.model.judge_temperature)?;

        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "model.timeout_secs must be >= 1".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Validation("agent.max_steps must be >= 1".into()));
        }
        if self.refinement.max_revisions == 0 {
            return Err(ConfigError::Validation(
                "refinement.max_revisions must be >= 1".into(),
            ));
        }
        if !(0.0..=10.0).contains(&self.refinement.threshold) {
            return Err(ConfigError::Validation(format!(
                "refinement.threshold must be within 0.0..=10.0 (got {})",
                self.refinement.threshold
            )));
        }
        if self.tools.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tools.request_timeout_secs must be >= 1".into(),
            ));
        }

        validate_endpoint("tools.search_endpoint", &self.tools.search_endpoint)?;
        validate_endpoint(
            "tools.market_data_endpoint",
            &self.tools.market_data_endpoint,
        )?;
        if let Some(url) = &self.model.ollama_url {
            validate_endpoint("model.ollama_url", url)?;
        }
        Ok(())
    }

    pub fn provider_name(&self) -> &str {
        self.default_provider.as_deref().unwrap_or("groq")
    }

    pub fn model_name(&self) -> &str {
        self.default_model
            .as_deref()
            .unwrap_or("openai/gpt-oss-120b")
    }
}
