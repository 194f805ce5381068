//! Configuration loading from toolbridge.toml.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "toolbridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub host: HostConfig,
}

/// HTTP listener settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Fixed system turn opening every chat exchange.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            system_prompt: default_system_prompt(),
        }
    }
}

/// LLM backend settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// OpenAI API key. `OPENAI_API_KEY` takes precedence.
    pub api_key: Option<String>,

    /// Completion token cap. Unset leaves it to the API.
    pub max_tokens: Option<u32>,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: None,
            max_tokens: None,
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Tool host settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Command to spawn. Defaults to this executable with `host`.
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Serve the catalog in-process instead of spawning a host.
    #[serde(default)]
    pub embedded: bool,

    #[serde(default = "default_host_timeout")]
    pub timeout_secs: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            embedded: false,
            timeout_secs: default_host_timeout(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_system_prompt() -> String {
    runtime::DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_model() -> String {
    runtime::providers::DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    runtime::providers::DEFAULT_API_BASE.to_string()
}

fn default_backend_timeout() -> u64 {
    runtime::providers::DEFAULT_TIMEOUT.as_secs()
}

fn default_host_timeout() -> u64 {
    runtime::tools::DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if given, else `toolbridge.toml` when present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl BackendConfig {
    /// Resolve the API key: the environment value wins over the file.
    /// Blank values count as unset.
    pub fn resolve_api_key(&self, env: Option<String>) -> Option<String> {
        env.into_iter()
            .chain(self.api_key.clone())
            .find(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HostConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
