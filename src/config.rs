//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, the config file (`--config`
//! or `CHAT_CONFIG`, else an optional `./chat.yaml`), `CHAT_` environment
//! variables with `__` between sections (`CHAT_AGENT__BASE_URL`), then
//! explicit CLI flags.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TURN_PATH: &str = "/agent";
const DEFAULT_ARTIFACTS_PATH: &str = "/artifacts";
const DEFAULT_MODEL_KEY: &str = "deepseek/deepseek-chat";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_FILTER: &str = "info,chat_transcript=debug";

/// Config file looked up in the working directory when none is given.
const CWD_CONFIG_FILE: &str = "chat";

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CHAT_CONFIG")]
    pub config: Option<String>,

    /// Agent backend base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model key sent with each turn
    #[arg(short, long)]
    pub model: Option<String>,

    /// Send this message, print the transcript and exit
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub agent: AgentConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub turn_path: String,
    pub artifacts_path: String,
    pub model_key: String,
    pub connect_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            turn_path: DEFAULT_TURN_PATH.into(),
            artifacts_path: DEFAULT_ARTIFACTS_PATH.into(),
            model_key: DEFAULT_MODEL_KEY.into(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    /// Assistant greeting shown before the first turn.
    #[serde(default)]
    pub greeting: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("agent.base_url", DEFAULT_BASE_URL)?
            .set_default("agent.turn_path", DEFAULT_TURN_PATH)?
            .set_default("agent.artifacts_path", DEFAULT_ARTIFACTS_PATH)?
            .set_default("agent.model_key", DEFAULT_MODEL_KEY)?
            .set_default("agent.connect_timeout_secs", DEFAULT_CONNECT_TIMEOUT_SECS)?
            .set_default("log.filter", DEFAULT_LOG_FILTER)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.base_url {
            builder = builder.set_override("agent.base_url", url.as_str())?;
        }
        if let Some(model) = &cli.model {
            builder = builder.set_override("agent.model_key", model.as_str())?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}
