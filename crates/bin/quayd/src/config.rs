use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, builder::BoolishValueParser};
use quay_core::llm::Provider;
use quay_core::store::StoreConfig;
use thiserror::Error;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 3306;
const DEFAULT_DB_CONNECTION_LIMIT: u32 = 10;
const DEFAULT_AI_PROVIDER: &str = "DEEPSEEK";
const DEFAULT_CHAT_HOST: &str = "0.0.0.0";
const DEFAULT_CHAT_PORT: u16 = 3000;
const DEFAULT_PUBLIC_DIR: &str = "public";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "quayd", version, about = "Terminal lookup chat server and MCP stdio server.")]
struct CliArgs {
    #[arg(long, env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    db_port: u16,

    #[arg(long, env = "DB_USER")]
    db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    #[arg(long, env = "DB_NAME")]
    db_name: Option<String>,

    #[arg(long, env = "DB_CONNECTION_LIMIT", default_value_t = DEFAULT_DB_CONNECTION_LIMIT)]
    db_connection_limit: u32,

    /// SQL script imported when the terminal tables are missing.
    #[arg(long, env = "DB_SEED_FILE")]
    db_seed_file: Option<PathBuf>,

    #[arg(long, env = "AI_PROVIDER", default_value = DEFAULT_AI_PROVIDER)]
    ai_provider: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    deepseek_api_key: Option<String>,

    #[arg(long, env = "AI_MODEL")]
    ai_model: Option<String>,

    #[arg(long, env = "AI_BASE_URL")]
    ai_base_url: Option<String>,

    #[arg(long, env = "CHAT_SERVER_HOST", default_value = DEFAULT_CHAT_HOST)]
    chat_host: String,

    #[arg(long, env = "CHAT_SERVER_PORT", default_value_t = DEFAULT_CHAT_PORT)]
    chat_port: u16,

    #[arg(long, env = "PUBLIC_DIR", default_value = DEFAULT_PUBLIC_DIR)]
    public_dir: PathBuf,

    #[arg(
        long,
        env = "CHAT_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    chat_serve: bool,

    #[arg(
        long = "stdio",
        env = "MCP_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    mcp_stdio: bool,

    #[arg(long, env = "MODEL_TIMEOUT_SECS", default_value_t = DEFAULT_MODEL_TIMEOUT_SECS)]
    model_timeout_secs: u64,

    #[arg(long, env = "QUERY_TIMEOUT_SECS", default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
    query_timeout_secs: u64,
}

/// Model endpoint settings, present only when the chat server runs.
#[derive(Clone)]
pub struct ModelSettings {
    pub provider: Provider,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct QuayConfig {
    pub store: StoreConfig,
    pub seed_file: Option<PathBuf>,
    pub provider: Provider,
    pub model: Option<ModelSettings>,
    pub chat_addr: SocketAddr,
    pub public_dir: PathBuf,
    pub mcp_stdio: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
    #[error("nothing to serve: enable CHAT_SERVE or MCP_STDIO")]
    NothingToServe,
}

impl QuayConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingSetting(name))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn positive_secs(secs: u64, name: &'static str) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidSetting {
            name,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl TryFrom<CliArgs> for QuayConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !args.chat_serve && !args.mcp_stdio {
            return Err(ConfigError::NothingToServe);
        }

        let username = required(args.db_user, "DB_USER")?;
        let password = required(args.db_password, "DB_PASSWORD")?;
        let database = required(args.db_name, "DB_NAME")?;
        if args.db_host.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "DB_HOST",
                value: args.db_host,
            });
        }
        if args.db_connection_limit == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "DB_CONNECTION_LIMIT",
                value: args.db_connection_limit.to_string(),
            });
        }
        let query_timeout = positive_secs(args.query_timeout_secs, "QUERY_TIMEOUT_SECS")?;
        let store = StoreConfig::new(args.db_host, args.db_port, username, password, database)
            .with_max_connections(args.db_connection_limit)
            .with_query_timeout(query_timeout);

        let provider: Provider = args
            .ai_provider
            .parse()
            .map_err(|_| ConfigError::InvalidSetting {
                name: "AI_PROVIDER",
                value: args.ai_provider.clone(),
            })?;

        let model = if args.chat_serve {
            let api_key = match provider {
                Provider::OpenAi => args.openai_api_key,
                Provider::DeepSeek => args.deepseek_api_key,
            };
            Some(ModelSettings {
                provider,
                api_key: required(api_key, provider.api_key_env())?,
                model: non_blank(args.ai_model),
                base_url: non_blank(args.ai_base_url),
                timeout: positive_secs(args.model_timeout_secs, "MODEL_TIMEOUT_SECS")?,
            })
        } else {
            None
        };

        let host: IpAddr = args
            .chat_host
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidSetting {
                name: "CHAT_SERVER_HOST",
                value: args.chat_host.clone(),
            })?;

        Ok(Self {
            store,
            seed_file: args.db_seed_file,
            provider,
            model,
            chat_addr: SocketAddr::new(host, args.chat_port),
            public_dir: args.public_dir,
            mcp_stdio: args.mcp_stdio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: Some("reader".to_string()),
            db_password: Some("secret".to_string()),
            db_name: Some("terminal".to_string()),
            db_connection_limit: DEFAULT_DB_CONNECTION_LIMIT,
            db_seed_file: None,
            ai_provider: DEFAULT_AI_PROVIDER.to_string(),
            openai_api_key: None,
            deepseek_api_key: Some("sk-deepseek".to_string()),
            ai_model: None,
            ai_base_url: None,
            chat_host: DEFAULT_CHAT_HOST.to_string(),
            chat_port: DEFAULT_CHAT_PORT,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            chat_serve: true,
            mcp_stdio: false,
            model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }

    #[test]
    fn defaults_produce_chat_config() {
        let config = QuayConfig::try_from(base_args()).expect("config should parse");

        assert!(config.model.is_some());
        assert!(!config.mcp_stdio);
        assert_eq!(config.chat_addr, "0.0.0.0:3000".parse().expect("addr"));
        assert_eq!(config.store.max_connections, 10);
        assert_eq!(config.store.query_timeout, Duration::from_secs(30));
        let model = config.model.expect("model settings");
        assert_eq!(model.provider, Provider::DeepSeek);
        assert_eq!(model.timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_database_name_is_fatal() {
        let mut args = base_args();
        args.db_name = Some("  ".to_string());

        let err = QuayConfig::try_from(args).err().expect("config should fail");
        assert!(matches!(err, ConfigError::MissingSetting("DB_NAME")));
    }

    #[test]
    fn selected_provider_key_is_required_for_chat() {
        let mut args = base_args();
        args.ai_provider = "openai".to_string();

        let err = QuayConfig::try_from(args).err().expect("config should fail");
        assert!(matches!(err, ConfigError::MissingSetting("OPENAI_API_KEY")));
    }

    #[test]
    fn stdio_only_needs_no_api_key() {
        let mut args = base_args();
        args.chat_serve = false;
        args.mcp_stdio = true;
        args.deepseek_api_key = None;

        let config = QuayConfig::try_from(args).expect("config should parse");
        assert!(config.model.is_none());
        assert!(config.mcp_stdio);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut args = base_args();
        args.ai_provider = "llama".to_string();

        let err = QuayConfig::try_from(args).err().expect("config should fail");
        assert!(matches!(err, ConfigError::InvalidSetting { name: "AI_PROVIDER", .. }));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let mut args = base_args();
        args.db_connection_limit = 0;

        let err = QuayConfig::try_from(args).err().expect("config should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting { name: "DB_CONNECTION_LIMIT", .. }
        ));
    }

    #[test]
    fn disabling_both_surfaces_is_rejected() {
        let mut args = base_args();
        args.chat_serve = false;

        let err = QuayConfig::try_from(args).err().expect("config should fail");
        assert!(matches!(err, ConfigError::NothingToServe));
    }
}
