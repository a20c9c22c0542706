use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::auth::DEFAULT_TOKEN_TTL_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server settings. Flags win over environment variables; `.env` is loaded
/// into the environment before parsing.
#[derive(Parser, Debug, Clone)]
#[command(name = "waste_records")]
#[command(about = "Waste records REST API", long_about = None)]
pub struct Config {
    #[arg(long, env = "WASTE_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// HMAC secret for signing bearer tokens
    #[arg(long, env = "JWT_SECRET", default_value = "rem-waste-secret-key", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = DEFAULT_TOKEN_TTL_SECS)]
    pub token_ttl_secs: i64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = 10)]
    pub bcrypt_cost: u32,

    /// Start with an empty item list instead of the two sample records
    #[arg(long, env = "WASTE_NO_SEED_ITEMS")]
    pub no_seed_items: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
