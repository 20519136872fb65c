//! Runtime settings from the environment, overridable on the command line

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::notify::TelegramConfig;

pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Admin panel for WhatsApp verification requests
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Snapshot file holding all user records (overrides DATA_FILE)
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Port for the admin panel (overrides HTTP_PORT)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Run lifecycle operations one at a time so concurrent admin actions
    /// cannot overwrite each other
    #[arg(long)]
    pub serialize_writes: bool,
}

/// TLS material for serving the panel over HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub http_port: u16,
    pub notify_timeout: Duration,
    pub serialize_writes: bool,
    pub tls: Option<TlsConfig>,
    /// `None` when BOT_TOKEN is unset
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let notify_timeout = Duration::from_secs(
            env_parse("NOTIFY_TIMEOUT_SECS").unwrap_or(DEFAULT_NOTIFY_TIMEOUT_SECS),
        );

        let tls = match (
            std::env::var("TLS_CERT_PATH"),
            std::env::var("TLS_KEY_PATH"),
        ) {
            (Ok(cert), Ok(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Self {
            data_file: std::env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_FILE)),
            http_port: env_parse("HTTP_PORT").unwrap_or(DEFAULT_HTTP_PORT),
            notify_timeout,
            serialize_writes: env_flag("SERIALIZE_WRITES"),
            tls,
            telegram: TelegramConfig::from_env(notify_timeout),
        }
    }

    /// Apply command line overrides
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(path) = &args.data_file {
            self.data_file = path.clone();
        }
        if let Some(port) = args.port {
            self.http_port = port;
        }
        self.serialize_writes |= args.serialize_writes;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
