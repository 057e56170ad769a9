//! Cli things
//!

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 3000;

pub fn db_url_default() -> String {
    format!(
        "sqlite://{}?mode=rwc",
        shellexpand::tilde("~/.cache/resource-portal.sqlite3")
    )
}

#[derive(Parser, Debug)]
pub struct CliOpts {
    #[clap(
        long,
        help = "Address to listen on",
        env = "PORTAL_LISTEN_ADDR",
        default_value = "127.0.0.1"
    )]
    pub listen_addr: String,

    #[clap(long, help = "Port to listen on", env = "PORTAL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[clap(
        long,
        help = "Database connection string, eg sqlite:///path/to/db.sqlite3?mode=rwc",
        env = "PORTAL_DB_URL"
    )]
    pub db_url: Option<String>,

    #[clap(
        long,
        help = "Shared code required to upload or delete. Without it every change is refused",
        env = "PORTAL_UPLOAD_SECRET",
        hide_env_values = true
    )]
    pub upload_secret: Option<String>,

    #[clap(
        long,
        help = "Directory uploaded files are stored in",
        env = "PORTAL_UPLOAD_DIR",
        default_value = "./uploads"
    )]
    pub upload_dir: PathBuf,

    #[clap(
        long,
        help = "Directory holding the front-end",
        env = "PORTAL_STATIC_DIR",
        default_value = "./dist"
    )]
    pub static_dir: PathBuf,

    #[clap(
        long,
        help = "Largest accepted upload, in MiB",
        env = "PORTAL_MAX_UPLOAD_MB",
        default_value_t = 100
    )]
    pub max_upload_mb: usize,

    #[clap(long, help = "Enable debug logging")]
    pub debug: bool,
}

/// Everything the service needs to start, resolved once at startup.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub listen_addr: String,
    pub port: u16,
    pub db_url: String,
    pub upload_secret: Option<String>,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl From<&CliOpts> for PortalConfig {
    fn from(cli: &CliOpts) -> Self {
        Self {
            listen_addr: cli.listen_addr.clone(),
            port: cli.port,
            db_url: cli.db_url.clone().unwrap_or_else(db_url_default),
            upload_secret: cli.upload_secret.clone(),
            upload_dir: cli.upload_dir.clone(),
            static_dir: cli.static_dir.clone(),
            max_upload_bytes: cli.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl PortalConfig {
    pub fn as_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }

    pub fn as_url(&self) -> String {
        format!("http://{}:{}", self.listen_addr, self.port)
    }

    #[cfg(test)]
    pub fn test(upload_dir: PathBuf, upload_secret: &str) -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            db_url: crate::storage::MEMORY_DB_URL.to_string(),
            upload_secret: Some(upload_secret.to_string()),
            upload_dir,
            static_dir: PathBuf::from("./dist"),
            max_upload_bytes: 1024 * 1024,
        }
    }
}
