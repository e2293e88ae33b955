// ⚙️ Runtime configuration from the environment
//
//   ATM_DB_PATH        SQLite file holding the account   (default: atm.db)
//   ATM_SERVER_ADDR    bind address for atm-server        (default: 127.0.0.1:3000)
//   ATM_STATUS_TTL_MS  how long status messages stay up   (default: 3500)
//   ATM_LOG_FILE       log destination for the terminal UI (default: none)

use crate::presentation::DEFAULT_STATUS_TTL;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "atm.db";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub server_addr: SocketAddr,
    pub status_ttl: Duration,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Non-UTF-8 variables can't be ours; skip them instead of panicking
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::from_vars(vars)
    }

    /// Build from an explicit variable map (tests)
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let db_path = PathBuf::from(get("ATM_DB_PATH").unwrap_or(DEFAULT_DB_PATH));

        let server_addr = get("ATM_SERVER_ADDR")
            .unwrap_or(DEFAULT_SERVER_ADDR)
            .parse()
            .context("ATM_SERVER_ADDR must be host:port")?;

        let status_ttl = match get("ATM_STATUS_TTL_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("ATM_STATUS_TTL_MS is not a number: {ms}"))?,
            ),
            None => DEFAULT_STATUS_TTL,
        };

        let log_file = get("ATM_LOG_FILE").map(PathBuf::from);

        Ok(Config {
            db_path,
            server_addr,
            status_ttl,
            log_file,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            status_ttl: DEFAULT_STATUS_TTL,
            log_file: None,
        }
    }
}
