//! Process configuration, resolved from the environment once at startup and
//! passed down explicitly; nothing below the boundary reads the environment.

use std::env;
use std::path::PathBuf;

/// Environment-derived settings.
#[derive(Clone, Debug)]
pub struct Config {
    /// Root directory of the persistent contract database (`DB_DIR`).
    pub db_dir: PathBuf,
    /// Solidity compiler binary (`SOLC`), default `solc`.
    pub solc: String,
    /// The invoking user's home directory, for `~/` expansion and the
    /// default IPC endpoint.
    pub home: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let home = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let db_dir = env::var_os("DB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".argus").join("db"));
        let solc = env::var("SOLC").unwrap_or_else(|_| "solc".to_string());
        Self { db_dir, solc, home }
    }
}
