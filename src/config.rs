//! Process configuration read from the environment
use crate::error::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const BIND_VAR: &str = "CLAIMS_LEDGER_HTTP_BIND";
pub const DB_PATH_VAR: &str = "CLAIMS_LEDGER_DB_PATH";
pub const SYNC_COMMITS_VAR: &str = "CLAIMS_LEDGER_SYNC_COMMITS";

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_DB_PATH: &str = "claims_ledger.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub sync_commits: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; unset variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBind {
                var: BIND_VAR,
                value: bind_raw.clone(),
            })?;

        let db_path = match lookup(DB_PATH_VAR) {
            Some(path) if path.trim().is_empty() => {
                return Err(ConfigError::Empty { var: DB_PATH_VAR });
            }
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_DB_PATH),
        };

        let sync_commits = match lookup(SYNC_COMMITS_VAR) {
            Some(v) => parse_flag(SYNC_COMMITS_VAR, &v)?,
            None => true,
        };

        Ok(Self {
            bind,
            db_path,
            sync_commits,
        })
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("claims_ledger.db"));
        assert!(config.sync_commits);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (BIND_VAR, "127.0.0.1:9090"),
            (DB_PATH_VAR, "/var/lib/ledger"),
            (SYNC_COMMITS_VAR, "Off"),
        ]))
        .unwrap();

        assert_eq!(config.bind.port(), 9090);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/ledger"));
        assert!(!config.sync_commits);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_bind = Config::from_lookup(lookup_from(&[(BIND_VAR, "localhost")]));
        assert!(matches!(bad_bind, Err(ConfigError::InvalidBind { .. })));

        let bad_flag = Config::from_lookup(lookup_from(&[(SYNC_COMMITS_VAR, "sometimes")]));
        assert!(matches!(bad_flag, Err(ConfigError::InvalidFlag { .. })));

        let empty_path = Config::from_lookup(lookup_from(&[(DB_PATH_VAR, "  ")]));
        assert!(matches!(empty_path, Err(ConfigError::Empty { .. })));
    }
}
