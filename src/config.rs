//! Runtime configuration: defaults, then environment, then command-line overrides.

use directories::ProjectDirs;
use std::path::PathBuf;

pub const ENV_DATABASE: &str = "VOCAB_REVIEW_DB";
pub const ENV_USER: &str = "VOCAB_REVIEW_USER";
pub const ENV_DAILY_LIMIT: &str = "VOCAB_REVIEW_DAILY_LIMIT";
pub const ENV_LOG: &str = "VOCAB_REVIEW_LOG";

const DATABASE_FILE: &str = "vocab_review.sqlite3";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub default_user: String,
    /// Cap on `due` listings when no limit is given.
    pub daily_limit: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            default_user: "demo-user".to_string(),
            daily_limit: 20,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source. Unparsable values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(user) = lookup(ENV_USER).filter(|v| !v.trim().is_empty()) {
            config.default_user = user.trim().to_string();
        }
        if let Some(limit) = lookup(ENV_DAILY_LIMIT).and_then(|v| v.trim().parse().ok()) {
            config.daily_limit = limit;
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            config.log_filter = filter;
        }

        config
    }
}

/// Platform data directory, or the working directory when none is available.
fn default_database_path() -> PathBuf {
    ProjectDirs::from("", "", "vocab-review")
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.default_user, "demo-user");
        assert_eq!(config.daily_limit, 20);
        assert_eq!(config.log_filter, "info");
        assert!(config.database_path.ends_with(DATABASE_FILE));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DATABASE, "/tmp/words.db"),
            (ENV_USER, " maria "),
            (ENV_DAILY_LIMIT, "35"),
            (ENV_LOG, "vocab_review=debug"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.database_path, PathBuf::from("/tmp/words.db"));
        assert_eq!(config.default_user, "maria");
        assert_eq!(config.daily_limit, 35);
        assert_eq!(config.log_filter, "vocab_review=debug");
    }

    #[test]
    fn test_bad_limit_is_ignored() {
        let config =
            Config::from_lookup(|key| (key == ENV_DAILY_LIMIT).then(|| "lots".to_string()));
        assert_eq!(config.daily_limit, 20);
    }
}
