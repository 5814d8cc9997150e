use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::search::DEFAULT_MAX_RESULTS;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, content lives in memory for the lifetime of the process.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    /// Directory for the on-disk search index. When unset, the index is held
    /// in RAM and rebuilt from the store at startup.
    pub index_path: Option<PathBuf>,
    /// Cap applied to searches that do not pass `maxResults`.
    pub default_max_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            port: 8080,
            rust_log: "info".to_string(),
            index_path: None,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Split out so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let default_max_results =
            parse_or(&lookup, "DEFAULT_MAX_RESULTS", defaults.default_max_results)?;
        if default_max_results == 0 {
            bail!("DEFAULT_MAX_RESULTS must be at least 1, got 0");
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            index_path: lookup("INDEX_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            default_max_results,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
