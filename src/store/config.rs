//! Store configuration.

use super::RecordKind;
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the data directory.
pub const DATA_DIR_VAR: &str = "ATELIER_DATA_DIR";
/// Environment variable toggling automatic backups.
pub const BACKUPS_VAR: &str = "ATELIER_BACKUPS";
/// Environment variable bounding retained backups per record.
pub const MAX_BACKUPS_VAR: &str = "ATELIER_MAX_BACKUPS";
/// Environment variable toggling the read-through cache.
pub const CACHE_VAR: &str = "ATELIER_CACHE";

const DEFAULT_DATA_DIR: &str = ".atelier";
const DEFAULT_MAX_BACKUPS: usize = 5;
const DEFAULT_WRITE_ATTEMPTS: u32 = 3;
const DEFAULT_WRITE_BACKOFF: Duration = Duration::from_millis(100);

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable held a value that could not be interpreted.
    #[error("invalid value '{value}' for {variable}: {expected}")]
    InvalidValue {
        /// Variable name.
        variable: &'static str,
        /// Raw value found.
        value: String,
        /// Description of accepted values.
        expected: &'static str,
    },
}

/// Settings shared by every record store of one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    data_dir: Utf8PathBuf,
    backups_enabled: bool,
    max_backups: usize,
    write_attempts: u32,
    write_backoff: Duration,
    cache_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl StoreConfig {
    /// Creates a configuration rooted at `data_dir` with default settings.
    #[must_use]
    pub fn new(data_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            backups_enabled: true,
            max_backups: DEFAULT_MAX_BACKUPS,
            write_attempts: DEFAULT_WRITE_ATTEMPTS,
            write_backoff: DEFAULT_WRITE_BACKOFF,
            cache_enabled: false,
        }
    }

    /// Reads the configuration from process environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to a
    /// value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to a
    /// value that cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = lookup(DATA_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(Self::default, Self::new);

        if let Some(raw) = lookup(BACKUPS_VAR) {
            config.backups_enabled = parse_flag(BACKUPS_VAR, &raw)?;
        }
        if let Some(raw) = lookup(MAX_BACKUPS_VAR) {
            config.max_backups = match raw.trim().parse::<usize>() {
                Ok(count) if count > 0 => count,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        variable: MAX_BACKUPS_VAR,
                        value: raw,
                        expected: "a positive integer",
                    });
                }
            };
        }
        if let Some(raw) = lookup(CACHE_VAR) {
            config.cache_enabled = parse_flag(CACHE_VAR, &raw)?;
        }
        Ok(config)
    }

    /// Enables or disables automatic backups before overwrites and deletes.
    #[must_use]
    pub const fn with_backups(mut self, enabled: bool) -> Self {
        self.backups_enabled = enabled;
        self
    }

    /// Sets how many backups are retained per record (at least one).
    #[must_use]
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    /// Sets the lock-contention retry policy for writes.
    ///
    /// The delay before retry `n` is `backoff * n`.
    #[must_use]
    pub fn with_write_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.write_attempts = attempts.max(1);
        self.write_backoff = backoff;
        self
    }

    /// Enables or disables the in-process read-through cache.
    #[must_use]
    pub const fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// Returns whether backups are enabled.
    #[must_use]
    pub const fn backups_enabled(&self) -> bool {
        self.backups_enabled
    }

    /// Returns the number of backups retained per record.
    #[must_use]
    pub const fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Returns the number of write attempts under lock contention.
    #[must_use]
    pub const fn write_attempts(&self) -> u32 {
        self.write_attempts
    }

    /// Returns the base backoff between contended write attempts.
    #[must_use]
    pub const fn write_backoff(&self) -> Duration {
        self.write_backoff
    }

    /// Returns whether the read-through cache is enabled.
    #[must_use]
    pub const fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Returns the directory holding records of `kind`.
    #[must_use]
    pub fn records_dir(&self, kind: RecordKind) -> Utf8PathBuf {
        self.data_dir.join(kind.dir_name())
    }

    /// Returns the root of the backup tree.
    #[must_use]
    pub fn backups_dir(&self) -> Utf8PathBuf {
        self.data_dir.join("backups")
    }
}

fn parse_flag(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            variable,
            value: raw.to_owned(),
            expected: "a boolean flag",
        }),
    }
}
