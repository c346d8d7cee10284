// src/config.rs

//! The persisted JSON configuration file and its lifecycle.
//!
//! Mirrors `spineldb::config`'s two-phase shape — an all-optional
//! `RawConfig` deserialized straight off disk, resolved and validated into
//! a `Config` the daemon actually runs with — adapted from the teacher's
//! TOML to JSON, per the design's explicit requirement that this daemon's
//! config file is JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AntError, AntResult};

fn default_k() -> u32 {
    21
}
fn default_estimated_count() -> u64 {
    100_000
}
fn default_false_positive_rate() -> f64 {
    0.01
}
fn default_num_threads() -> usize {
    4
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_colours() -> u64 {
    1_000_000
}
fn default_max_estimated_count() -> u64 {
    100_000_000
}

/// The as-deserialized config file: every field optional so that a
/// hand-edited or partial file still loads, with the same defaults the
/// `set` subcommand writes for a fresh daemon.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RawConfig {
    pub watch_dir: Option<String>,
    pub db_dir: Option<String>,
    #[serde(default)]
    pub k: Option<u32>,
    #[serde(default)]
    pub estimated_count: Option<u64>,
    #[serde(default)]
    pub false_positive_rate: Option<f64>,
    #[serde(default)]
    pub num_threads: Option<usize>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub pid_file: Option<String>,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub running: Option<bool>,
}

/// The resolved, validated configuration the core consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub watch_dir: PathBuf,
    pub db_dir: PathBuf,
    #[serde(default = "default_k")]
    pub k: u32,
    #[serde(default = "default_estimated_count")]
    pub estimated_count: u64,
    #[serde(default = "default_false_positive_rate")]
    pub false_positive_rate: f64,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub pid_file: PathBuf,
    pub log_file: Option<PathBuf>,
    /// Advisory only: set on `set`, cleared on clean shutdown, read
    /// out-of-band by `stop`/`info` with no synchronization against the
    /// running daemon's in-memory state.
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub running: bool,
}

impl Config {
    /// Loads and validates the config file at `path`.
    pub fn from_file(path: &Path) -> AntResult<Self> {
        let raw_text = fs::read_to_string(path)?;
        let raw: RawConfig = serde_json::from_str(&raw_text)?;
        Self::resolve(raw, path)
    }

    fn resolve(raw: RawConfig, path: &Path) -> AntResult<Self> {
        let watch_dir = raw
            .watch_dir
            .map(PathBuf::from)
            .ok_or_else(|| AntError::ConfigInvalid("watch_dir is required".into()))?;
        let db_dir = raw
            .db_dir
            .map(PathBuf::from)
            .ok_or_else(|| AntError::ConfigInvalid("db_dir is required".into()))?;
        let pid_file = raw
            .pid_file
            .map(PathBuf::from)
            .unwrap_or_else(|| path.with_extension("pid"));

        let config = Self {
            watch_dir,
            db_dir,
            k: raw.k.unwrap_or_else(default_k),
            estimated_count: raw.estimated_count.unwrap_or_else(default_estimated_count),
            false_positive_rate: raw
                .false_positive_rate
                .unwrap_or_else(default_false_positive_rate),
            num_threads: raw.num_threads.unwrap_or_else(default_num_threads),
            log_level: raw.log_level.unwrap_or_else(default_log_level),
            pid_file,
            log_file: raw.log_file.map(PathBuf::from),
            pid: raw.pid,
            running: raw.running.unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates every core-consumed parameter from §6: `k` in [1, 31],
    /// estimated count in [1000, max], FPR in (0, 0.1], watch dir must
    /// exist, worker count >= 2.
    pub fn validate(&self) -> AntResult<()> {
        if self.k == 0 || self.k > 31 {
            return Err(AntError::ConfigInvalid(format!(
                "k must be in [1, 31], got {}",
                self.k
            )));
        }
        if !(1000..=default_max_estimated_count()).contains(&self.estimated_count) {
            return Err(AntError::ConfigInvalid(format!(
                "estimated_count must be in [1000, {}], got {}",
                default_max_estimated_count(),
                self.estimated_count
            )));
        }
        if !(0.0 < self.false_positive_rate && self.false_positive_rate <= 0.1) {
            return Err(AntError::ConfigInvalid(format!(
                "false_positive_rate must be in (0, 0.1], got {}",
                self.false_positive_rate
            )));
        }
        if self.num_threads < 2 {
            return Err(AntError::ConfigInvalid(format!(
                "num_threads must be >= 2, got {}",
                self.num_threads
            )));
        }
        if !self.watch_dir.is_dir() {
            return Err(AntError::ConfigInvalid(format!(
                "watch_dir {} does not exist or is not a directory",
                self.watch_dir.display()
            )));
        }
        Ok(())
    }

    /// The maximum number of colours (references) a BIGSI built from this
    /// config may hold.
    pub fn max_colours(&self) -> u64 {
        default_max_colours()
    }

    /// Persists the resolved record back to `path`, round-tripping `pid`
    /// and `running` the way the original daemon's config struct does.
    pub fn write(&self, path: &Path) -> AntResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Marks the daemon as running under `pid` and persists the change.
    pub fn register_pid(&mut self, path: &Path, pid: u32) -> AntResult<()> {
        self.pid = Some(pid);
        self.running = true;
        self.write(path)
    }

    /// Clears the running/pid fields on clean shutdown.
    pub fn clear_pid(&mut self, path: &Path) -> AntResult<()> {
        self.pid = None;
        self.running = false;
        self.write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("bigsid.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempdir().unwrap();
        let watch_dir = dir.path().join("watch");
        fs::create_dir_all(&watch_dir).unwrap();
        let json = format!(
            r#"{{"watch_dir": "{}", "db_dir": "{}"}}"#,
            watch_dir.display(),
            dir.path().join("db").display()
        );
        let path = write_config(dir.path(), &json);
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.k, 21);
        assert_eq!(config.num_threads, 4);
        assert!(!config.running);
    }

    #[test]
    fn rejects_missing_watch_dir() {
        let dir = tempdir().unwrap();
        let json = format!(
            r#"{{"watch_dir": "{}", "db_dir": "{}"}}"#,
            dir.path().join("does-not-exist").display(),
            dir.path().join("db").display()
        );
        let path = write_config(dir.path(), &json);
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn rejects_k_out_of_range() {
        let dir = tempdir().unwrap();
        let watch_dir = dir.path().join("watch");
        fs::create_dir_all(&watch_dir).unwrap();
        let json = format!(
            r#"{{"watch_dir": "{}", "db_dir": "{}", "k": 32}}"#,
            watch_dir.display(),
            dir.path().join("db").display()
        );
        let path = write_config(dir.path(), &json);
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn write_then_read_back_roundtrips_pid() {
        let dir = tempdir().unwrap();
        let watch_dir = dir.path().join("watch");
        fs::create_dir_all(&watch_dir).unwrap();
        let json = format!(
            r#"{{"watch_dir": "{}", "db_dir": "{}"}}"#,
            watch_dir.display(),
            dir.path().join("db").display()
        );
        let path = write_config(dir.path(), &json);
        let mut config = Config::from_file(&path).unwrap();
        config.register_pid(&path, 4242).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.pid, Some(4242));
        assert!(reloaded.running);
    }
}
