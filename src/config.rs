//! Configuration loading and runtime flags.
//!
//! `CharterConfig` is merged from defaults, an optional TOML file, and
//! `CHARTER_`-prefixed environment variables. The pause flag itself is owned
//! by the runtime-configuration collaborator (`RuntimeFlags`); the value
//! loaded here only seeds it.

use crate::logging::LoggingConfig;
use crate::oracle::ComplianceMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharterConfig {
    /// Designated rule-set updater. None grants every caller (demo wiring).
    pub controller: Option<String>,

    /// How agent compliance is judged (self-attested or attested).
    pub compliance_mode: ComplianceMode,

    /// Whether the system starts paused.
    pub paused: bool,

    pub storage: StorageConfig,

    pub logging: LoggingConfig,
}

impl Default for CharterConfig {
    fn default() -> Self {
        Self {
            controller: None,
            compliance_mode: ComplianceMode::default(),
            paused: false,
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; None means use the CLI's `--data-dir` or the
    /// platform default.
    pub path: Option<PathBuf>,
}

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration: defaults, then `charter.toml` (or an explicit
    /// file), then `CHARTER_` environment variables.
    pub fn load(path: Option<&Path>) -> Result<CharterConfig, ConfigError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&CharterConfig::default())?);

        match path {
            Some(p) => builder = builder.add_source(File::from(p)),
            None => {
                builder = builder.add_source(File::with_name("charter").required(false));
            }
        }

        builder = builder.add_source(Environment::with_prefix("CHARTER").separator("__"));
        builder.build()?.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<CharterConfig, ConfigError> {
        Self::load(Some(path))
    }
}

/// Pause collaborator consulted before state-changing registry calls.
pub trait PauseState: Send + Sync {
    fn is_paused(&self) -> bool;
}

/// Runtime-configuration collaborator: the process-wide pause flag.
pub struct RuntimeFlags {
    paused: AtomicBool,
}

impl RuntimeFlags {
    pub fn new(paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }
}

impl PauseState for RuntimeFlags {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
