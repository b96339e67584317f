//! Persisted calculation settings and the fuzzing/headless switch.
//!
//! The threading decision in [`crate::calc_config::is_threading_enabled`]
//! reads whatever source is registered here on every call, so settings
//! changes take effect without a restart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted calculation settings.
///
/// Unknown keys are ignored so files written by newer builds still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcSettings {
    /// Use threaded calculation for formula groups.
    #[serde(rename = "calc.threadedFormulaGroups")]
    pub threaded_formula_groups: bool,
}

impl Default for CalcSettings {
    fn default() -> Self {
        Self {
            threaded_formula_groups: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CalcSettings {
    /// Default settings file location, `<config dir>/gridcalc/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridcalc")
            .join("settings.json")
    }

    /// Loads settings from `path`. Lines starting with `//` are comments
    /// and are stripped before parsing.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(serde_json::from_str(&cleaned)?)
    }
}

/// Live provider of calculation settings, consulted on every query.
pub trait ConfigurationSource: Send + Sync {
    /// Current value of "use threaded calculation for formula groups".
    fn threaded_group_calculation(&self) -> bool;
}

impl ConfigurationSource for CalcSettings {
    fn threaded_group_calculation(&self) -> bool {
        self.threaded_formula_groups
    }
}

static SOURCE: Lazy<RwLock<Option<Arc<dyn ConfigurationSource>>>> =
    Lazy::new(|| RwLock::new(None));

/// Installs the process-wide configuration source, replacing any previous
/// one.
pub fn set_configuration_source(source: Arc<dyn ConfigurationSource>) {
    *SOURCE.write().unwrap_or_else(|e| e.into_inner()) = Some(source);
}

/// Current threaded-calculation setting from the registered source, or the
/// built-in default when none is registered.
pub fn threaded_group_calculation() -> bool {
    let guard = SOURCE.read().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(source) => source.threaded_group_calculation(),
        None => CalcSettings::default().threaded_formula_groups,
    }
}

/// File-backed configuration source that re-reads its file on every query.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(CalcSettings::default_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. A missing file means defaults; a malformed one is
    /// logged and also falls back to defaults.
    pub fn current(&self) -> CalcSettings {
        match CalcSettings::load_from(&self.path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                CalcSettings::default()
            }
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "using default calculation settings: {err}"
                );
                CalcSettings::default()
            }
        }
    }
}

impl ConfigurationSource for SettingsFile {
    fn threaded_group_calculation(&self) -> bool {
        self.current().threaded_formula_groups
    }
}

static FUZZING_MODE: AtomicBool = AtomicBool::new(false);

/// Switches fuzzing/headless mode. While enabled, threaded calculation is
/// reported as disabled regardless of persisted configuration.
pub fn set_fuzzing_mode(enabled: bool) {
    FUZZING_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_fuzzing_mode() -> bool {
    FUZZING_MODE.load(Ordering::Relaxed)
}
