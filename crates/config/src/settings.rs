// Evaluation settings
// Loaded from ~/.config/lmgrid/settings.toml

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SettingsError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// A value parsed but is out of range.
    Invalid(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid setting: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// How conditions and models are evaluated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalSettings {
    /// Absolute tolerance for numeric equality (`age == 5`). 0 = exact.
    pub numeric_tolerance: f64,

    /// Compute predictor columns concurrently. Only honored when the engine
    /// is built with its `parallel` feature.
    pub parallel: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.0,
            parallel: false,
        }
    }
}

/// Rule tracing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceSettings {
    /// Emit one debug-level log record per rule evaluated
    pub log_rules: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub eval: EvalSettings,
    pub trace: TraceSettings,
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let tol = self.eval.numeric_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "eval.numeric_tolerance must be a finite non-negative number, got {tol}"
            )));
        }
        Ok(())
    }

    /// Get the settings file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lmgrid")
            .join("settings.toml")
    }

    /// Load settings from an explicit path
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SettingsError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Load settings from the default path, falling back to defaults when the
    /// file does not exist. A file that exists but is malformed is an error.
    pub fn load_or_default() -> Result<Self, SettingsError> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
