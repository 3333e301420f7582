use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::reconcile::ReconcileOptions;

/// Application-level constants
pub const APP_NAME: &str = "transcript-patterns";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;
pub const ANALYSIS_TIMEOUT_SECS: u64 = 180;

/// Independent analysis passes merged per transcript.
pub const DEFAULT_RUN_COUNT: usize = 2;
/// Written in the date column when no date can be determined.
pub const DEFAULT_DATE_PLACEHOLDER: &str = "-";

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const SETTINGS_FILE: &str = "settings.json";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "transcript_patterns_lib=info,transcript_patterns=info,warn"
}

/// Per-user configuration directory, e.g. `~/.config/transcript-patterns/`.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

pub fn settings_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join(SETTINGS_FILE))
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot determine the user configuration directory")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User settings. Loaded once at startup and written back only when the
/// user changes them; the analysis pipeline receives values from here
/// explicitly and never reads the file itself.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub run_count: usize,
    pub date_placeholder: String,
    /// Year for month/day-only dates. `None` means the current year.
    pub fallback_year: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            run_count: DEFAULT_RUN_COUNT,
            date_placeholder: DEFAULT_DATE_PLACEHOLDER.to_string(),
            fallback_year: None,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("run_count", &self.run_count)
            .field("date_placeholder", &self.date_placeholder)
            .field("fallback_year", &self.fallback_year)
            .finish()
    }
}

impl Settings {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, SettingsError> {
        let path = settings_path().ok_or(SettingsError::NoConfigDir)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write as pretty JSON. The file holds a credential, so on Unix it is
    /// restricted to the owner.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// The key to use: `env_override` (from [`API_KEY_ENV`]) if non-blank,
    /// else the stored key if non-blank.
    pub fn resolve_api_key(&self, env_override: Option<String>) -> Option<String> {
        let non_blank = |k: &str| {
            let k = k.trim();
            (!k.is_empty()).then(|| k.to_string())
        };
        env_override
            .as_deref()
            .and_then(non_blank)
            .or_else(|| self.api_key.as_deref().and_then(non_blank))
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        let options = ReconcileOptions::default()
            .with_run_count(self.run_count)
            .with_date_placeholder(self.date_placeholder.clone());
        match &self.fallback_year {
            Some(year) => options.with_fallback_year(year.clone()),
            None => options,
        }
    }
}
