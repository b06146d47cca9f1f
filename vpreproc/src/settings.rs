//! Typed host settings.
//!
//! Settings come from two JSON documents: the user settings object and an
//! optional project file whose `settings` member overrides it. Both are merged
//! and validated once, here, so the rest of the crate only sees a [`Settings`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::error::PreprocessError;

/// Delay used when the configured one is unusable, in seconds
pub const DEFAULT_DELAY: f64 = 0.1;

/// Project keys with this prefix override the user setting of the same suffix
const PROJECT_PREFIX: &str = "HDL_Syntax_";

/// Project key shared with the linter package that also feeds `incdirs`
const LINTER_INCDIRS: &str = "HDL_Linter_incdirs";

/// Validated settings
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settings {
    /// Quiescence delay after the last edit, in seconds
    pub delay: f64,
    /// Existing directories searched for `` `include `` targets, in order
    pub incdirs: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            incdirs: Vec::new(),
        }
    }
}

/// Problems fixed up while validating settings
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SettingsWarning {
    /// `delay` missing or not a number
    #[error("`delay` changed to default value `0.1`")]
    DelayDefaulted,
    /// `incdirs` missing or not an array
    #[error("`incdirs` changed to default value `[]`")]
    IncdirsDefaulted,
    /// An `incdirs` entry is not a string naming an existing directory
    #[error("path `{0}` removed from `incdirs`")]
    IncdirRemoved(String),
}

impl Settings {
    /// Merge and validate raw settings documents.
    ///
    /// Every fix-up is logged and returned alongside the settings.
    #[must_use]
    pub fn from_values(user: &Value, project: Option<&Value>) -> (Self, Vec<SettingsWarning>) {
        let merged = merge(user, project);
        let mut warnings = Vec::new();

        let delay = match merged.get("delay").and_then(Value::as_f64) {
            Some(delay) => delay,
            None => {
                warnings.push(SettingsWarning::DelayDefaulted);
                DEFAULT_DELAY
            }
        };

        let incdirs = match merged.get("incdirs") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::String(path) if Path::new(path).is_dir() => Some(PathBuf::from(path)),
                    Value::String(path) => {
                        warnings.push(SettingsWarning::IncdirRemoved(path.clone()));
                        None
                    }
                    other => {
                        warnings.push(SettingsWarning::IncdirRemoved(other.to_string()));
                        None
                    }
                })
                .collect(),
            _ => {
                warnings.push(SettingsWarning::IncdirsDefaulted);
                Vec::new()
            }
        };

        for warning in &warnings {
            warn!("{warning}");
        }
        (Self { delay, incdirs }, warnings)
    }

    /// Read, merge and validate settings files.
    ///
    /// A missing user file behaves like an empty settings object.
    ///
    /// # Errors
    /// Returns `PreprocessError` if a given file cannot be read or is not valid JSON.
    pub fn load(
        user: Option<&Path>,
        project: Option<&Path>,
    ) -> Result<(Self, Vec<SettingsWarning>), PreprocessError> {
        let user = match user {
            Some(path) => read_json(path)?,
            None => Value::Object(Map::new()),
        };
        let project = project.map(read_json).transpose()?;
        Ok(Self::from_values(&user, project.as_ref()))
    }
}

fn read_json(path: &Path) -> Result<Value, PreprocessError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Overlay the project's `settings` member onto the user object.
///
/// Prefixed project keys lose their prefix; array-valued user settings are
/// extended rather than replaced.
fn merge(user: &Value, project: Option<&Value>) -> Map<String, Value> {
    let mut merged = user.as_object().cloned().unwrap_or_default();
    let overrides = project
        .and_then(|p| p.get("settings"))
        .and_then(Value::as_object);

    for (key, value) in overrides.into_iter().flatten() {
        let Some(name) = key
            .strip_prefix(PROJECT_PREFIX)
            .or_else(|| (key == LINTER_INCDIRS).then_some("incdirs"))
        else {
            continue;
        };
        if let (Some(Value::Array(existing)), Value::Array(extra)) = (merged.get_mut(name), value) {
            existing.extend(extra.iter().cloned());
            continue;
        }
        merged.insert(name.to_string(), value.clone());
    }
    merged
}
