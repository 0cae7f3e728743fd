use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::domain::DEFAULT_PURCHASE_QUANTITY;

const APP_QUALIFIER: &str = "net";
const APP_ORG: &str = "BazaarFlipTracker";
const APP_NAME: &str = "BazaarFlipTracker";

/// Settings remembered between runs. The API key is never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    #[serde(default = "default_quantity")]
    pub purchase_quantity: f64,
    #[serde(default)]
    pub use_two_stage_path: bool,
    #[serde(default)]
    pub username: Option<String>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            purchase_quantity: default_quantity(),
            use_two_stage_path: false,
            username: None,
        }
    }
}

fn default_quantity() -> f64 {
    DEFAULT_PURCHASE_QUANTITY
}

pub fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

pub fn load_settings() -> Option<PersistedSettings> {
    load_settings_from(&settings_file()?)
}

pub fn load_settings_from(path: &Path) -> Option<PersistedSettings> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_settings(settings: &PersistedSettings) -> Result<(), PersistSaveError> {
    let path = settings_file().ok_or(PersistSaveError::StorageUnavailable)?;
    save_settings_to(&path, settings)
}

pub fn save_settings_to(path: &Path, settings: &PersistedSettings) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
