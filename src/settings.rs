use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::documents::DEFAULT_MAX_UPLOAD_BYTES;
use crate::viewer::ViewerConfig;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
pub const APP_NAME: &str = "finassist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Base URL of the question-answering service (`/ask` is appended)
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// A remote document registered at every startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub max_upload_bytes: u64,
    pub library: Vec<LibraryEntry>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            library: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub chat: ChatSettings,

    #[serde(default)]
    pub documents: DocumentSettings,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            viewer: ViewerConfig::default(),
            chat: ChatSettings::default(),
            documents: DocumentSettings::default(),
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

impl Settings {
    /// Load from `path` (or the default location), writing defaults when the
    /// file does not exist yet. Never fails: problems are logged and
    /// defaults used.
    pub fn load_or_create(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match preferred_config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using default settings");
                    return Self::default();
                }
            },
        };

        if path.exists() {
            load_settings_from_path(&path).unwrap_or_default()
        } else {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            save_settings_to_file(&settings, &path);
            settings
        }
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) {
        save_settings_to_file(self, path);
    }
}

fn load_settings_from_path(path: &Path) -> Option<Settings> {
    match fs::read_to_string(path) {
        Ok(content) => match Settings::from_yaml(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                Some(settings)
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                None
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            None
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let body = match serde_yaml::to_string(settings) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, format!("{SETTINGS_HEADER}{body}")) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# FinAssist settings
# ============================================================================
# viewer.initial_pages     pages rendered when a document opens
# viewer.pages_per_batch   pages added each time you scroll near the bottom
# viewer.rerender_cap      most pages re-rendered after zoom or resize
# chat.endpoint            base URL of the question-answering service
# documents.library        remote documents (name + url) listed at startup
#
"#;
