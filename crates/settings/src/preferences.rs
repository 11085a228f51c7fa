use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use syncednotes_session::{NamingPolicy, ResourceNamer, DEFAULT_SUFFIX};
use syncednotes_tree::write_atomic;
use thiserror::Error;

const PREFERENCES_VERSION: u32 = 1;
const MAX_PREVIEW_LENGTH: usize = 500;

/// Failures while reading or writing the preferences file.
/// 讀寫偏好設定檔時的錯誤。
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("cannot access preferences at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preferences in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub storage: StoragePreferences,
    #[serde(default)]
    pub editing: EditingPreferences,
}

fn default_version() -> u32 {
    PREFERENCES_VERSION
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            storage: StoragePreferences::default(),
            editing: EditingPreferences::default(),
        }
    }
}

impl Preferences {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = PREFERENCES_VERSION;
        }
        self.storage.sanitize();
        self.editing.sanitize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePreferences {
    /// Where the note tree is persisted, relative paths resolve against the
    /// preferences file's directory.
    #[serde(default = "default_tree_file")]
    pub tree_file: PathBuf,
}

fn default_tree_file() -> PathBuf {
    PathBuf::from("notes.json")
}

impl Default for StoragePreferences {
    fn default() -> Self {
        Self {
            tree_file: default_tree_file(),
        }
    }
}

impl StoragePreferences {
    fn sanitize(&mut self) {
        if self.tree_file.as_os_str().is_empty() {
            self.tree_file = default_tree_file();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditingPreferences {
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_suffix")]
    pub resource_suffix: String,
    #[serde(default)]
    pub naming: NamingPolicy,
    #[serde(default)]
    pub editor_command: Option<String>,
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_preview_length() -> usize {
    40
}

impl Default for EditingPreferences {
    fn default() -> Self {
        Self {
            temp_dir: None,
            resource_suffix: default_suffix(),
            naming: NamingPolicy::default(),
            editor_command: None,
            preview_length: default_preview_length(),
        }
    }
}

impl EditingPreferences {
    fn sanitize(&mut self) {
        let suffix = self.resource_suffix.trim();
        self.resource_suffix = if suffix.is_empty() {
            default_suffix()
        } else if suffix.starts_with('.') {
            suffix.to_string()
        } else {
            format!(".{suffix}")
        };
        if self.preview_length == 0 {
            self.preview_length = default_preview_length();
        }
        self.preview_length = self.preview_length.clamp(1, MAX_PREVIEW_LENGTH);
        if matches!(&self.editor_command, Some(command) if command.trim().is_empty()) {
            self.editor_command = None;
        }
    }

    /// Directory that holds materialized notes while they are edited.
    /// 編輯期間存放暫存筆記檔的資料夾。
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("syncednotes"))
    }

    pub fn resource_namer(&self) -> ResourceNamer {
        ResourceNamer::new(self.naming, self.resource_suffix.clone())
    }
}

/// Preferences bound to the JSON file they were loaded from.
/// 與偏好設定檔綁定的設定值。
#[derive(Debug)]
pub struct PreferencesStore {
    path: PathBuf,
    preferences: Preferences,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>, preferences: Preferences) -> Self {
        Self {
            path: path.into(),
            preferences,
        }
    }

    /// Reads and sanitizes the file at `path`; a missing file yields defaults.
    /// 載入偏好設定；檔案不存在時使用預設值。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreferencesError> {
        let path = path.as_ref().to_path_buf();
        let mut preferences = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Preferences>(&contents).map_err(|source| {
                PreferencesError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("no preferences at {}, using defaults", path.display());
                Preferences::default()
            }
            Err(source) => return Err(PreferencesError::Io { path, source }),
        };
        preferences.sanitize();
        Ok(Self { path, preferences })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Applies `edit`, sanitizes the result and writes it back.
    pub fn update(&mut self, edit: impl FnOnce(&mut Preferences)) -> Result<(), PreferencesError> {
        edit(&mut self.preferences);
        self.preferences.sanitize();
        self.save()
    }

    pub fn overwrite(&mut self, preferences: Preferences) -> Result<(), PreferencesError> {
        self.update(|current| *current = preferences)
    }

    /// Writes the preferences atomically, creating parent directories.
    pub fn save(&self) -> Result<(), PreferencesError> {
        let payload = serde_json::to_vec_pretty(&self.preferences)?;
        write_atomic(&self.path, &payload).map_err(|source| PreferencesError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves the configured tree file against the preferences directory.
    /// 以偏好設定所在資料夾解析筆記樹檔案路徑。
    pub fn tree_file(&self) -> PathBuf {
        let tree_file = &self.preferences.storage.tree_file;
        if tree_file.is_absolute() {
            return tree_file.clone();
        }
        match self.path.parent() {
            Some(parent) => parent.join(tree_file),
            None => tree_file.clone(),
        }
    }
}
