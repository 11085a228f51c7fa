//! On-disk preferences for SyncedNotes.
//! SyncedNotes 的偏好設定。

pub mod preferences;

pub use preferences::{
    EditingPreferences, Preferences, PreferencesError, PreferencesStore, StoragePreferences,
};
