use std::fmt;
use std::io;

use thiserror::Error;

/// Identity of an external editable resource (a temp file path for [`crate::FsShell`]).
/// 外部可編輯資源的識別碼。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellEventKind {
    Saved,
    Closed,
}

/// Notification delivered by the host for a single resource.
/// 主機針對單一資源送出的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellEvent {
    pub kind: ShellEventKind,
    pub resource: ResourceId,
}

impl ShellEvent {
    pub fn saved(resource: ResourceId) -> Self {
        Self {
            kind: ShellEventKind::Saved,
            resource,
        }
    }

    pub fn closed(resource: ResourceId) -> Self {
        Self {
            kind: ShellEventKind::Closed,
            resource,
        }
    }
}

/// Handle returned by [`HostEditorShell::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Capabilities the host editor shell provides to edit sessions.
/// 主機編輯器需提供給編輯工作階段的能力。
pub trait HostEditorShell {
    /// Resolves the identity a resource named `name` would have.
    fn resource_for(&self, name: &str) -> ResourceId;

    /// Creates (or overwrites) the resource with `text`.
    fn materialize(&mut self, resource: &ResourceId, text: &str) -> Result<(), ShellError>;

    /// Opens the resource for editing.
    fn open(&mut self, resource: &ResourceId) -> Result<(), ShellError>;

    /// Displays the resource read-only. Hosts without a preview open it instead.
    fn preview(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        self.open(resource)
    }

    /// Reads the full current text of the resource.
    fn read_text(&mut self, resource: &ResourceId) -> Result<String, ShellError>;

    fn delete(&mut self, resource: &ResourceId) -> Result<(), ShellError>;

    /// Registers interest in `kind` events for `resource`.
    fn subscribe(&mut self, kind: ShellEventKind, resource: &ResourceId) -> SubscriptionId;

    /// Drops a subscription. Unknown or already-removed ids are ignored.
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

/// Failures reported by a [`HostEditorShell`].
/// 主機編輯器操作錯誤。
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("resource {resource} IO error: {source}")]
    Io {
        resource: ResourceId,
        #[source]
        source: io::Error,
    },
    #[error("resource {0} not found")]
    NotFound(ResourceId),
    #[error("failed to open {resource}: {reason}")]
    Open { resource: ResourceId, reason: String },
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("file watcher stopped delivering events")]
    WatcherDisconnected,
}

impl ShellError {
    pub(crate) fn io(resource: &ResourceId, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(resource.clone())
        } else {
            Self::Io {
                resource: resource.clone(),
                source,
            }
        }
    }
}
