use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use syncednotes_tree::{Codec, CodecError, NoteNode, TreeError, TreeOwner};
use thiserror::Error;

use crate::shell::{HostEditorShell, ResourceId, ShellError, ShellEventKind, SubscriptionId};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier assigned to each edit session.
/// 每個編輯工作階段的唯一識別碼。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle of an edit session. `Saved` is re-entered on every save.
/// 編輯工作階段的狀態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Materializing,
    Open,
    Saved { count: u32 },
    Closed,
}

/// One "edit this note in the host" action, from materialization to cleanup.
/// 一次「在主機中編輯筆記」的完整流程。
#[derive(Debug)]
pub struct EditSession {
    id: SessionId,
    target: String,
    label: String,
    resource: ResourceId,
    state: SessionState,
    save_subscription: Option<SubscriptionId>,
    close_subscription: Option<SubscriptionId>,
}

impl EditSession {
    /// Writes the decoded note to `resource`, opens it and arms the save and
    /// close subscriptions. Nothing is left behind when a step fails.
    /// 將解碼後的筆記寫入外部資源並開啟，接著註冊儲存與關閉事件。
    pub fn open(
        node: &NoteNode,
        resource: ResourceId,
        shell: &mut dyn HostEditorShell,
        codec: &dyn Codec,
    ) -> Result<Self, SessionError> {
        if !node.is_leaf() {
            return Err(SessionError::Tree(TreeError::NotALeaf(
                node.full_path().to_string(),
            )));
        }
        let mut session = Self {
            id: SessionId::next(),
            target: node.full_path().to_string(),
            label: node.label().to_string(),
            resource,
            state: SessionState::Materializing,
            save_subscription: None,
            close_subscription: None,
        };
        log::info!("editing note {} as {}", session.target, session.resource);

        let text = node
            .decoded_content(codec, None)
            .map_err(SessionError::from_tree)?;
        shell.materialize(&session.resource, &text)?;

        if let Err(err) = shell.open(&session.resource) {
            session.remove_resource(shell);
            return Err(err.into());
        }

        session.save_subscription = Some(shell.subscribe(ShellEventKind::Saved, &session.resource));
        session.close_subscription = Some(shell.subscribe(ShellEventKind::Closed, &session.resource));
        session.state = SessionState::Open;
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Full path of the note being edited.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn save_count(&self) -> u32 {
        match self.state {
            SessionState::Saved { count } => count,
            _ => 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Returns `true` while either subscription is still registered.
    pub fn is_subscribed(&self) -> bool {
        self.save_subscription.is_some() || self.close_subscription.is_some()
    }

    /// Brings the resource back to the foreground.
    pub fn reveal(&self, shell: &mut dyn HostEditorShell) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        shell.open(&self.resource)?;
        Ok(())
    }

    /// Captures the resource text, re-encodes it into the target note and asks
    /// the owner to persist. Returns the number of saves so far. On error the
    /// note keeps its previous content.
    /// 讀取資源內容、重新編碼並寫回筆記，再請求持久化。
    pub fn on_save(
        &mut self,
        shell: &mut dyn HostEditorShell,
        owner: &mut dyn TreeOwner,
        codec: &dyn Codec,
    ) -> Result<u32, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id));
        }
        log::info!("saving note {}", self.label);

        let text = shell.read_text(&self.resource)?;
        let blob = codec.encode(&text)?;
        owner
            .tree_mut()
            .set_content(&self.target, blob)
            .map_err(|err| match err {
                TreeError::NodeNotFound(path) => SessionError::NoteMissing(path),
                other => SessionError::from_tree(other),
            })?;
        owner.save_to_config();

        let count = self.save_count() + 1;
        self.state = SessionState::Saved { count };
        Ok(count)
    }

    /// Handles the host closing the resource: drops both subscriptions and
    /// deletes the resource. Delete failures are logged only. Repeated calls
    /// are no-ops.
    /// 處理關閉事件：取消訂閱並刪除外部資源。
    pub fn on_close(&mut self, shell: &mut dyn HostEditorShell) {
        if self.is_closed() {
            return;
        }
        self.release_subscriptions(shell);
        self.remove_resource(shell);
        self.state = SessionState::Closed;
        log::debug!("{} closed after {} save(s)", self.id, self.save_count());
    }

    /// Ends the session without a close event (host shutdown).
    pub fn dispose(&mut self, shell: &mut dyn HostEditorShell) {
        self.on_close(shell);
    }

    fn release_subscriptions(&mut self, shell: &mut dyn HostEditorShell) {
        if let Some(subscription) = self.save_subscription.take() {
            shell.unsubscribe(subscription);
        }
        if let Some(subscription) = self.close_subscription.take() {
            shell.unsubscribe(subscription);
        }
    }

    fn remove_resource(&self, shell: &mut dyn HostEditorShell) {
        if let Err(err) = shell.delete(&self.resource) {
            log::warn!("Error deleting file: {}, {}", self.resource, err);
        }
    }
}

/// Errors surfaced by edit sessions.
/// 編輯工作階段的錯誤類型。
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Tree(TreeError),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error("note {0} no longer exists")]
    NoteMissing(String),
    #[error("resource {resource} is already being edited for {holder}")]
    ResourceBusy { resource: ResourceId, holder: String },
    #[error("{0} is closed")]
    Closed(SessionId),
}

impl SessionError {
    fn from_tree(err: TreeError) -> Self {
        match err {
            TreeError::Codec(codec) => Self::Codec(codec),
            other => Self::Tree(other),
        }
    }
}

impl From<TreeError> for SessionError {
    fn from(err: TreeError) -> Self {
        Self::from_tree(err)
    }
}
