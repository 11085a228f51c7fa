use std::collections::HashMap;

use syncednotes_tree::{Codec, TreeError, TreeOwner};

use crate::naming::ResourceNamer;
use crate::session::{EditSession, SessionError, SessionId};
use crate::shell::{HostEditorShell, ResourceId, ShellEvent, ShellEventKind};

/// Result of routing one host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Saved { session: SessionId, saves: u32 },
    Closed { session: SessionId },
    /// No live session owns the resource.
    Ignored,
}

/// Live edit sessions keyed by resource identity.
/// 以資源識別碼索引的編輯工作階段集合。
///
/// Resource names are the only thing separating sessions, so opening a note
/// whose resource is already held by a different note fails with
/// [`SessionError::ResourceBusy`] and leaves the first session untouched.
#[derive(Debug, Default)]
pub struct EditSessionManager {
    namer: ResourceNamer,
    sessions: HashMap<ResourceId, EditSession>,
}

impl EditSessionManager {
    pub fn new(namer: ResourceNamer) -> Self {
        Self {
            namer,
            sessions: HashMap::new(),
        }
    }

    pub fn namer(&self) -> &ResourceNamer {
        &self.namer
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, id: SessionId) -> Option<&EditSession> {
        self.sessions.values().find(|session| session.id() == id)
    }

    pub fn session_for(&self, resource: &ResourceId) -> Option<&EditSession> {
        self.sessions.get(resource)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &EditSession> {
        self.sessions.values()
    }

    /// Opens the note at `full_path` for editing. A note that is already open
    /// is brought to the foreground and keeps its session.
    /// 開啟筆記進行編輯；若已開啟則重新顯示。
    pub fn open_editor(
        &mut self,
        full_path: &str,
        shell: &mut dyn HostEditorShell,
        owner: &dyn TreeOwner,
        codec: &dyn Codec,
    ) -> Result<SessionId, SessionError> {
        let node = owner
            .tree()
            .find(full_path)
            .ok_or_else(|| SessionError::NoteMissing(full_path.to_string()))?;
        if !node.is_leaf() {
            return Err(SessionError::Tree(TreeError::NotALeaf(full_path.to_string())));
        }

        let resource = shell.resource_for(&self.namer.name_for(node));
        if let Some(existing) = self.sessions.get(&resource) {
            if existing.target() != full_path {
                return Err(SessionError::ResourceBusy {
                    resource,
                    holder: existing.target().to_string(),
                });
            }
            existing.reveal(shell)?;
            return Ok(existing.id());
        }

        let session = EditSession::open(node, resource.clone(), shell, codec)?;
        let id = session.id();
        self.sessions.insert(resource, session);
        Ok(id)
    }

    /// Materializes the note and shows it read-only. No session is created;
    /// a note that is open for editing is previewed as it currently is, and a
    /// resource held by a different note fails with [`SessionError::ResourceBusy`].
    pub fn preview(
        &self,
        full_path: &str,
        shell: &mut dyn HostEditorShell,
        owner: &dyn TreeOwner,
        codec: &dyn Codec,
    ) -> Result<ResourceId, SessionError> {
        let node = owner
            .tree()
            .find(full_path)
            .ok_or_else(|| SessionError::NoteMissing(full_path.to_string()))?;
        let resource = shell.resource_for(&self.namer.name_for(node));
        match self.sessions.get(&resource) {
            Some(existing) if existing.target() != full_path => {
                return Err(SessionError::ResourceBusy {
                    holder: existing.target().to_string(),
                    resource,
                });
            }
            Some(_) => {}
            None => {
                let text = node.decoded_content(codec, None)?;
                shell.materialize(&resource, &text)?;
            }
        }
        shell.preview(&resource)?;
        Ok(resource)
    }

    /// Routes a host event to the session owning its resource.
    /// 將主機事件交給對應的工作階段處理。
    pub fn dispatch(
        &mut self,
        event: &ShellEvent,
        shell: &mut dyn HostEditorShell,
        owner: &mut dyn TreeOwner,
        codec: &dyn Codec,
    ) -> Result<DispatchOutcome, SessionError> {
        match event.kind {
            ShellEventKind::Saved => {
                let Some(session) = self.sessions.get_mut(&event.resource) else {
                    log::trace!("ignoring save for untracked {}", event.resource);
                    return Ok(DispatchOutcome::Ignored);
                };
                let saves = session.on_save(shell, owner, codec)?;
                Ok(DispatchOutcome::Saved {
                    session: session.id(),
                    saves,
                })
            }
            ShellEventKind::Closed => {
                let Some(mut session) = self.sessions.remove(&event.resource) else {
                    log::trace!("ignoring close for untracked {}", event.resource);
                    return Ok(DispatchOutcome::Ignored);
                };
                session.on_close(shell);
                Ok(DispatchOutcome::Closed {
                    session: session.id(),
                })
            }
        }
    }

    /// Disposes every live session.
    pub fn close_all(&mut self, shell: &mut dyn HostEditorShell) {
        for (_, mut session) in self.sessions.drain() {
            session.dispose(shell);
        }
    }
}
