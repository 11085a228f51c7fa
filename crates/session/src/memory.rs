use std::collections::{BTreeMap, HashMap};
use std::io;

use crate::shell::{
    HostEditorShell, ResourceId, ShellError, ShellEvent, ShellEventKind, SubscriptionId,
};

/// In-memory host shell for embedding the core without a real editor.
/// Events are produced only for resources with a live subscription.
/// 不依賴實際編輯器的記憶體主機實作。
#[derive(Debug, Default)]
pub struct MemoryShell {
    resources: BTreeMap<ResourceId, String>,
    opened: Vec<ResourceId>,
    previewed: Vec<ResourceId>,
    subscriptions: HashMap<SubscriptionId, (ShellEventKind, ResourceId)>,
    next_subscription: u64,
    fail_deletes: bool,
    fail_opens: bool,
}

impl MemoryShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the text of a resource, as a user typing in the editor would.
    pub fn edit(&mut self, resource: &ResourceId, text: impl Into<String>) {
        self.resources.insert(resource.clone(), text.into());
    }

    pub fn text(&self, resource: &ResourceId) -> Option<&str> {
        self.resources.get(resource).map(String::as_str)
    }

    pub fn exists(&self, resource: &ResourceId) -> bool {
        self.resources.contains_key(resource)
    }

    /// Removes a resource behind the session's back.
    pub fn remove_externally(&mut self, resource: &ResourceId) {
        self.resources.remove(resource);
    }

    /// Resources passed to `open`, in call order.
    pub fn opened(&self) -> &[ResourceId] {
        &self.opened
    }

    pub fn previewed(&self) -> &[ResourceId] {
        &self.previewed
    }

    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn set_fail_deletes(&mut self, fail: bool) {
        self.fail_deletes = fail;
    }

    pub fn set_fail_opens(&mut self, fail: bool) {
        self.fail_opens = fail;
    }

    /// Save notification for `resource`, if anything listens for it.
    pub fn emit_save(&self, resource: &ResourceId) -> Option<ShellEvent> {
        self.emit(ShellEventKind::Saved, resource)
    }

    pub fn emit_close(&self, resource: &ResourceId) -> Option<ShellEvent> {
        self.emit(ShellEventKind::Closed, resource)
    }

    fn emit(&self, kind: ShellEventKind, resource: &ResourceId) -> Option<ShellEvent> {
        self.subscriptions
            .values()
            .any(|(k, r)| *k == kind && r == resource)
            .then(|| ShellEvent {
                kind,
                resource: resource.clone(),
            })
    }
}

impl HostEditorShell for MemoryShell {
    fn resource_for(&self, name: &str) -> ResourceId {
        ResourceId::new(name)
    }

    fn materialize(&mut self, resource: &ResourceId, text: &str) -> Result<(), ShellError> {
        self.resources.insert(resource.clone(), text.to_string());
        Ok(())
    }

    fn open(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        if self.fail_opens {
            return Err(ShellError::Open {
                resource: resource.clone(),
                reason: "opening disabled".into(),
            });
        }
        if !self.exists(resource) {
            return Err(ShellError::NotFound(resource.clone()));
        }
        self.opened.push(resource.clone());
        Ok(())
    }

    fn preview(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        if !self.exists(resource) {
            return Err(ShellError::NotFound(resource.clone()));
        }
        self.previewed.push(resource.clone());
        Ok(())
    }

    fn read_text(&mut self, resource: &ResourceId) -> Result<String, ShellError> {
        self.resources
            .get(resource)
            .cloned()
            .ok_or_else(|| ShellError::NotFound(resource.clone()))
    }

    fn delete(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        if self.fail_deletes {
            return Err(ShellError::io(
                resource,
                io::Error::new(io::ErrorKind::PermissionDenied, "deletion disabled"),
            ));
        }
        self.resources
            .remove(resource)
            .map(|_| ())
            .ok_or_else(|| ShellError::NotFound(resource.clone()))
    }

    fn subscribe(&mut self, kind: ShellEventKind, resource: &ResourceId) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId::new(self.next_subscription);
        self.subscriptions.insert(id, (kind, resource.clone()));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.remove(&subscription);
    }
}
