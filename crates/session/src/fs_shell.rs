use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use crate::shell::{
    HostEditorShell, ResourceId, ShellError, ShellEvent, ShellEventKind, SubscriptionId,
};
use crate::watch::{ChangeKind, DirectoryWatcher};

/// Host shell backed by files in a scratch directory and an external editor
/// process. A write that changes the file becomes a save event; the editor
/// exiting or the file disappearing becomes a close event.
/// 以暫存資料夾與外部編輯器程序實作的主機。
pub struct FsShell {
    root: PathBuf,
    editor: Option<Vec<String>>,
    watcher: DirectoryWatcher,
    subscriptions: HashMap<SubscriptionId, (ShellEventKind, ResourceId)>,
    next_subscription: u64,
    fingerprints: HashMap<ResourceId, u64>,
    editors: HashMap<ResourceId, Child>,
}

impl FsShell {
    /// Creates the scratch directory if needed and starts watching it.
    /// `editor` is a command line such as `"code --wait"`.
    pub fn new(root: impl AsRef<Path>, editor: Option<&str>) -> Result<Self, ShellError> {
        let root = root.as_ref();
        let scratch = ResourceId::new(root.to_string_lossy());
        fs::create_dir_all(root).map_err(|err| ShellError::io(&scratch, err))?;
        let root = fs::canonicalize(root).map_err(|err| ShellError::io(&scratch, err))?;
        let watcher = DirectoryWatcher::new(&root)?;
        let editor = editor
            .map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        Ok(Self {
            root,
            editor,
            watcher,
            subscriptions: HashMap::new(),
            next_subscription: 0,
            fingerprints: HashMap::new(),
            editors: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collects host events, waiting at most `timeout` for file activity.
    /// Only subscribed resources produce events; repeated writes that leave
    /// the text unchanged are dropped. Fails once the watcher has stopped.
    /// 收集主機事件；只有已訂閱的資源會產生事件。
    pub fn poll_events(&mut self, timeout: Duration) -> Result<Vec<ShellEvent>, ShellError> {
        let mut written = BTreeSet::new();
        let mut removed = BTreeSet::new();
        for change in self.watcher.collect(timeout)? {
            let resource = ResourceId::new(change.path.to_string_lossy());
            match change.kind {
                ChangeKind::Written => {
                    written.insert(resource);
                }
                ChangeKind::Removed => {
                    removed.insert(resource);
                }
            }
        }

        let mut exited = BTreeSet::new();
        for (resource, child) in self.editors.iter_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::debug!("editor for {} exited with {}", resource, status);
                    exited.insert(resource.clone());
                }
                Ok(None) => {}
                Err(err) => log::warn!("cannot query editor for {}: {}", resource, err),
            }
        }
        for resource in &exited {
            self.editors.remove(resource);
            // A final write may not have been reported yet.
            written.insert(resource.clone());
        }

        let mut events = Vec::new();
        let touched: BTreeSet<ResourceId> = written.union(&removed).cloned().collect();
        for resource in touched {
            if self.is_subscribed(ShellEventKind::Saved, &resource) && self.take_if_changed(&resource)
            {
                events.push(ShellEvent::saved(resource));
            }
        }

        let mut closing = exited;
        closing.extend(
            removed
                .into_iter()
                .filter(|resource| !Self::path_of(resource).exists()),
        );
        for resource in closing {
            if self.is_subscribed(ShellEventKind::Closed, &resource) {
                events.push(ShellEvent::closed(resource));
            }
        }
        Ok(events)
    }

    fn is_subscribed(&self, kind: ShellEventKind, resource: &ResourceId) -> bool {
        self.subscriptions
            .values()
            .any(|(k, r)| *k == kind && r == resource)
    }

    fn take_if_changed(&mut self, resource: &ResourceId) -> bool {
        let Ok(text) = fs::read_to_string(resource.as_str()) else {
            return false;
        };
        let current = fingerprint(&text);
        let previous = self.fingerprints.insert(resource.clone(), current);
        previous != Some(current)
    }

    fn path_of(resource: &ResourceId) -> &Path {
        Path::new(resource.as_str())
    }
}

impl HostEditorShell for FsShell {
    fn resource_for(&self, name: &str) -> ResourceId {
        ResourceId::new(self.root.join(name).to_string_lossy())
    }

    fn materialize(&mut self, resource: &ResourceId, text: &str) -> Result<(), ShellError> {
        log::debug!("temp file: {}", resource);
        fs::write(Self::path_of(resource), text).map_err(|err| ShellError::io(resource, err))?;
        self.fingerprints.insert(resource.clone(), fingerprint(text));
        Ok(())
    }

    fn open(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        if self.editors.contains_key(resource) {
            return Ok(());
        }
        let Some((program, args)) = self.editor.as_ref().and_then(|parts| parts.split_first())
        else {
            log::info!("open {} in your editor", resource);
            return Ok(());
        };
        let child = Command::new(program)
            .args(args)
            .arg(Self::path_of(resource))
            .spawn()
            .map_err(|err| ShellError::Open {
                resource: resource.clone(),
                reason: err.to_string(),
            })?;
        self.editors.insert(resource.clone(), child);
        Ok(())
    }

    fn read_text(&mut self, resource: &ResourceId) -> Result<String, ShellError> {
        fs::read_to_string(Self::path_of(resource)).map_err(|err| ShellError::io(resource, err))
    }

    fn delete(&mut self, resource: &ResourceId) -> Result<(), ShellError> {
        self.fingerprints.remove(resource);
        if let Some(child) = self.editors.remove(resource) {
            stop_editor(resource, child);
        }
        match fs::remove_file(Self::path_of(resource)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(ShellError::NotFound(resource.clone()))
            }
            Err(err) => Err(ShellError::io(resource, err)),
        }
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

impl Drop for FsShell {
    fn drop(&mut self) {
        for (resource, child) in self.editors.drain() {
            stop_editor(&resource, child);
        }
    }
}

/// Kills the editor if it is still running and reaps it.
fn stop_editor(resource: &ResourceId, mut child: Child) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(err) => log::warn!("cannot query editor for {}: {}", resource, err),
    }
    if let Err(err) = child.kill() {
        log::debug!("editor for {} already gone: {}", resource, err);
    }
    if let Err(err) = child.wait() {
        log::warn!("cannot reap editor for {}: {}", resource, err);
    }
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
