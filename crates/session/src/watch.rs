use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::event::{EventKind, ModifyKind, RemoveKind};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};

use crate::shell::ShellError;

/// Classifies observed changes to a file in the watched directory.
/// 監控到的檔案變更種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Written,
    Removed,
}

/// File change with the affected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Watches one directory (non-recursively) through `notify`.
/// 以 `notify` 監看單一資料夾。
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<FileChange>,
}

impl DirectoryWatcher {
    pub fn new(dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for change in map_event(event) {
                        let _ = tx.send(change);
                    }
                }
                Err(err) => log::warn!("watch error: {}", err),
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Waits up to `timeout` for the first change, then drains whatever else
    /// is already queued.
    /// 在期限內等待變更，並取出所有已排隊的事件。
    pub fn collect(&self, timeout: Duration) -> Result<Vec<FileChange>, ShellError> {
        drain(&self.rx, timeout)
    }
}

fn drain(rx: &Receiver<FileChange>, timeout: Duration) -> Result<Vec<FileChange>, ShellError> {
    let mut changes = match rx.recv_timeout(timeout) {
        Ok(change) => vec![change],
        Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
        Err(RecvTimeoutError::Disconnected) => return Err(ShellError::WatcherDisconnected),
    };
    changes.extend(rx.try_iter());
    Ok(changes)
}

fn map_event(event: notify::Event) -> Vec<FileChange> {
    let kind = match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Editors that save via rename report the final name last.
            return event
                .paths
                .last()
                .map(|path| FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Written,
                })
                .into_iter()
                .collect();
        }
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Create(_) => ChangeKind::Written,
        EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
            ChangeKind::Removed
        }
        _ => return Vec::new(),
    };
    event
        .paths
        .into_iter()
        .map(|path| FileChange { path, kind })
        .collect()
}
