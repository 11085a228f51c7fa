use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::node::TreeError;
use crate::tree::{NoteTree, TreeOwner};
use crate::util::write_atomic;

/// Label of the root folder created for a fresh store.
pub const DEFAULT_ROOT_LABEL: &str = "Notes";

/// Persists a `NoteTree` to disk using JSON + atomic writes.
/// 以 JSON 搭配原子寫入方式儲存 `NoteTree`。
#[derive(Debug)]
pub struct NoteTreeStore {
    path: PathBuf,
    tree: NoteTree,
    saves: u64,
}

impl NoteTreeStore {
    /// Loads the tree at `path`, starting from an empty tree when the file is absent.
    /// 從磁碟載入筆記樹；若檔案不存在則建立空白樹。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TreeStoreError> {
        let path = path.as_ref().to_path_buf();
        let tree = match fs::read_to_string(&path) {
            Ok(contents) => {
                let tree: NoteTree = serde_json::from_str(&contents)
                    .map_err(|err| TreeStoreError::Invalid(err.to_string()))?;
                tree.validate()?;
                tree
            }
            Err(err) if err.kind() == ErrorKind::NotFound => NoteTree::empty(DEFAULT_ROOT_LABEL),
            Err(err) => return Err(TreeStoreError::Io(err)),
        };
        Ok(Self {
            path,
            tree,
            saves: 0,
        })
    }

    pub fn new(path: impl AsRef<Path>, tree: NoteTree) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            tree,
            saves: 0,
        }
    }

    /// Returns the backing path used for persistence.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful writes since this store was created.
    pub fn save_count(&self) -> u64 {
        self.saves
    }

    /// Writes the current tree atomically.
    /// 將目前的筆記樹以原子方式寫入磁碟。
    pub fn save(&mut self) -> Result<(), TreeStoreError> {
        let payload = serde_json::to_vec_pretty(&self.tree)
            .map_err(|err| TreeStoreError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload)?;
        self.saves += 1;
        log::debug!(
            "saved note tree revision {} to {}",
            self.tree.revision,
            self.path.display()
        );
        Ok(())
    }
}

impl TreeOwner for NoteTreeStore {
    fn tree(&self) -> &NoteTree {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut NoteTree {
        &mut self.tree
    }

    fn save_to_config(&mut self) {
        if let Err(err) = self.save() {
            log::error!("failed to persist notes to {}: {}", self.path.display(), err);
        }
    }
}

/// Errors emitted by [`NoteTreeStore`].
/// [`NoteTreeStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum TreeStoreError {
    #[error("note tree IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid note tree payload: {0}")]
    Invalid(String),
    #[error("inconsistent note tree: {0}")]
    Tree(#[from] TreeError),
}
