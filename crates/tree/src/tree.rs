use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::node::{NoteNode, TreeError};

/// Separator used when composing child paths.
pub const PATH_SEPARATOR: char = '/';

/// Whole note tree rooted at a single folder.
/// 以單一資料夾為根的筆記樹。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteTree {
    #[serde(default)]
    pub revision: u64,
    root: NoteNode,
}

impl NoteTree {
    /// Constructs a tree containing only an empty root folder.
    /// 建立僅含空白根資料夾的筆記樹。
    pub fn empty(root_label: impl Into<String>) -> Self {
        let label = root_label.into();
        Self {
            revision: 0,
            root: NoteNode::folder(label.clone(), label),
        }
    }

    /// Wraps an existing root folder after [`NoteTree::validate`].
    pub fn from_root(root: NoteNode) -> Result<Self, TreeError> {
        let tree = Self { revision: 0, root };
        tree.validate()?;
        Ok(tree)
    }

    pub fn root(&self) -> &NoteNode {
        &self.root
    }

    /// Composes the full path of a child named `label` under `parent`.
    pub fn child_path(parent: &str, label: &str) -> String {
        format!("{parent}{PATH_SEPARATOR}{label}")
    }

    /// Finds a node by full path.
    /// 依完整路徑尋找節點。
    pub fn find(&self, full_path: &str) -> Option<&NoteNode> {
        self.root.walk().find(|node| node.full_path() == full_path)
    }

    /// Content changes go through [`NoteTree::set_content`] so `revision` stays current.
    pub(crate) fn find_mut(&mut self, full_path: &str) -> Option<&mut NoteNode> {
        find_mut_recursive(&mut self.root, full_path)
    }

    /// Appends `node` under the folder at `parent_path`. Every path in the new
    /// subtree must be unused elsewhere in the tree.
    /// 在指定資料夾下新增子節點，並確保整棵樹的路徑唯一。
    pub fn add_child(&mut self, parent_path: &str, node: NoteNode) -> Result<(), TreeError> {
        let existing: HashSet<&str> = self.root.walk().map(NoteNode::full_path).collect();
        let mut incoming = HashSet::new();
        for candidate in node.walk() {
            let path = candidate.full_path();
            if existing.contains(path) || !incoming.insert(path) {
                return Err(TreeError::DuplicatePath(path.to_string()));
            }
        }

        let parent = self
            .find_mut(parent_path)
            .ok_or_else(|| TreeError::NodeNotFound(parent_path.to_string()))?;
        parent.add_child(node)?;
        self.revision = self.revision.wrapping_add(1);
        Ok(())
    }

    /// Replaces the encoded content of the leaf at `full_path`.
    pub fn set_content(&mut self, full_path: &str, blob: impl Into<String>) -> Result<(), TreeError> {
        let node = self
            .find_mut(full_path)
            .ok_or_else(|| TreeError::NodeNotFound(full_path.to_string()))?;
        node.set_content(blob)?;
        self.revision = self.revision.wrapping_add(1);
        Ok(())
    }

    /// Checks the invariants a loaded tree may have lost: the root is a folder,
    /// sibling labels are unique and every full path occurs exactly once.
    /// 檢查根節點為資料夾、同層標籤唯一且完整路徑不重複。
    pub fn validate(&self) -> Result<(), TreeError> {
        if !self.root.is_folder() {
            return Err(TreeError::NotAFolder(self.root.full_path().to_string()));
        }
        let mut seen = HashSet::new();
        for node in self.root.walk() {
            if !seen.insert(node.full_path()) {
                return Err(TreeError::DuplicatePath(node.full_path().to_string()));
            }
            let mut labels = HashSet::new();
            for child in node.children() {
                if !labels.insert(child.label()) {
                    return Err(TreeError::DuplicateLabel {
                        parent: node.full_path().to_string(),
                        label: child.label().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All leaves in display order.
    pub fn leaves(&self) -> impl Iterator<Item = &NoteNode> {
        self.root.walk().filter(|node| node.is_leaf())
    }

    pub fn get_json(&self) -> String {
        self.root.get_json()
    }
}

fn find_mut_recursive<'a>(node: &'a mut NoteNode, full_path: &str) -> Option<&'a mut NoteNode> {
    if node.full_path() == full_path {
        return Some(node);
    }
    node.children_mut()
        .iter_mut()
        .find_map(|child| find_mut_recursive(child, full_path))
}

/// Owns the tree and persists it on request.
/// 持有筆記樹並負責持久化的協作者。
pub trait TreeOwner {
    fn tree(&self) -> &NoteTree;
    fn tree_mut(&mut self) -> &mut NoteTree;

    /// Requests persistence of the whole tree. Failures are handled by the
    /// owner; callers never observe them.
    fn save_to_config(&mut self);
}
