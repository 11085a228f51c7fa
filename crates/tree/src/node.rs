use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{Codec, CodecError};

/// Marker appended to truncated previews.
pub const ELLIPSIS: &str = "...";

/// Whether a node is a folder or a leaf note.
/// 節點類型：資料夾或筆記。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    Leaf,
}

/// Payload of a node. A folder owns an ordered child sequence (possibly empty);
/// a leaf owns codec-encoded content.
/// 節點內容：資料夾持有有序子節點，筆記持有編碼後的內容。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteBody {
    Children(Vec<NoteNode>),
    Content(String),
}

/// Snapshot of the flags derived from a node's direct children.
/// 由直接子節點推導出的狀態旗標。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub kind: NodeKind,
    pub has_children: bool,
    pub is_empty_folder: bool,
    pub has_sub_folders: bool,
}

/// Selects which direct children [`NoteNode::children_matching`] returns.
/// 篩選直接子節點的條件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildFilter {
    pub include_notes: bool,
    pub include_folders: bool,
    pub include_empty_folders: bool,
}

impl ChildFilter {
    pub const ALL: Self = Self::new(true, true, true);

    pub const fn new(include_notes: bool, include_folders: bool, include_empty_folders: bool) -> Self {
        Self {
            include_notes,
            include_folders,
            include_empty_folders,
        }
    }

    /// Returns `true` when `child` passes the filter.
    pub fn matches(&self, child: &NoteNode) -> bool {
        match child.kind() {
            NodeKind::Leaf => self.include_notes,
            NodeKind::Folder => {
                self.include_folders && (self.include_empty_folders || !child.is_empty_folder())
            }
        }
    }
}

impl Default for ChildFilter {
    fn default() -> Self {
        Self::ALL
    }
}

/// A folder or leaf note inside the note tree.
/// 筆記樹中的資料夾或筆記節點。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNoteNode")]
pub struct NoteNode {
    label: String,
    full_path: String,
    #[serde(flatten)]
    body: NoteBody,
}

/// On-disk shape of a node; rebuilt through [`NoteNode::new`] so a payload
/// carrying both `content` and `children`, or repeated sibling labels, is
/// rejected instead of silently reshaped.
#[derive(Deserialize)]
struct RawNoteNode {
    label: String,
    full_path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    children: Option<Vec<NoteNode>>,
}

impl TryFrom<RawNoteNode> for NoteNode {
    type Error = TreeError;

    fn try_from(raw: RawNoteNode) -> Result<Self, Self::Error> {
        NoteNode::new(raw.label, raw.full_path, raw.content, raw.children)
    }
}

impl NoteNode {
    /// Builds a node from optional content and children. Supplying children makes
    /// the node a folder; otherwise it is a leaf whose missing content is empty.
    /// 依據是否提供子節點建立資料夾或筆記。
    pub fn new(
        label: impl Into<String>,
        full_path: impl Into<String>,
        content: Option<String>,
        children: Option<Vec<NoteNode>>,
    ) -> Result<Self, TreeError> {
        let label = label.into();
        let full_path = full_path.into();
        match (content, children) {
            (Some(_), Some(_)) => Err(TreeError::AmbiguousKind(full_path)),
            (None, Some(children)) => {
                let mut folder = Self::folder(label, full_path);
                for child in children {
                    folder.add_child(child)?;
                }
                Ok(folder)
            }
            (content, None) => Ok(Self::note(label, full_path, content.unwrap_or_default())),
        }
    }

    /// Creates an empty folder.
    pub fn folder(label: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            full_path: full_path.into(),
            body: NoteBody::Children(Vec::new()),
        }
    }

    /// Creates a leaf holding already-encoded content.
    pub fn note(
        label: impl Into<String>,
        full_path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            full_path: full_path.into(),
            body: NoteBody::Content(content.into()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn body(&self) -> &NoteBody {
        &self.body
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NoteBody::Children(_) => NodeKind::Folder,
            NoteBody::Content(_) => NodeKind::Leaf,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == NodeKind::Folder
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// Direct children in display order; empty for a leaf.
    pub fn children(&self) -> &[NoteNode] {
        match &self.body {
            NoteBody::Children(children) => children,
            NoteBody::Content(_) => &[],
        }
    }

    /// Encoded content of a leaf.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NoteBody::Content(content) => Some(content),
            NoteBody::Children(_) => None,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn is_empty_folder(&self) -> bool {
        matches!(&self.body, NoteBody::Children(children) if children.is_empty())
    }

    pub fn has_sub_folders(&self) -> bool {
        self.children().iter().any(NoteNode::is_folder)
    }

    /// Derives every flag from the current children in a single pass.
    /// 一次推導所有狀態旗標。
    pub fn state(&self) -> NodeState {
        let kind = self.kind();
        let children = self.children();
        NodeState {
            kind,
            has_children: !children.is_empty(),
            is_empty_folder: kind == NodeKind::Folder && children.is_empty(),
            has_sub_folders: children.iter().any(NoteNode::is_folder),
        }
    }

    /// Appends a child to this folder, keeping insertion order.
    /// 將子節點附加到資料夾尾端。
    pub fn add_child(&mut self, child: NoteNode) -> Result<(), TreeError> {
        let NoteBody::Children(children) = &mut self.body else {
            return Err(TreeError::NotAFolder(self.full_path.clone()));
        };
        if children.iter().any(|existing| existing.label == child.label) {
            return Err(TreeError::DuplicateLabel {
                parent: self.full_path.clone(),
                label: child.label,
            });
        }
        children.push(child);
        Ok(())
    }

    /// Replaces the encoded content of a leaf.
    pub fn set_content(&mut self, blob: impl Into<String>) -> Result<(), TreeError> {
        match &mut self.body {
            NoteBody::Content(content) => {
                *content = blob.into();
                Ok(())
            }
            NoteBody::Children(_) => Err(TreeError::NotALeaf(self.full_path.clone())),
        }
    }

    /// Encodes `text` and stores it as this leaf's content. The node is left
    /// untouched when encoding fails.
    pub fn encode_content(&mut self, codec: &dyn Codec, text: &str) -> Result<(), TreeError> {
        if !self.is_leaf() {
            return Err(TreeError::NotALeaf(self.full_path.clone()));
        }
        let blob = codec.encode(text)?;
        self.set_content(blob)
    }

    /// Filters direct children using the three inclusion switches.
    /// 以三個布林條件篩選直接子節點。
    pub fn get_children(
        &self,
        include_notes: bool,
        include_folders: bool,
        include_empty_folders: bool,
    ) -> Vec<&NoteNode> {
        self.children_matching(ChildFilter::new(
            include_notes,
            include_folders,
            include_empty_folders,
        ))
    }

    pub fn children_matching(&self, filter: ChildFilter) -> Vec<&NoteNode> {
        self.children()
            .iter()
            .filter(|child| filter.matches(child))
            .collect()
    }

    /// Returns `true` when this node is a leaf or any descendant is one.
    /// 若本身或任一後代為筆記則回傳 `true`。
    pub fn contains_text_note_recursive(&self) -> bool {
        match &self.body {
            NoteBody::Content(_) => true,
            NoteBody::Children(children) => children.iter().any(NoteNode::contains_text_note_recursive),
        }
    }

    /// Diagnostic projection of the subtree, e.g. `{"A":[{"x" : "aGk="}]}`.
    /// Labels and content are JSON-escaped.
    pub fn get_json(&self) -> String {
        let label = json_string(&self.label);
        match &self.body {
            NoteBody::Children(children) => {
                let parts: Vec<String> = children.iter().map(NoteNode::get_json).collect();
                format!("{{{label}:[{}]}}", parts.join(","))
            }
            NoteBody::Content(content) => format!("{{{label} : {}}}", json_string(content)),
        }
    }

    /// Decodes the leaf content. With `Some(n)` (n > 0) the first `n` characters
    /// are returned followed by [`ELLIPSIS`], even when the text is shorter.
    /// 解碼筆記內容；指定長度時截斷並一律附加省略號。
    pub fn decoded_content(
        &self,
        codec: &dyn Codec,
        truncate_to: Option<usize>,
    ) -> Result<String, TreeError> {
        let blob = self
            .content()
            .ok_or_else(|| TreeError::NotALeaf(self.full_path.clone()))?;
        let decoded = codec.decode(blob)?;
        match truncate_to {
            Some(limit) if limit > 0 => {
                let mut preview: String = decoded.chars().take(limit).collect();
                preview.push_str(ELLIPSIS);
                Ok(preview)
            }
            _ => Ok(decoded),
        }
    }

    /// Depth-first walk over this node and its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [NoteNode] {
        match &mut self.body {
            NoteBody::Children(children) => children,
            NoteBody::Content(_) => &mut [],
        }
    }
}

/// Pre-order iterator returned by [`NoteNode::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a NoteNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a NoteNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// Structural and content errors raised by tree operations.
/// 筆記樹操作錯誤類型。
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("node {0} is not a folder")]
    NotAFolder(String),
    #[error("node {0} is not a note")]
    NotALeaf(String),
    #[error("node {0} cannot hold both content and children")]
    AmbiguousKind(String),
    #[error("folder {parent} already contains {label:?}")]
    DuplicateLabel { parent: String, label: String },
    #[error("path {0} already exists in the tree")]
    DuplicatePath(String),
    #[error("node {0} not found")]
    NodeNotFound(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
