//! Host-agnostic view model for tree widgets.
//! 將筆記節點轉換為樹狀檢視項目的轉接層。

use crate::node::{ChildFilter, NodeKind, NoteNode};

/// Command id hosts bind to "open this note".
pub const SHOW_NOTE_COMMAND: &str = "syncedNotes.showNote";
pub const SHOW_NOTE_TITLE: &str = "Show Node";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemIcon {
    Folder,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
}

/// Command attached to an item, carrying the target note's full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCommand {
    pub title: &'static str,
    pub command: &'static str,
    pub target: String,
}

/// Everything a tree view needs to render one row.
/// 樹狀檢視呈現單一列所需的資訊。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItemView {
    pub label: String,
    pub full_path: String,
    pub context_value: &'static str,
    pub icon: ItemIcon,
    pub collapsible: Collapsible,
    pub command: Option<ItemCommand>,
}

impl From<&NoteNode> for TreeItemView {
    fn from(node: &NoteNode) -> Self {
        let folder = node.kind() == NodeKind::Folder;
        Self {
            label: node.label().to_string(),
            full_path: node.full_path().to_string(),
            context_value: if folder { "folder" } else { "note" },
            icon: if folder { ItemIcon::Folder } else { ItemIcon::File },
            collapsible: if folder {
                Collapsible::Collapsed
            } else {
                Collapsible::None
            },
            command: (!folder).then(|| ItemCommand {
                title: SHOW_NOTE_TITLE,
                command: SHOW_NOTE_COMMAND,
                target: node.full_path().to_string(),
            }),
        }
    }
}

/// Children of `node` to display. With `hide_noteless`, folders whose subtree
/// holds no note are dropped.
pub fn visible_children(node: &NoteNode, filter: ChildFilter, hide_noteless: bool) -> Vec<&NoteNode> {
    node.children_matching(filter)
        .into_iter()
        .filter(|child| !hide_noteless || child.contains_text_note_recursive())
        .collect()
}
