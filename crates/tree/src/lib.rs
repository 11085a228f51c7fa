//! Note tree entity model, content codec and tree persistence for SyncedNotes.
//! SyncedNotes 的筆記樹模型、內容編碼與持久化。

mod util;

pub mod codec;
pub mod node;
pub mod presentation;
pub mod store;
pub mod tree;

pub use codec::{Base64Codec, Codec, CodecError, PlainCodec};
pub use node::{ChildFilter, NodeKind, NodeState, NoteBody, NoteNode, TreeError, ELLIPSIS};
pub use presentation::{visible_children, Collapsible, ItemCommand, ItemIcon, TreeItemView};
pub use store::{NoteTreeStore, TreeStoreError, DEFAULT_ROOT_LABEL};
pub use tree::{NoteTree, TreeOwner};
pub use util::write_atomic;
