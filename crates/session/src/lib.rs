//! Edit sessions that round-trip a note through an external editor.
//! 透過外部編輯器編輯筆記的工作階段管理。

mod fs_shell;
mod watch;

pub mod manager;
pub mod memory;
pub mod naming;
pub mod session;
pub mod shell;

pub use fs_shell::FsShell;
pub use manager::{DispatchOutcome, EditSessionManager};
pub use memory::MemoryShell;
pub use naming::{NamingPolicy, ResourceNamer, DEFAULT_SUFFIX};
pub use session::{EditSession, SessionError, SessionId, SessionState};
pub use shell::{
    HostEditorShell, ResourceId, ShellError, ShellEvent, ShellEventKind, SubscriptionId,
};
