use serde::{Deserialize, Serialize};
use syncednotes_tree::NoteNode;

/// Suffix appended to every resource name unless configured otherwise.
pub const DEFAULT_SUFFIX: &str = ".md";

/// How a note is mapped onto an external resource name.
/// 筆記對應外部資源名稱的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// Derived from the tree-wide unique full path.
    #[default]
    Path,
    /// `<label><suffix>`; notes sharing a label share a resource.
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNamer {
    policy: NamingPolicy,
    suffix: String,
}

impl ResourceNamer {
    pub fn new(policy: NamingPolicy, suffix: impl Into<String>) -> Self {
        Self {
            policy,
            suffix: suffix.into(),
        }
    }

    pub fn policy(&self) -> NamingPolicy {
        self.policy
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Resource name for `node` under the configured policy.
    pub fn name_for(&self, node: &NoteNode) -> String {
        let stem = match self.policy {
            NamingPolicy::Path => node.full_path(),
            NamingPolicy::Label => node.label(),
        };
        format!("{}{}", portable(stem), self.suffix)
    }
}

impl Default for ResourceNamer {
    fn default() -> Self {
        Self::new(NamingPolicy::default(), DEFAULT_SUFFIX)
    }
}

/// Maps `/` to `_` and percent-escapes `_`, `%` and characters that are not
/// valid in file names, so distinct stems never share a name.
/// 將路徑轉為可攜的檔名，且不同路徑不會對應到同一檔名。
fn portable(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    for ch in stem.chars() {
        match ch {
            '/' => out.push('_'),
            '_' | '%' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => escape(ch, &mut out),
            ch if ch.is_control() => escape(ch, &mut out),
            ch => out.push(ch),
        }
    }
    out
}

fn escape(ch: char, out: &mut String) {
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{byte:02X}"));
    }
}
