use serde::{Deserialize, Serialize};
use std::fmt;

/// File name treated as repository noise rather than content
pub const IGNORE_FILE: &str = ".gitignore";

/// Number of hex characters used as a diagram node identifier
pub const SHORT_HASH_LEN: usize = 4;

/// Maximum number of characters shown in a content preview
pub const PREVIEW_MAX_CHARS: usize = 10;

/// Full hex content hash of a stored object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First four hex characters, used as the node id in the diagram.
    ///
    /// Distinct objects sharing a prefix collapse into one node.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(SHORT_HASH_LEN)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(hex: &str) -> Self {
        Self::new(hex)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNode {
    pub id: ObjectId,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
}

impl CommitNode {
    pub fn new(id: impl Into<ObjectId>, tree: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            tree: tree.into(),
            parents: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ObjectId>) -> Self {
        self.parents.push(parent.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Tree,
    /// Gitlink pointing at a commit in another repository
    Submodule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub id: ObjectId,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn file(name: impl Into<String>, id: impl Into<ObjectId>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: EntryKind::File,
        }
    }

    pub fn tree(name: impl Into<String>, id: impl Into<ObjectId>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            kind: EntryKind::Tree,
        }
    }

    pub fn is_ignore_file(&self) -> bool {
        self.name == IGNORE_FILE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: ObjectId,
    pub entries: Vec<TreeEntry>,
}

impl TreeNode {
    pub fn new(id: impl Into<ObjectId>, entries: Vec<TreeEntry>) -> Self {
        Self {
            id: id.into(),
            entries,
        }
    }

    /// Files directly inside this tree, sub-trees not included
    pub fn files(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::File)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    /// Short branch name, e.g. `main`
    pub name: String,
    pub target: ObjectId,
}

impl BranchRef {
    pub fn new(name: impl Into<String>, target: impl Into<ObjectId>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

/// A ref advertised by a remote's server side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRef {
    /// Full ref name as advertised, e.g. `refs/heads/main`
    pub name: String,
    pub target: ObjectId,
}

impl ServerRef {
    pub fn new(name: impl Into<String>, target: impl Into<ObjectId>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }

    pub fn short_name(&self) -> &str {
        shorten_ref_name(&self.name)
    }

    /// The symbolic `HEAD` and peeled tag entries are not real refs
    pub fn is_synthetic(&self) -> bool {
        self.name == "HEAD" || self.name.ends_with("^{}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub name: String,
    pub refs: Vec<ServerRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub id: ObjectId,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, id: impl Into<ObjectId>) -> Self {
        Self {
            path: path.into(),
            id: id.into(),
        }
    }

    pub fn is_ignore_file(&self) -> bool {
        self.path == IGNORE_FILE
    }
}

/// Staged entries plus whether the index still carries a valid cached tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub entries: Vec<IndexEntry>,
    pub cache_valid: bool,
}

impl IndexSnapshot {
    pub fn new(entries: Vec<IndexEntry>, cache_valid: bool) -> Self {
        Self {
            entries,
            cache_valid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn only_ignore_file(&self) -> bool {
        matches!(self.entries.as_slice(), [only] if only.is_ignore_file())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HeadPointer {
    Branch { name: String, target: ObjectId },
    Detached { target: ObjectId },
}

impl HeadPointer {
    pub fn target(&self) -> &ObjectId {
        match self {
            HeadPointer::Branch { target, .. } | HeadPointer::Detached { target } => target,
        }
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            HeadPointer::Branch { name, .. } => Some(name),
            HeadPointer::Detached { .. } => None,
        }
    }
}

/// Strip the well-known namespace from a ref name (`refs/heads/main` -> `main`)
pub fn shorten_ref_name(name: &str) -> &str {
    const PREFIXES: [&str; 4] = ["refs/heads/", "refs/tags/", "refs/remotes/", "refs/"];
    PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

/// First line of `content`, cut to at most `max_chars` characters
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    content
        .chars()
        .take_while(|&c| c != '\n')
        .take(max_chars)
        .collect()
}

/// Preview text for raw blob bytes; invalid UTF-8 is replaced, never rejected
pub fn content_preview(content: &[u8]) -> String {
    truncate_preview(&String::from_utf8_lossy(content), PREVIEW_MAX_CHARS)
}
