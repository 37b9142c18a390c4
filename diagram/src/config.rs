use serde::{Deserialize, Serialize};

/// Which parts of the repository graph end up in the diagram.
///
/// Every toggle is independent and off by default. One value is built per
/// pass and only ever borrowed by the emitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub show_tree: bool,
    pub show_blob: bool,
    pub show_branch: bool,
    pub show_head: bool,
    pub show_history: bool,
    pub show_content: bool,
    pub show_index: bool,
    pub show_remote: bool,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything switched on
    pub fn all() -> Self {
        Self {
            show_tree: true,
            show_blob: true,
            show_branch: true,
            show_head: true,
            show_history: true,
            show_content: true,
            show_index: true,
            show_remote: true,
        }
    }

    pub fn with_tree(mut self, enabled: bool) -> Self {
        self.show_tree = enabled;
        self
    }

    pub fn with_blob(mut self, enabled: bool) -> Self {
        self.show_blob = enabled;
        self
    }

    pub fn with_branch(mut self, enabled: bool) -> Self {
        self.show_branch = enabled;
        self
    }

    pub fn with_head(mut self, enabled: bool) -> Self {
        self.show_head = enabled;
        self
    }

    pub fn with_history(mut self, enabled: bool) -> Self {
        self.show_history = enabled;
        self
    }

    pub fn with_content(mut self, enabled: bool) -> Self {
        self.show_content = enabled;
        self
    }

    pub fn with_index(mut self, enabled: bool) -> Self {
        self.show_index = enabled;
        self
    }

    pub fn with_remote(mut self, enabled: bool) -> Self {
        self.show_remote = enabled;
        self
    }

    /// Content previews are attached to blob edges, so without blobs they are never shown
    pub fn previews_content(&self) -> bool {
        self.show_blob && self.show_content
    }
}
