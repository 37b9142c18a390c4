pub mod config;
pub mod emitter;
pub mod mermaid;
pub mod store;
pub mod types;

pub use config::FeatureSet;
pub use emitter::{emit_placeholder, EmitError, EmitResult, Flow, GraphEmitter};
pub use mermaid::{EdgeStyle, Highlight, Node, Shape, Statement};
pub use store::{ObjectStore, StoreError, StoreResult};
pub use types::{
    content_preview, shorten_ref_name, truncate_preview, BranchRef, CommitNode, EntryKind,
    HeadPointer, IndexEntry, IndexSnapshot, ObjectId, RemoteRef, ServerRef, TreeEntry, TreeNode,
};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::emitter::*;
    pub use crate::store::*;
    pub use crate::types::*;
}
