use crate::types::{BranchRef, CommitNode, HeadPointer, IndexSnapshot, ObjectId, RemoteRef, TreeNode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not a repository: {path}")]
    NotARepository { path: String },

    #[error("Object not found: {id}")]
    ObjectNotFound { id: String },

    #[error("Invalid UTF-8 in repository data: {what}")]
    InvalidUtf8 { what: String },

    #[error("Object store error: {message}")]
    Backend { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only queries the diagram needs from a content-addressed object store
pub trait ObjectStore {
    /// Every commit object in the store, in a stable order
    fn commits(&self) -> StoreResult<Vec<CommitNode>>;

    fn tree(&self, id: &ObjectId) -> StoreResult<TreeNode>;

    fn blob_content(&self, id: &ObjectId) -> StoreResult<Vec<u8>>;

    fn branches(&self) -> StoreResult<Vec<BranchRef>>;

    fn remotes(&self) -> StoreResult<Vec<String>>;

    /// Refs advertised by the remote's server side
    fn remote_refs(&self, remote: &str) -> StoreResult<RemoteRef>;

    fn index(&self) -> StoreResult<IndexSnapshot>;

    /// `None` when HEAD cannot be resolved to a commit (unborn or missing)
    fn head(&self) -> StoreResult<Option<HeadPointer>>;

    fn store_name(&self) -> &'static str;
}
