//! Git operations layer
//!
//! Reads commits, trees, blobs, refs and the index from actual repositories
//! using git2-rs and converts them into the diagram's data model.

use diagram::{
    BranchRef, CommitNode, EntryKind, HeadPointer, IndexEntry, IndexSnapshot, ObjectId,
    ObjectStore, RemoteRef, ServerRef, StoreError, StoreResult, TreeEntry, TreeNode,
};
use git2::{BranchType, Direction, ErrorCode, ObjectType, Oid, Repository};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during git operations
#[derive(Error, Debug)]
pub enum GitOperationError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found at path: {0}")]
    RepositoryNotFound(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid UTF-8 in git data: {0}")]
    InvalidUtf8(String),
}

pub type GitOperationResult<T> = Result<T, GitOperationError>;

impl From<GitOperationError> for StoreError {
    fn from(err: GitOperationError) -> Self {
        match err {
            GitOperationError::RepositoryNotFound(path) => StoreError::NotARepository { path },
            GitOperationError::ObjectNotFound(id) => StoreError::ObjectNotFound { id },
            GitOperationError::InvalidUtf8(what) => StoreError::InvalidUtf8 { what },
            GitOperationError::Git(e) => StoreError::Backend {
                message: e.message().to_string(),
            },
        }
    }
}

/// Read-only view of a repository on disk
pub struct GitStore {
    repo: Repository,
    path: PathBuf,
}

impl GitStore {
    /// Open the repository at exactly `path`; parent directories are not searched
    pub fn open(path: impl AsRef<Path>) -> GitOperationResult<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "cannot open repository");
            GitOperationError::RepositoryNotFound(path.display().to_string())
        })?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `.git` directory (or the repository itself when bare)
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }
}

impl ObjectStore for GitStore {
    fn commits(&self) -> StoreResult<Vec<CommitNode>> {
        Ok(read_commits(&self.repo)?)
    }

    fn tree(&self, id: &ObjectId) -> StoreResult<TreeNode> {
        Ok(read_tree(&self.repo, id)?)
    }

    fn blob_content(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        Ok(read_blob(&self.repo, id)?)
    }

    fn branches(&self) -> StoreResult<Vec<BranchRef>> {
        Ok(read_local_branches(&self.repo)?)
    }

    fn remotes(&self) -> StoreResult<Vec<String>> {
        Ok(read_remote_names(&self.repo)?)
    }

    fn remote_refs(&self, remote: &str) -> StoreResult<RemoteRef> {
        Ok(list_remote_refs(&self.repo, remote)?)
    }

    fn index(&self) -> StoreResult<IndexSnapshot> {
        Ok(read_index(&self.repo)?)
    }

    fn head(&self) -> StoreResult<Option<HeadPointer>> {
        Ok(read_head(&self.repo)?)
    }

    fn store_name(&self) -> &'static str {
        "git2"
    }
}

fn to_object_id(oid: Oid) -> ObjectId {
    ObjectId::new(oid.to_string())
}

fn to_oid(id: &ObjectId) -> GitOperationResult<Oid> {
    Ok(Oid::from_str(id.as_str())?)
}

/// Maps git2's "not found" onto [`GitOperationError::ObjectNotFound`]
fn missing(id: &ObjectId) -> impl FnOnce(git2::Error) -> GitOperationError + '_ {
    move |e| {
        if e.code() == ErrorCode::NotFound {
            GitOperationError::ObjectNotFound(id.to_string())
        } else {
            GitOperationError::Git(e)
        }
    }
}

/// Every commit object in the object database, sorted by hash.
///
/// Objects are enumerated from the database rather than walked from refs,
/// so unreachable commits are included too.
pub fn read_commits(repo: &Repository) -> GitOperationResult<Vec<CommitNode>> {
    let odb = repo.odb()?;
    let mut oids = Vec::new();
    odb.foreach(|oid| {
        oids.push(*oid);
        true
    })?;
    // an object may live both loose and packed
    oids.sort();
    oids.dedup();

    let mut commits = Vec::new();
    for oid in oids {
        let (_, kind) = odb.read_header(oid)?;
        if kind != ObjectType::Commit {
            continue;
        }
        let commit = repo.find_commit(oid)?;
        commits.push(CommitNode {
            id: to_object_id(oid),
            tree: to_object_id(commit.tree_id()),
            parents: commit.parent_ids().map(to_object_id).collect(),
        });
    }
    Ok(commits)
}

pub fn read_tree(repo: &Repository, id: &ObjectId) -> GitOperationResult<TreeNode> {
    let tree = repo.find_tree(to_oid(id)?).map_err(missing(id))?;
    let entries = tree
        .iter()
        .map(|entry| {
            let kind = match entry.kind() {
                Some(ObjectType::Tree) => EntryKind::Tree,
                Some(ObjectType::Commit) => EntryKind::Submodule,
                _ => EntryKind::File,
            };
            TreeEntry {
                name: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                id: to_object_id(entry.id()),
                kind,
            }
        })
        .collect();
    Ok(TreeNode::new(id.clone(), entries))
}

pub fn read_blob(repo: &Repository, id: &ObjectId) -> GitOperationResult<Vec<u8>> {
    let blob = repo.find_blob(to_oid(id)?).map_err(missing(id))?;
    Ok(blob.content().to_vec())
}

/// Local branches sorted by name
pub fn read_local_branches(repo: &Repository) -> GitOperationResult<Vec<BranchRef>> {
    let mut branches = Vec::new();
    for branch_result in repo.branches(Some(BranchType::Local))? {
        let (branch, _branch_type) = branch_result?;
        let name = branch
            .name()?
            .ok_or_else(|| GitOperationError::InvalidUtf8("branch name".to_string()))?
            .to_string();
        let target = branch.get().resolve()?.target().ok_or_else(|| {
            GitOperationError::ObjectNotFound(format!("target of branch {}", name))
        })?;
        branches.push(BranchRef::new(name, to_object_id(target)));
    }
    branches.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(branches)
}

pub fn read_remote_names(repo: &Repository) -> GitOperationResult<Vec<String>> {
    let remotes = repo.remotes()?;
    Ok(remotes.iter().flatten().map(str::to_string).collect())
}

/// Refs the remote advertises, as `git ls-remote` would print them
pub fn list_remote_refs(repo: &Repository, name: &str) -> GitOperationResult<RemoteRef> {
    let mut remote = repo.find_remote(name)?;
    remote.connect(Direction::Fetch)?;
    let refs = remote
        .list()?
        .iter()
        .map(|head| ServerRef::new(head.name(), to_object_id(head.oid())))
        .collect();
    remote.disconnect()?;
    Ok(RemoteRef {
        name: name.to_string(),
        refs,
    })
}

/// Staged entries in path order.
///
/// The cached tree counts as valid when the index holds exactly what HEAD's
/// tree holds, i.e. nothing has been staged since the last commit.
pub fn read_index(repo: &Repository) -> GitOperationResult<IndexSnapshot> {
    let index = repo.index()?;
    let entries = index
        .iter()
        .map(|entry| {
            IndexEntry::new(
                String::from_utf8_lossy(&entry.path).into_owned(),
                to_object_id(entry.id),
            )
        })
        .collect();

    let head_tree = match repo.head().and_then(|head| head.peel_to_tree()) {
        Ok(tree) => tree,
        Err(_) => return Ok(IndexSnapshot::new(entries, false)),
    };
    let diff = repo.diff_tree_to_index(Some(&head_tree), Some(&index), None)?;
    let cache_valid = diff.deltas().next().is_none();
    Ok(IndexSnapshot::new(entries, cache_valid))
}

/// Resolve HEAD; `None` for an unborn branch or a missing HEAD
pub fn read_head(repo: &Repository) -> GitOperationResult<Option<HeadPointer>> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let target = to_object_id(head.peel_to_commit()?.id());

    if head.is_branch() {
        let name = String::from_utf8_lossy(head.shorthand_bytes()).into_owned();
        Ok(Some(HeadPointer::Branch { name, target }))
    } else {
        Ok(Some(HeadPointer::Detached { target }))
    }
}
