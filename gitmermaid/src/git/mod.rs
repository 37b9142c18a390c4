//! Git object store adapter
//!
//! Answers the diagram's read-only queries from an on-disk repository using
//! git2-rs.
//!
//! ```no_run
//! use diagram::ObjectStore;
//! use gitmermaid::git::GitStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = GitStore::open(".")?;
//! for commit in store.commits()? {
//!     println!("{} -> tree {}", commit.id.short(), commit.tree.short());
//! }
//! if let Some(head) = store.head()? {
//!     println!("HEAD: {}", head.target().short());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All operations are **read-only**. Listing a remote's refs connects to it,
//! but nothing is fetched or written.

pub mod operations;

pub use operations::*;
