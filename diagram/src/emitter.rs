//! Projection of repository objects onto Mermaid statements
//!
//! Each section reads what it needs from an [`ObjectStore`] and writes
//! statements straight to the output, one per line. Sections never buffer, so
//! when one fails the statements of earlier sections are already written.
//! Output order only depends on the store's answers, which makes two passes
//! over an unchanged repository byte-identical.

use crate::config::FeatureSet;
use crate::mermaid::{
    Node, Statement, HEAD_HIGHLIGHT, HEAD_ID, INDEX_HIGHLIGHT, INDEX_ID, REMOTE_HIGHLIGHT,
};
use crate::store::{ObjectStore, StoreError};
use crate::types::{content_preview, CommitNode, EntryKind, ObjectId, TreeNode};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type EmitResult<T> = Result<T, EmitError>;

/// Whether the remaining sections of a pass should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The repository turned out to be empty; the placeholder is written
    Stop,
}

pub struct GraphEmitter<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    features: &'a FeatureSet,
}

impl<'a, S: ObjectStore + ?Sized> GraphEmitter<'a, S> {
    pub fn new(store: &'a S, features: &'a FeatureSet) -> Self {
        Self { store, features }
    }

    /// Index section.
    ///
    /// Without `show_index` this only checks that HEAD resolves and stops the
    /// pass with the placeholder when it does not.
    pub fn emit_index<W: Write>(&self, out: &mut W) -> EmitResult<Flow> {
        if !self.features.show_index {
            return match self.store.head() {
                Ok(Some(_)) => Ok(Flow::Continue),
                Ok(None) => {
                    debug!("HEAD does not resolve, treating repository as empty");
                    emit_placeholder(out)?;
                    Ok(Flow::Stop)
                }
                Err(e) => {
                    emit_placeholder(out)?;
                    Err(e.into())
                }
            };
        }

        let index = match self.store.index() {
            Ok(index) => index,
            Err(e) => {
                emit_placeholder(out)?;
                return Err(e.into());
            }
        };

        let index_node = Statement::Node(Node::index());
        if index.is_empty() {
            return write_statement(out, &index_node).map(|_| Flow::Continue);
        }
        if index.only_ignore_file() {
            write_statement(out, &index_node)?;
        }
        if !index.cache_valid {
            write_statement(out, &Statement::style(INDEX_ID, INDEX_HIGHLIGHT))?;
        }

        if !self.features.show_blob {
            write_statement(out, &index_node)?;
            return Ok(Flow::Continue);
        }

        for entry in index.entries.iter().filter(|e| !e.is_ignore_file()) {
            let preview = self.preview(&entry.id)?;
            let blob = Node::blob(entry.id.short(), preview.as_deref());
            write_statement(
                out,
                &Statement::labeled_edge(Node::index(), entry.path.as_str(), blob),
            )?;
        }
        Ok(Flow::Continue)
    }

    pub fn emit_commits<W: Write>(&self, commits: &[CommitNode], out: &mut W) -> EmitResult<()> {
        debug!(count = commits.len(), "emitting commits");
        for commit in commits {
            self.emit_commit(commit, out)?;
        }
        Ok(())
    }

    /// One commit with, depending on the features, its tree, blobs and parents
    pub fn emit_commit<W: Write>(&self, commit: &CommitNode, out: &mut W) -> EmitResult<()> {
        let commit_node = Node::commit(commit.id.short());

        if self.features.show_tree {
            write_statement(
                out,
                &Statement::edge(commit_node.clone(), Node::tree(commit.tree.short())),
            )?;
            if self.features.show_blob {
                let tree = self.store.tree(&commit.tree)?;
                self.emit_tree_entries(&tree, out)?;
            }
        } else if self.features.show_blob {
            let tree = self.store.tree(&commit.tree)?;
            if self.emit_top_level_blobs(&commit_node, &tree, out)? == 0 {
                write_statement(out, &Statement::Node(commit_node.clone()))?;
            }
        } else {
            write_statement(out, &Statement::Node(commit_node.clone()))?;
        }

        if self.features.show_history {
            for parent in &commit.parents {
                write_statement(
                    out,
                    &Statement::history_edge(commit_node.clone(), Node::commit(parent.short())),
                )?;
            }
        }
        Ok(())
    }

    /// Recursive walk: files hang off their immediate parent tree, sub-trees
    /// off theirs. Trees are content addressed, so there are no cycles.
    fn emit_tree_entries<W: Write>(&self, tree: &TreeNode, out: &mut W) -> EmitResult<()> {
        let tree_short = tree.id.short();
        for entry in &tree.entries {
            match entry.kind {
                EntryKind::File => {
                    if entry.is_ignore_file() {
                        continue;
                    }
                    let preview = self.preview(&entry.id)?;
                    let blob = Node::blob(entry.id.short(), preview.as_deref());
                    write_statement(
                        out,
                        &Statement::labeled_edge(Node::bare(tree_short), entry.name.as_str(), blob),
                    )?;
                }
                EntryKind::Tree => {
                    let sub_tree = self.store.tree(&entry.id)?;
                    write_statement(
                        out,
                        &Statement::labeled_edge(
                            Node::tree(tree_short),
                            entry.name.as_str(),
                            Node::tree(sub_tree.id.short()),
                        ),
                    )?;
                    self.emit_tree_entries(&sub_tree, out)?;
                }
                EntryKind::Submodule => {
                    debug!(name = %entry.name, "skipping submodule entry");
                }
            }
        }
        Ok(())
    }

    /// Blob edges straight from the commit, top-level files only
    fn emit_top_level_blobs<W: Write>(
        &self,
        commit_node: &Node,
        tree: &TreeNode,
        out: &mut W,
    ) -> EmitResult<usize> {
        let mut emitted = 0;
        for file in tree.files().filter(|f| !f.is_ignore_file()) {
            let preview = self.preview(&file.id)?;
            let blob = Node::blob(file.id.short(), preview.as_deref());
            write_statement(
                out,
                &Statement::labeled_edge(commit_node.clone(), file.name.as_str(), blob),
            )?;
            emitted += 1;
        }
        Ok(emitted)
    }

    pub fn emit_branches<W: Write>(&self, out: &mut W) -> EmitResult<()> {
        if !self.features.show_branch {
            return Ok(());
        }
        for branch in self.store.branches()? {
            write_statement(
                out,
                &Statement::edge(
                    Node::reference(branch.name.as_str(), branch.name.as_str()),
                    Node::bare(branch.target.short()),
                ),
            )?;
        }
        Ok(())
    }

    /// One subgraph per remote holding its advertised refs.
    ///
    /// A remote whose refs cannot be listed still gets a closed, styled
    /// subgraph; the section then ends without failing the pass.
    pub fn emit_remotes<W: Write>(&self, out: &mut W) -> EmitResult<()> {
        if !self.features.show_remote {
            return Ok(());
        }
        for remote in self.store.remotes()? {
            write_statement(out, &Statement::SubgraphStart(remote.clone()))?;

            let advertised = match self.store.remote_refs(&remote) {
                Ok(advertised) => advertised,
                Err(e) => {
                    write_statement(out, &Statement::SubgraphEnd)?;
                    write_statement(out, &Statement::style(remote.as_str(), REMOTE_HIGHLIGHT))?;
                    warn!(remote = %remote, error = %e, "could not list remote refs");
                    return Ok(());
                }
            };

            let ref_nodes: Vec<(Node, &ObjectId)> = advertised
                .refs
                .iter()
                .filter(|r| !r.is_synthetic())
                .map(|r| {
                    let short = r.short_name();
                    (
                        Node::reference(format!("{}{}", remote, short), short),
                        &r.target,
                    )
                })
                .collect();

            for (node, _) in &ref_nodes {
                write_statement(out, &Statement::Node(node.clone()))?;
            }
            write_statement(out, &Statement::SubgraphEnd)?;
            write_statement(out, &Statement::style(remote.as_str(), REMOTE_HIGHLIGHT))?;

            for (node, target) in ref_nodes {
                write_statement(out, &Statement::edge(node, Node::commit(target.short())))?;
            }
        }
        Ok(())
    }

    pub fn emit_head<W: Write>(&self, out: &mut W) -> EmitResult<()> {
        if !self.features.show_head {
            return Ok(());
        }
        let Some(head) = self.store.head()? else {
            debug!("HEAD does not resolve, skipping head section");
            return Ok(());
        };

        write_statement(out, &Statement::style(HEAD_ID, HEAD_HIGHLIGHT))?;
        let target = match head.branch_name() {
            Some(branch) if self.features.show_branch => Node::bare(branch),
            _ => Node::bare(head.target().short()),
        };
        write_statement(out, &Statement::edge(Node::head(), target))
    }

    fn preview(&self, id: &ObjectId) -> EmitResult<Option<String>> {
        if !self.features.previews_content() {
            return Ok(None);
        }
        let content = self.store.blob_content(id)?;
        Ok(Some(content_preview(&content)))
    }
}

/// The `empty((empty))` node standing in for a missing or empty repository
pub fn emit_placeholder<W: Write>(out: &mut W) -> EmitResult<()> {
    write_statement(out, &Statement::Node(Node::placeholder()))
}

fn write_statement<W: Write>(out: &mut W, statement: &Statement) -> EmitResult<()> {
    writeln!(out, "{}", statement)?;
    Ok(())
}
