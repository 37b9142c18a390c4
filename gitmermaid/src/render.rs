//! One full rendering pass
//!
//! A pass truncates the output document, writes the Mermaid preamble and runs
//! the emitter sections in a fixed order: index, commits, branches, remotes,
//! HEAD. The closing fence is tied to the document's lifetime, so the file is
//! terminated on every path, including failures.
//!
//! A directory that is not a repository, or a repository without commits,
//! yields a diagram holding only the `empty` placeholder. Anything else that
//! goes wrong while a section is being emitted is returned as
//! [`RenderError::Section`].

use crate::git::GitStore;
use diagram::mermaid::{DIAGRAM_CLOSE, DIAGRAM_OPEN, GRAPH_DIRECTION};
use diagram::{emit_placeholder, EmitError, FeatureSet, Flow, GraphEmitter, ObjectStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Output file name used when none is given
pub const DEFAULT_OUTPUT: &str = "diagram.md";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot write diagram to '{path}': {source}")]
    Output {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write placeholder: {0}")]
    Placeholder(#[source] EmitError),

    #[error("{section} section failed: {source}")]
    Section {
        section: Section,
        #[source]
        source: EmitError,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Emitter sections, in the order a pass runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Index,
    Commits,
    Branches,
    Remotes,
    Head,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Index => "index",
            Section::Commits => "commit",
            Section::Branches => "branch",
            Section::Remotes => "remote",
            Section::Head => "HEAD",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// No commits, or HEAD unresolvable without `--index`
    EmptyRepository,
    NotARepository,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub repo_dir: PathBuf,
    pub output: PathBuf,
    pub features: FeatureSet,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            output: PathBuf::from(DEFAULT_OUTPUT),
            features: FeatureSet::default(),
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo_dir(mut self, repo_dir: impl Into<PathBuf>) -> Self {
        self.repo_dir = repo_dir.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output.as_os_str().is_empty() {
            return Err("Output path cannot be empty".to_string());
        }

        if self.repo_dir.as_os_str().is_empty() {
            return Err("Repository directory cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Output document framed by the Mermaid code fence.
///
/// The preamble is written on open. The closing fence is written by
/// [`finish`](Self::finish) or, failing that, when the document is dropped.
pub struct DiagramDocument<W: Write> {
    writer: Option<W>,
}

impl<W: Write> DiagramDocument<W> {
    pub fn open(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{}", DIAGRAM_OPEN)?;
        writeln!(writer, "{}", GRAPH_DIRECTION)?;
        Ok(Self {
            writer: Some(writer),
        })
    }

    /// Close the fence and hand back the writer
    pub fn finish(mut self) -> io::Result<W> {
        let mut writer = self.writer.take().ok_or_else(closed)?;
        close_fence(&mut writer)?;
        Ok(writer)
    }
}

impl<W: Write> Write for DiagramDocument<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.as_mut().ok_or_else(closed)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.as_mut().ok_or_else(closed)?.flush()
    }
}

impl<W: Write> Drop for DiagramDocument<W> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = close_fence(&mut writer) {
                warn!(error = %e, "failed to close diagram");
            }
        }
    }
}

fn close_fence<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", DIAGRAM_CLOSE)?;
    writer.flush()
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "diagram document already closed")
}

/// Run one pass and write the result to `config.output`
pub fn render(config: &RenderConfig) -> RenderResult<RenderOutcome> {
    config
        .validate()
        .map_err(|message| RenderError::InvalidConfig { message })?;

    let output_error = |source: io::Error| RenderError::Output {
        path: config.output.display().to_string(),
        source,
    };
    let file = File::create(&config.output).map_err(output_error)?;
    let mut document = DiagramDocument::open(BufWriter::new(file)).map_err(output_error)?;

    let outcome = render_repository(&config.repo_dir, &config.features, &mut document)?;
    document.finish().map_err(output_error)?;

    info!(
        repo = %config.repo_dir.display(),
        output = %config.output.display(),
        ?outcome,
        "rendered diagram"
    );
    Ok(outcome)
}

/// Open the repository at `repo_dir` and emit its statements into `out`
pub fn render_repository<W: Write>(
    repo_dir: &Path,
    features: &FeatureSet,
    out: &mut W,
) -> RenderResult<RenderOutcome> {
    let store = match GitStore::open(repo_dir) {
        Ok(store) => store,
        Err(e) => {
            debug!(error = %e, "not a repository");
            emit_placeholder(out).map_err(RenderError::Placeholder)?;
            return Ok(RenderOutcome::NotARepository);
        }
    };
    render_store(&store, features, out)
}

/// Emit every section for an already opened store
pub fn render_store<S, W>(store: &S, features: &FeatureSet, out: &mut W) -> RenderResult<RenderOutcome>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    let commits = match store.commits() {
        Ok(commits) => commits,
        Err(e) => {
            debug!(error = %e, store = store.store_name(), "cannot enumerate commits");
            emit_placeholder(out).map_err(RenderError::Placeholder)?;
            return Ok(RenderOutcome::EmptyRepository);
        }
    };

    let emitter = GraphEmitter::new(store, features);
    let in_section =
        |section: Section| move |source: EmitError| RenderError::Section { section, source };

    if emitter.emit_index(out).map_err(in_section(Section::Index))? == Flow::Stop {
        return Ok(RenderOutcome::EmptyRepository);
    }
    emitter
        .emit_commits(&commits, out)
        .map_err(in_section(Section::Commits))?;
    emitter
        .emit_branches(out)
        .map_err(in_section(Section::Branches))?;
    emitter
        .emit_remotes(out)
        .map_err(in_section(Section::Remotes))?;
    emitter.emit_head(out).map_err(in_section(Section::Head))?;

    Ok(RenderOutcome::Rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagram::{CommitNode, StoreError, StoreResult, TreeEntry, TreeNode};
    use diagram::{BranchRef, HeadPointer, IndexSnapshot, ObjectId, RemoteRef};
    use tempfile::TempDir;

    /// Store whose commits and trees are fixed and whose blobs are all unreadable
    struct BrokenBlobStore {
        enumerate_fails: bool,
    }

    impl ObjectStore for BrokenBlobStore {
        fn commits(&self) -> StoreResult<Vec<CommitNode>> {
            if self.enumerate_fails {
                return Err(StoreError::Backend {
                    message: "corrupt pack".to_string(),
                });
            }
            Ok(vec![CommitNode::new("c0ffee", "100000")])
        }

        fn tree(&self, id: &ObjectId) -> StoreResult<TreeNode> {
            Ok(TreeNode::new(id.clone(), vec![TreeEntry::file("a.txt", "aaaa01")]))
        }

        fn blob_content(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
            Err(StoreError::ObjectNotFound { id: id.to_string() })
        }

        fn branches(&self) -> StoreResult<Vec<BranchRef>> {
            Ok(vec![BranchRef::new("main", "c0ffee")])
        }

        fn remotes(&self) -> StoreResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn remote_refs(&self, remote: &str) -> StoreResult<RemoteRef> {
            Ok(RemoteRef {
                name: remote.to_string(),
                refs: Vec::new(),
            })
        }

        fn index(&self) -> StoreResult<IndexSnapshot> {
            Ok(IndexSnapshot::default())
        }

        fn head(&self) -> StoreResult<Option<HeadPointer>> {
            Ok(Some(HeadPointer::Detached {
                target: ObjectId::new("c0ffee"),
            }))
        }

        fn store_name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.repo_dir, PathBuf::from("."));
        assert_eq!(config.output, PathBuf::from("diagram.md"));
        assert_eq!(config.features, FeatureSet::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = RenderConfig::new().with_output("");
        assert!(config.validate().is_err());

        let config = RenderConfig::new().with_repo_dir("");
        assert!(config.validate().is_err());
        assert!(matches!(
            render(&config),
            Err(RenderError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = RenderConfig::new()
            .with_repo_dir("/tmp/repo")
            .with_features(FeatureSet::new().with_tree(true));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: RenderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_document_closes_on_finish() {
        let mut document = DiagramDocument::open(Vec::new()).unwrap();
        writeln!(document, "a-->b").unwrap();
        let bytes = document.finish().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "```mermaid\ngraph LR\na-->b\n```\n"
        );
    }

    #[test]
    fn test_document_closes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagram.md");
        {
            let file = File::create(&path).unwrap();
            let mut document = DiagramDocument::open(BufWriter::new(file)).unwrap();
            writeln!(document, "a-->b").unwrap();
        }
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "```mermaid\ngraph LR\na-->b\n```\n");
    }

    #[test]
    fn test_not_a_repository_is_placeholder() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("diagram.md");
        let config = RenderConfig::new()
            .with_repo_dir(dir.path().join("missing"))
            .with_output(&output)
            .with_features(FeatureSet::all());

        let outcome = render(&config).unwrap();
        assert_eq!(outcome, RenderOutcome::NotARepository);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "```mermaid\ngraph LR\nempty((empty))\n```\n"
        );
    }

    #[test]
    fn test_enumeration_failure_is_placeholder() {
        let store = BrokenBlobStore {
            enumerate_fails: true,
        };
        let mut out = Vec::new();
        let outcome = render_store(&store, &FeatureSet::all(), &mut out).unwrap();
        assert_eq!(outcome, RenderOutcome::EmptyRepository);
        assert_eq!(String::from_utf8(out).unwrap(), "empty((empty))\n");
    }

    #[test]
    fn test_section_failure_keeps_earlier_sections() {
        let store = BrokenBlobStore {
            enumerate_fails: false,
        };
        let features = FeatureSet::new()
            .with_index(true)
            .with_blob(true)
            .with_content(true)
            .with_branch(true);
        let mut out = Vec::new();
        let err = render_store(&store, &features, &mut out).unwrap_err();

        match err {
            RenderError::Section { section, .. } => assert_eq!(section, Section::Commits),
            other => panic!("Unexpected error: {}", other),
        }
        // the index came first and stays; branches were never reached
        assert_eq!(String::from_utf8(out).unwrap(), "Index[(index)]\n");
    }

    #[test]
    fn test_failed_pass_still_closes_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagram.md");
        let store = BrokenBlobStore {
            enumerate_fails: false,
        };
        let features = FeatureSet::new().with_blob(true).with_content(true);

        let result = {
            let file = File::create(&path).unwrap();
            let mut document = DiagramDocument::open(BufWriter::new(file)).unwrap();
            render_store(&store, &features, &mut document)
        };
        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "```mermaid\ngraph LR\n```\n"
        );
    }

    #[test]
    fn test_section_display() {
        let err = RenderError::Section {
            section: Section::Commits,
            source: EmitError::Store(StoreError::ObjectNotFound {
                id: "abcd".to_string(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "commit section failed: Store error: Object not found: abcd"
        );
    }
}
