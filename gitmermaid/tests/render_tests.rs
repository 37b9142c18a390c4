use diagram::FeatureSet;
use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
use gitmermaid::{render, RenderConfig, RenderOutcome};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PREAMBLE: &str = "```mermaid\ngraph LR\n";
const CLOSE: &str = "```\n";

struct Fixture {
    repo_dir: TempDir,
    out_dir: TempDir,
    repo: Repository,
}

impl Fixture {
    fn new() -> Self {
        let repo_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(repo_dir.path(), &opts).unwrap();
        Self {
            repo_dir,
            out_dir,
            repo,
        }
    }

    fn commit(&self, files: &[(&str, &str)], message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        for (path, content) in files {
            let full = self.repo_dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();

        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<Commit> = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    fn render(&self, features: FeatureSet) -> (RenderOutcome, String) {
        let output = self.out_dir.path().join("diagram.md");
        let config = RenderConfig::new()
            .with_repo_dir(self.repo_dir.path())
            .with_output(&output)
            .with_features(features);
        let outcome = render(&config).unwrap();
        (outcome, fs::read_to_string(&output).unwrap())
    }

    fn tree_of(&self, commit: Oid) -> Oid {
        self.repo.find_commit(commit).unwrap().tree_id()
    }

    fn entry_id(&self, tree: Oid, name: &str) -> Oid {
        self.repo
            .find_tree(tree)
            .unwrap()
            .get_name(name)
            .unwrap()
            .id()
    }
}

fn short(oid: Oid) -> String {
    oid.to_string()[..4].to_string()
}

fn document(statements: &[String]) -> String {
    let mut doc = PREAMBLE.to_string();
    for statement in statements {
        doc.push_str(statement);
        doc.push('\n');
    }
    doc.push_str(CLOSE);
    doc
}

#[test]
fn test_empty_repository_is_single_placeholder() {
    let fixture = Fixture::new();
    let features = FeatureSet::all().with_index(false);

    let (outcome, written) = fixture.render(features);
    assert_eq!(outcome, RenderOutcome::EmptyRepository);
    assert_eq!(written, document(&["empty((empty))".to_string()]));
}

#[test]
fn test_tree_blob_content_scenario() {
    let fixture = Fixture::new();
    let commit = fixture.commit(&[("a.txt", "hello\nworld")], "first");
    let tree = fixture.tree_of(commit);
    let blob = fixture.entry_id(tree, "a.txt");

    let features = FeatureSet::new()
        .with_tree(true)
        .with_blob(true)
        .with_content(true);
    let (outcome, written) = fixture.render(features);

    let (c, t, b) = (short(commit), short(tree), short(blob));
    assert_eq!(outcome, RenderOutcome::Rendered);
    assert_eq!(
        written,
        document(&[
            format!("{c}((({c})))-->{t}{{{t}}}"),
            format!("{t}--a.txt-->{b}[{b} hello]"),
        ])
    );
}

#[test]
fn test_code_preview_is_quoted() {
    let fixture = Fixture::new();
    let commit = fixture.commit(&[("main.rs", "fn main() {}\n")], "first");
    let blob = fixture.entry_id(fixture.tree_of(commit), "main.rs");

    let features = FeatureSet::new().with_blob(true).with_content(true);
    let (_, written) = fixture.render(features);

    let (c, b) = (short(commit), short(blob));
    assert_eq!(
        written,
        document(&[format!("{c}((({c})))--main.rs-->{b}[\"{b} fn main() \"]")])
    );
}

#[test]
fn test_blob_only_hangs_files_off_commit() {
    let fixture = Fixture::new();
    let commit = fixture.commit(&[("a.txt", "hello"), ("dir/b.txt", "nested")], "first");
    let tree = fixture.tree_of(commit);
    let blob = fixture.entry_id(tree, "a.txt");

    let (_, written) = fixture.render(FeatureSet::new().with_blob(true));

    let (c, b) = (short(commit), short(blob));
    assert_eq!(written, document(&[format!("{c}((({c})))--a.txt-->{b}[{b}]")]));
}

#[test]
fn test_nested_files_hang_off_parent_tree() {
    let fixture = Fixture::new();
    let commit = fixture.commit(
        &[("a.txt", "top"), ("dir/sub/b.txt", "deep")],
        "nested",
    );
    let root = fixture.tree_of(commit);
    let dir = fixture.entry_id(root, "dir");
    let sub = fixture.entry_id(dir, "sub");
    let b = fixture.entry_id(sub, "b.txt");
    let a = fixture.entry_id(root, "a.txt");

    let (_, written) = fixture.render(FeatureSet::new().with_tree(true).with_blob(true));

    let (c, r, d, s, a, b) = (
        short(commit),
        short(root),
        short(dir),
        short(sub),
        short(a),
        short(b),
    );
    assert_eq!(
        written,
        document(&[
            format!("{c}((({c})))-->{r}{{{r}}}"),
            format!("{r}--a.txt-->{a}[{a}]"),
            format!("{r}{{{r}}}--dir-->{d}{{{d}}}"),
            format!("{d}{{{d}}}--sub-->{s}{{{s}}}"),
            format!("{s}--b.txt-->{b}[{b}]"),
        ])
    );

    let edges_into_b = written
        .lines()
        .filter(|line| line.ends_with(&format!("-->{b}[{b}]")))
        .count();
    assert_eq!(edges_into_b, 1);
}

#[test]
fn test_branches_and_head_scenario() {
    let fixture = Fixture::new();
    let commit = fixture.commit(&[("a.txt", "hello")], "first");
    let target = fixture.repo.find_commit(commit).unwrap();
    fixture.repo.branch("dev", &target, false).unwrap();

    let features = FeatureSet::new().with_branch(true).with_head(true);
    let (_, written) = fixture.render(features);

    let c = short(commit);
    assert_eq!(
        written,
        document(&[
            format!("{c}((({c})))"),
            format!("dev[[dev]]-->{c}"),
            format!("main[[main]]-->{c}"),
            "style HEAD fill:#266e38,stroke:#333,color:#ffffff".to_string(),
            "HEAD{{HEAD}}-->main".to_string(),
        ])
    );
}

#[test]
fn test_history_edges_follow_parents() {
    let fixture = Fixture::new();
    let first = fixture.commit(&[("a.txt", "one")], "first");
    let second = fixture.commit(&[("a.txt", "two")], "second");

    let (_, written) = fixture.render(FeatureSet::new().with_history(true));

    let (p, c) = (short(first), short(second));
    assert!(written.contains(&format!("{c}((({c})))-.->{p}(((")));
    assert!(!written.contains(&format!("{p}((({p})))-.->")));
}

#[test]
fn test_gitignore_never_drawn() {
    let fixture = Fixture::new();
    fixture.commit(&[(".gitignore", "target\n"), ("a.txt", "hello")], "first");

    let features = FeatureSet::new()
        .with_tree(true)
        .with_blob(true)
        .with_index(true);
    let (_, written) = fixture.render(features);

    assert!(written.contains("--a.txt-->"));
    assert!(!written.contains(".gitignore"));
}

#[test]
fn test_staged_changes_mark_index() {
    let fixture = Fixture::new();
    fixture.commit(&[("a.txt", "hello")], "first");

    let mut index = fixture.repo.index().unwrap();
    fs::write(fixture.repo_dir.path().join("b.txt"), "staged").unwrap();
    index.add_path(Path::new("b.txt")).unwrap();
    index.write().unwrap();

    let features = FeatureSet::new().with_index(true).with_blob(true);
    let (_, written) = fixture.render(features);

    assert!(written.contains("style Index fill:#e3f542,stroke:#333,color:#000000\n"));
    assert!(written.contains("Index[(index)]--a.txt-->"));
    assert!(written.contains("Index[(index)]--b.txt-->"));
}

#[test]
fn test_repeated_passes_are_identical() {
    let fixture = Fixture::new();
    fixture.commit(&[("a.txt", "hello"), ("dir/b.txt", "nested")], "first");
    fixture.commit(&[("c.txt", "more")], "second");
    let head = fixture.repo.head().unwrap().peel_to_commit().unwrap();
    fixture.repo.branch("dev", &head, false).unwrap();

    let features = FeatureSet::all().with_remote(false);
    let (_, first) = fixture.render(features);
    let (_, second) = fixture.render(features);
    assert_eq!(first, second);
}

#[test]
fn test_missing_directory_is_placeholder() {
    let out_dir = TempDir::new().unwrap();
    let output = out_dir.path().join("diagram.md");
    let config = RenderConfig::new()
        .with_repo_dir(out_dir.path().join("nowhere"))
        .with_output(&output)
        .with_features(FeatureSet::all());

    assert_eq!(render(&config).unwrap(), RenderOutcome::NotARepository);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        document(&["empty((empty))".to_string()])
    );
}
