use clap::Parser;
use diagram::FeatureSet;
use gitmermaid::{render, ChangeMonitor, RenderConfig, RenderOutcome, DEFAULT_OUTPUT};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gitmermaid")]
#[command(about = "Draw a git repository's object graph as a Mermaid flowchart")]
struct Cli {
    /// Repository to draw
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// Document to (over)write
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
    /// Show commit trees and subtrees
    #[arg(long)]
    tree: bool,
    /// Show files
    #[arg(long)]
    blob: bool,
    /// Show local branches
    #[arg(long)]
    branch: bool,
    /// Show where HEAD points
    #[arg(long)]
    head: bool,
    /// Show parent links between commits
    #[arg(long)]
    history: bool,
    /// Preview file contents in blob nodes
    #[arg(long)]
    content: bool,
    /// Show the staging area
    #[arg(long)]
    index: bool,
    /// Show refs advertised by each remote
    #[arg(long)]
    remote: bool,
    /// Keep running and redraw on repository changes
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn features(&self) -> FeatureSet {
        FeatureSet::new()
            .with_tree(self.tree)
            .with_blob(self.blob)
            .with_branch(self.branch)
            .with_head(self.head)
            .with_history(self.history)
            .with_content(self.content)
            .with_index(self.index)
            .with_remote(self.remote)
    }

    fn render_config(&self) -> RenderConfig {
        RenderConfig::new()
            .with_repo_dir(&self.dir)
            .with_output(&self.output)
            .with_features(self.features())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.render_config();

    match render(&config) {
        Ok(RenderOutcome::NotARepository) => println!("no git repository"),
        Ok(outcome) => info!(?outcome, "initial render"),
        Err(e) => {
            error!("Render failed: {}", e);
            return Err(e.into());
        }
    }

    if !cli.watch {
        return Ok(());
    }

    let monitor = match ChangeMonitor::start(config) {
        Ok(monitor) => monitor,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    println!("watching..{}", cli.dir.display());

    let state = monitor.run().await.map_err(|e| {
        error!("Watch stopped: {}", e);
        e
    })?;
    info!(?state, "watcher finished");

    Ok(())
}
