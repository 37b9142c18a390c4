//! Re-rendering on repository changes
//!
//! ```text
//! Idle -> Watching -> Rerendering -> Watching -> ... -> Stopped
//! ```
//!
//! The `notify` callback feeds two unbounded channels, one for events and one
//! for errors. A single task drains them; each re-render runs on the blocking
//! pool and is awaited before the next event is received, so passes never
//! overlap and the output document has one writer at a time.
//!
//! Only a new directory entry triggers a pass: new refs, new objects, a new
//! `HEAD`. Lock files, reflogs and a few scratch files git writes around every
//! command are ignored.

use crate::git::GitStore;
use crate::render::{render, RenderConfig, RenderError};
use diagram::{ObjectStore, StoreError};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

/// Path endings of files git creates that say nothing about the object graph
pub const TRANSIENT_SUFFIXES: [&str; 4] = [".lock", "logs", "COMMIT_EDITMSG", "ORIG_HEAD"];

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to create watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Cannot watch '{path}': {source}")]
    WatchSetup {
        path: String,
        #[source]
        source: notify::Error,
    },

    #[error("Repository error: {0}")]
    Store(#[from] StoreError),

    #[error("Re-render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Re-render task failed: {0}")]
    Task(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Watching,
    Rerendering,
    Stopped,
}

/// Directories to watch, non-recursively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTargets {
    /// Without these the monitor cannot start
    pub required: Vec<PathBuf>,
    /// One ref directory per remote; skipped when missing
    pub remotes: Vec<PathBuf>,
}

impl WatchTargets {
    pub fn new(git_dir: &Path, remotes: &[String]) -> Self {
        Self {
            required: vec![git_dir.join("refs").join("heads"), git_dir.to_path_buf()],
            remotes: remotes
                .iter()
                .map(|name| git_dir.join("refs").join("remotes").join(name))
                .collect(),
        }
    }
}

pub fn is_transient_path(path: &Path) -> bool {
    let path = path.to_string_lossy();
    TRANSIENT_SUFFIXES
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

/// The path of a newly appeared entry, if the event reports one.
///
/// Git publishes refs by renaming `<ref>.lock` into place, which backends
/// report as a rename rather than a creation; the destination counts as
/// created. One rename arrives as `From`, `To` and `Both`; only `To` counts.
pub fn created_path(event: &Event) -> Option<&Path> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.first().map(PathBuf::as_path)
        }
        _ => None,
    }
}

/// The path that warrants a re-render, if any
pub fn rerender_trigger(event: &Event) -> Option<&Path> {
    created_path(event).filter(|path| !is_transient_path(path))
}

fn transition(from: MonitorState, to: MonitorState) -> MonitorState {
    debug!(?from, ?to, "monitor state");
    to
}

/// Drain both channels until either closes.
///
/// `rerender` is awaited for every triggering event before the next one is
/// received. Channel errors are logged; an error from `rerender` ends the
/// loop and is returned.
pub async fn run_event_loop<F, Fut, E>(
    mut events: UnboundedReceiver<Event>,
    mut errors: UnboundedReceiver<notify::Error>,
    mut rerender: F,
) -> Result<MonitorState, E>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut state = transition(MonitorState::Idle, MonitorState::Watching);
    loop {
        tokio::select! {
            biased;
            event = events.recv() => {
                let Some(event) = event else { break };
                match rerender_trigger(&event) {
                    Some(path) => {
                        info!(path = %path.display(), "repository changed");
                        state = transition(state, MonitorState::Rerendering);
                        rerender(path.to_path_buf()).await?;
                        state = transition(state, MonitorState::Watching);
                    }
                    None => trace!(?event, "ignoring event"),
                }
            }
            error = errors.recv() => {
                let Some(error) = error else { break };
                warn!(error = %error, "watch error");
            }
        }
    }
    Ok(transition(state, MonitorState::Stopped))
}

/// A watcher attached to a repository, ready to run
pub struct ChangeMonitor {
    config: RenderConfig,
    watcher: RecommendedWatcher,
    events: UnboundedReceiver<Event>,
    errors: UnboundedReceiver<notify::Error>,
    targets: WatchTargets,
}

impl ChangeMonitor {
    /// Attach watches for `config.repo_dir`.
    ///
    /// Fails when the repository cannot be opened or one of its required
    /// directories cannot be watched. Remote ref directories that cannot be
    /// watched (e.g. never fetched) are skipped.
    pub fn start(config: RenderConfig) -> MonitorResult<Self> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => {
                    let _ = error_tx.send(e);
                }
            },
            NotifyConfig::default(),
        )?;

        let store = GitStore::open(&config.repo_dir).map_err(StoreError::from)?;
        let remotes = store.remotes()?;
        let targets = WatchTargets::new(store.git_dir(), &remotes);

        for path in &targets.required {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|source| MonitorError::WatchSetup {
                    path: path.display().to_string(),
                    source,
                })?;
        }
        for path in &targets.remotes {
            if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
                warn!(path = %path.display(), error = %e, "cannot watch remote refs");
            }
        }

        info!(repo = %store.path().display(), "watching repository");
        Ok(Self {
            config,
            watcher,
            events,
            errors,
            targets,
        })
    }

    pub fn targets(&self) -> &WatchTargets {
        &self.targets
    }

    /// Re-render on every qualifying change until the watch channels close.
    ///
    /// Ctrl-C drops the watcher, which closes the channels and stops the
    /// loop. A failed re-render stops the loop and is returned.
    pub async fn run(self) -> MonitorResult<MonitorState> {
        let Self {
            config,
            watcher,
            events,
            errors,
            ..
        } = self;

        let (done_tx, mut done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let result =
                run_event_loop(events, errors, move |_path| rerender(config.clone())).await;
            let _ = done_tx.send(result);
        });

        let signal = tokio::select! {
            result = &mut done_rx => return finished(result),
            signal = tokio::signal::ctrl_c() => signal,
        };
        match signal {
            Ok(()) => {
                info!("interrupted, stopping watcher");
                drop(watcher);
                finished(done_rx.await)
            }
            Err(e) => {
                // without ctrl-c only a failed re-render ends the loop
                warn!(error = %e, "cannot listen for ctrl-c");
                let result = done_rx.await;
                drop(watcher);
                finished(result)
            }
        }
    }
}

fn finished(
    result: Result<MonitorResult<MonitorState>, oneshot::error::RecvError>,
) -> MonitorResult<MonitorState> {
    result.map_err(|e| MonitorError::Task(e.to_string()))?
}

async fn rerender(config: RenderConfig) -> MonitorResult<()> {
    let outcome = tokio::task::spawn_blocking(move || render(&config))
        .await
        .map_err(|e| MonitorError::Task(e.to_string()))??;
    debug!(?outcome, "re-rendered");
    Ok(())
}
