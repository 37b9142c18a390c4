pub mod git;
pub mod monitor;
pub mod render;

pub use git::{GitOperationError, GitOperationResult, GitStore};
pub use monitor::{
    run_event_loop, ChangeMonitor, MonitorError, MonitorResult, MonitorState, WatchTargets,
};
pub use render::{
    render, render_repository, render_store, DiagramDocument, RenderConfig, RenderError,
    RenderOutcome, RenderResult, Section, DEFAULT_OUTPUT,
};
