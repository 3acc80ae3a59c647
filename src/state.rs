//! Lifecycle state of a [`Client`](crate::Client).
//!
//! Accessors on the client run the batch lazily. `RunState` records whether
//! that has happened so a second accessor does not fetch everything again,
//! and so that a run which never finished (its future was dropped mid-way)
//! is reported instead of silently restarted.

use std::fmt;

/// Where a client is in its run lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    NotRun,
    Running,
    Done,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::NotRun => "not run",
            RunState::Running => "running",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}
