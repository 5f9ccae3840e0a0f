//! Task handles and the graph nodes behind them.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::system::JobSystem;
use crate::error::JobError;

pub(crate) type Work = Box<dyn FnOnce() + Send + 'static>;

/// One unit of work in the task graph.
pub(crate) struct JobNode {
    pub(crate) label: String,
    pub(crate) state: Mutex<NodeState>,
    pub(crate) finished: Condvar,
}

pub(crate) struct NodeState {
    pub(crate) work: Option<Work>,
    /// Unfinished dependencies, plus one registration guard while wiring.
    pub(crate) waiting_on: usize,
    pub(crate) dependents: Vec<Arc<JobNode>>,
    pub(crate) done: bool,
    /// Label of the first job in the upstream chain that panicked.
    pub(crate) failure: Option<String>,
}

impl JobNode {
    pub(crate) fn new(label: impl Into<String>, work: Work) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(NodeState {
                work: Some(work),
                waiting_on: 1,
                dependents: Vec::new(),
                done: false,
                failure: None,
            }),
            finished: Condvar::new(),
        }
    }
}

/// Opaque reference to scheduled, possibly still running work.
///
/// Usable as a dependency for later jobs or to block until the work and its
/// whole upstream chain have finished. Cloning a handle doesn't duplicate the
/// work.
#[derive(Clone, Default)]
pub struct JobHandle {
    node: Option<Arc<JobNode>>,
    system: Option<JobSystem>,
}

impl JobHandle {
    /// A handle that is already complete.
    pub fn completed() -> Self {
        Self::default()
    }

    pub(crate) fn new(node: Arc<JobNode>, system: JobSystem) -> Self {
        Self {
            node: Some(node),
            system: Some(system),
        }
    }

    pub(crate) fn node(&self) -> Option<&Arc<JobNode>> {
        self.node.as_ref()
    }

    /// Whether the work has finished (non-blocking).
    pub fn is_completed(&self) -> bool {
        self.node.as_ref().is_none_or(|node| node.state.lock().done)
    }

    /// Whether both handles refer to the same work.
    pub fn same_job(&self, other: &JobHandle) -> bool {
        match (&self.node, &other.node) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Debug label of the underlying job.
    pub fn label(&self) -> Option<&str> {
        self.node.as_ref().map(|node| node.label.as_str())
    }

    /// Block until the work and everything upstream has finished.
    ///
    /// Flushes the pending batch first so work that was only issued can't
    /// stall the wait. Reports a panic anywhere in the upstream chain.
    pub fn complete(&self) -> Result<(), JobError> {
        let Some(node) = &self.node else {
            return Ok(());
        };
        if let Some(system) = &self.system {
            system.flush();
        }

        let mut state = node.state.lock();
        while !state.done {
            node.finished.wait(&mut state);
        }
        match &state.failure {
            Some(label) => Err(JobError::Panicked {
                label: label.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("label", &self.label())
            .field("completed", &self.is_completed())
            .finish()
    }
}
