//! Worker pool and dependency wiring.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::handle::{JobHandle, JobNode};
use crate::error::JobError;

struct Inner {
    pool: rayon::ThreadPool,
    /// Ready jobs held back until the next flush.
    batch: Mutex<Vec<Arc<JobNode>>>,
}

/// Shared worker pool executing a DAG of jobs.
///
/// Jobs whose dependencies are already satisfied are batched and only start
/// when [`flush`](Self::flush) is called (or a handle is completed), so a
/// whole tick's worth of chains can be issued first and then released to the
/// pool together. Jobs that become ready because an upstream job finished are
/// started immediately.
#[derive(Clone)]
pub struct JobSystem {
    inner: Arc<Inner>,
}

impl JobSystem {
    /// Create a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self, JobError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("deform-worker-{index}"))
            .build()
            .map_err(|e| JobError::PoolBuild(e.to_string()))?;
        debug!("JobSystem started with {} workers", pool.current_num_threads());
        Ok(Self {
            inner: Arc::new(Inner {
                pool,
                batch: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.inner.pool.current_num_threads()
    }

    /// Number of ready jobs waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.batch.lock().len()
    }

    /// Schedule `work` to run after `dependency` has finished.
    pub fn schedule<F>(&self, label: impl Into<String>, dependency: &JobHandle, work: F) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_after(label, std::slice::from_ref(dependency), Box::new(work))
    }

    /// A handle that completes once every input handle has completed.
    pub fn combine(&self, handles: &[JobHandle]) -> JobHandle {
        let pending: Vec<JobHandle> = handles.iter().filter(|h| !h.is_completed()).cloned().collect();
        match pending.len() {
            0 => JobHandle::completed(),
            1 => pending[0].clone(),
            _ => self.schedule_after("combine", &pending, Box::new(|| {})),
        }
    }

    /// Release every batched job to the worker pool.
    pub fn flush(&self) {
        let ready: Vec<Arc<JobNode>> = std::mem::take(&mut *self.inner.batch.lock());
        if ready.is_empty() {
            return;
        }
        trace!("JobSystem flush: {} jobs", ready.len());
        for node in ready {
            self.spawn(node);
        }
    }

    fn schedule_after(
        &self,
        label: impl Into<String>,
        dependencies: &[JobHandle],
        work: Box<dyn FnOnce() + Send + 'static>,
    ) -> JobHandle {
        let node = Arc::new(JobNode::new(label, work));

        for dependency in dependencies {
            let Some(upstream) = dependency.node() else {
                continue;
            };
            let mut upstream_state = upstream.state.lock();
            if upstream_state.done {
                if let Some(failure) = &upstream_state.failure {
                    node.state.lock().failure.get_or_insert_with(|| failure.clone());
                }
                continue;
            }
            node.state.lock().waiting_on += 1;
            upstream_state.dependents.push(node.clone());
        }

        // Drop the registration guard.
        let ready = {
            let mut state = node.state.lock();
            state.waiting_on -= 1;
            state.waiting_on == 0
        };
        if ready {
            self.inner.batch.lock().push(node.clone());
        }

        JobHandle::new(node, self.clone())
    }

    fn spawn(&self, node: Arc<JobNode>) {
        let system = self.clone();
        self.inner.pool.spawn(move || system.run(node));
    }

    fn run(&self, node: Arc<JobNode>) {
        let work = node.state.lock().work.take();
        let panicked = match work {
            Some(work) => catch_unwind(AssertUnwindSafe(work)).is_err(),
            None => false,
        };
        if panicked {
            error!("Job '{}' panicked", node.label);
        }

        let (dependents, failure) = {
            let mut state = node.state.lock();
            if panicked && state.failure.is_none() {
                state.failure = Some(node.label.clone());
            }
            state.done = true;
            node.finished.notify_all();
            (std::mem::take(&mut state.dependents), state.failure.clone())
        };

        for dependent in dependents {
            let ready = {
                let mut state = dependent.state.lock();
                if let Some(failure) = &failure {
                    state.failure.get_or_insert_with(|| failure.clone());
                }
                state.waiting_on -= 1;
                state.waiting_on == 0
            };
            if ready {
                self.spawn(dependent);
            }
        }
    }
}

impl std::fmt::Debug for JobSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystem")
            .field("workers", &self.worker_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}
