//! Per-tick driver for every registered deformable.
//!
//! One [`tick`](DeformableScheduler::tick) runs:
//!
//! 1. complete - wait for every active deformable's outstanding chain
//! 2. commit and issue - copy finished results into each render target, then
//!    schedule the next chain (batched)
//! 3. flush - release the whole batch to the worker pool at once
//! 4. immediate - deformables in [`UpdateMode::Immediate`] are completed and
//!    committed before the tick returns
//! 5. drain - deformables registered since the last tick become active
//!
//! A chain whose jobs fail is never committed; the render target keeps the
//! last good frame and the next chain starts again from the rest pose.
//!
//! Deferred results otherwise lag the clock by one tick. Registration is the
//! exception: the first frame is computed synchronously, and the chain
//! pre-issued with the registration clock is committed on the second tick
//! after registering, so time-driven stages show the registration-time frame
//! until then. Immediate deformables commit within the tick.

use std::collections::{BTreeMap, BTreeSet};

use deform_config::{DeformConfig, UpdateMode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::ManagedMeshData;
use crate::deformable::Deformable;
use crate::deformer::FrameTime;
use crate::error::JobError;
use crate::jobs::JobSystem;

/// Identifier handed out by [`DeformableScheduler::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeformableId(u64);

impl std::fmt::Display for DeformableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Outstanding chains waited on
    pub completed: usize,
    /// Render targets updated
    pub committed: usize,
    /// Chains scheduled
    pub issued: usize,
    /// Completes, commits or issues that reported an error
    pub failed: usize,
}

/// Owns the active deformables and drives them once per tick.
pub struct DeformableScheduler {
    config: DeformConfig,
    jobs: JobSystem,
    active: BTreeMap<DeformableId, Deformable>,
    pending: BTreeMap<DeformableId, Deformable>,
    next_id: u64,
    enabled: bool,
    clock: FrameTime,
}

impl DeformableScheduler {
    /// Create a scheduler with its own worker pool.
    pub fn new(config: DeformConfig) -> Result<Self, JobError> {
        let jobs = JobSystem::new(config.resolved_worker_threads())?;
        Ok(Self::with_jobs(config, jobs))
    }

    /// Create a scheduler on a shared worker pool.
    pub fn with_jobs(config: DeformConfig, jobs: JobSystem) -> Self {
        info!(
            "DeformableScheduler initialized: {} workers, enabled={}",
            jobs.worker_count(),
            config.enabled
        );
        Self {
            enabled: config.enabled,
            config,
            jobs,
            active: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_id: 0,
            clock: FrameTime::default(),
        }
    }

    pub fn config(&self) -> &DeformConfig {
        &self.config
    }

    pub fn jobs(&self) -> &JobSystem {
        &self.jobs
    }

    /// Build a deformable with the configured default update mode.
    pub fn create(&self, name: impl Into<String>, source: ManagedMeshData) -> Deformable {
        Deformable::new(name, source).with_update_mode(self.config.default_update_mode)
    }

    /// Add a deformable.
    ///
    /// Its first frame is computed and committed before this returns, and
    /// (unless immediate) its next chain is pre-issued so the first tick that
    /// sees it has results to commit. It joins the active set at the end of
    /// the next tick.
    pub fn register(&mut self, mut deformable: Deformable) -> DeformableId {
        let id = DeformableId(self.next_id);
        self.next_id += 1;

        if deformable.can_update() {
            if let Err(e) = deformable.complete() {
                warn!("Deformable {} '{}' had a failed chain: {}", id, deformable.name(), e);
            }
            match deformable.issue(&self.jobs, self.clock) {
                Ok(_) => match deformable.complete() {
                    Ok(()) => {
                        if let Err(e) = deformable.commit() {
                            warn!("First commit of {} '{}' failed: {}", id, deformable.name(), e);
                        }
                    }
                    Err(e) => warn!("First pass of {} '{}' failed, keeping rest pose: {}", id, deformable.name(), e),
                },
                Err(e) => warn!("First pass of {} '{}' not issued: {}", id, deformable.name(), e),
            }
            if deformable.update_mode() == UpdateMode::Deferred {
                if let Err(e) = deformable.issue(&self.jobs, self.clock) {
                    warn!("Pre-issue of {} '{}' failed: {}", id, deformable.name(), e);
                }
            }
        }

        debug!("Registered deformable {} '{}'", id, deformable.name());
        self.pending.insert(id, deformable);
        id
    }

    /// Stop scheduling a deformable and hand it back.
    ///
    /// In-flight work isn't cancelled; dropping the returned deformable waits
    /// for it.
    pub fn unregister(&mut self, id: DeformableId) -> Option<Deformable> {
        let removed = self.active.remove(&id).or_else(|| self.pending.remove(&id));
        if let Some(deformable) = &removed {
            debug!("Unregistered deformable {} '{}'", id, deformable.name());
        }
        removed
    }

    pub fn get(&self, id: DeformableId) -> Option<&Deformable> {
        self.active.get(&id).or_else(|| self.pending.get(&id))
    }

    pub fn get_mut(&mut self, id: DeformableId) -> Option<&mut Deformable> {
        match self.active.get_mut(&id) {
            Some(deformable) => Some(deformable),
            None => self.pending.get_mut(&id),
        }
    }

    /// Active plus pending deformables.
    pub fn len(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deformables waiting to join the active set.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeformableId> + '_ {
        self.active.keys().chain(self.pending.keys()).copied()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Gate for [`tick`](Self::tick). Work already in flight keeps running.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!("DeformableScheduler enabled={}", enabled);
        }
        self.enabled = enabled;
    }

    /// Scene time in seconds.
    pub fn time(&self) -> f32 {
        self.clock.time
    }

    /// Number of ticks run while enabled.
    pub fn frame(&self) -> u64 {
        self.clock.frame
    }

    /// Advance one frame.
    pub fn tick(&mut self, delta_time: f32) -> TickReport {
        let mut report = TickReport::default();
        if !self.enabled {
            return report;
        }
        self.clock = FrameTime {
            time: self.clock.time + delta_time,
            delta_time,
            frame: self.clock.frame + 1,
        };

        let mut failed = BTreeSet::new();
        for (id, deformable) in self.active.iter_mut() {
            if !deformable.has_unreleased_chain() {
                continue;
            }
            report.completed += 1;
            if let Err(e) = deformable.complete() {
                warn!("Chain of {} '{}' failed: {}", id, deformable.name(), e);
                report.failed += 1;
                failed.insert(*id);
            }
        }

        for (id, deformable) in self.active.iter_mut() {
            if !deformable.can_update() {
                continue;
            }
            if deformable.update_mode() == UpdateMode::Deferred && !failed.contains(id) {
                match deformable.commit() {
                    Ok(()) => report.committed += 1,
                    Err(e) => {
                        warn!("Commit of {} '{}' skipped: {}", id, deformable.name(), e);
                        report.failed += 1;
                    }
                }
            }
            match deformable.issue(&self.jobs, self.clock) {
                Ok(_) => report.issued += 1,
                Err(e) => {
                    warn!("Chain of {} '{}' not issued: {}", id, deformable.name(), e);
                    report.failed += 1;
                }
            }
        }

        self.jobs.flush();

        for (id, deformable) in self.active.iter_mut() {
            if deformable.update_mode() != UpdateMode::Immediate || !deformable.has_unreleased_chain() {
                continue;
            }
            report.completed += 1;
            if let Err(e) = deformable.complete() {
                warn!("Chain of {} '{}' failed: {}", id, deformable.name(), e);
                report.failed += 1;
                continue;
            }
            match deformable.commit() {
                Ok(()) => report.committed += 1,
                Err(e) => {
                    warn!("Commit of {} '{}' skipped: {}", id, deformable.name(), e);
                    report.failed += 1;
                }
            }
        }

        self.active.append(&mut self.pending);
        report
    }

    /// Wait for every outstanding chain, active or pending.
    pub fn complete_all(&mut self) {
        for (id, deformable) in self.active.iter_mut().chain(self.pending.iter_mut()) {
            if let Err(e) = deformable.complete() {
                warn!("Chain of {} '{}' failed: {}", id, deformable.name(), e);
            }
        }
    }
}

impl std::fmt::Debug for DeformableScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeformableScheduler")
            .field("active", &self.active.len())
            .field("pending", &self.pending.len())
            .field("enabled", &self.enabled)
            .field("frame", &self.clock.frame)
            .finish()
    }
}
