//! Write capability over one deformable's native buffers.

use std::sync::Arc;

use parking_lot::Mutex;

use super::handle::JobHandle;
use super::system::JobSystem;
use crate::data::NativeMeshData;

/// Exclusive write grant for one chain's worth of jobs.
///
/// A lease is only handed out by a deformable that has no outstanding work,
/// and every job scheduled through it is chained behind the previous one, so
/// two jobs holding write access to the same buffers are never outstanding at
/// the same time.
pub struct MeshLease {
    jobs: JobSystem,
    data: Arc<Mutex<NativeMeshData>>,
    tail: JobHandle,
    vertex_count: usize,
    triangle_count: usize,
}

impl MeshLease {
    pub(crate) fn new(jobs: JobSystem, data: Arc<Mutex<NativeMeshData>>) -> Self {
        let (vertex_count, triangle_count) = {
            let data = data.lock();
            (data.vertex_count(), data.triangle_count())
        };
        Self {
            jobs,
            data,
            tail: JobHandle::completed(),
            vertex_count,
            triangle_count,
        }
    }

    pub fn jobs(&self) -> &JobSystem {
        &self.jobs
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Handle of the last job scheduled through this lease.
    pub fn tail(&self) -> JobHandle {
        self.tail.clone()
    }

    /// Schedule `work` against the leased buffers after `dependency`.
    ///
    /// If `dependency` isn't this lease's latest job, the new job also waits
    /// for it, keeping writes to the buffers strictly sequential.
    pub fn schedule<F>(&mut self, label: impl Into<String>, dependency: JobHandle, work: F) -> JobHandle
    where
        F: FnOnce(&mut NativeMeshData) + Send + 'static,
    {
        let dependency = if dependency.same_job(&self.tail) || self.tail.is_completed() {
            dependency
        } else {
            self.jobs.combine(&[dependency, self.tail.clone()])
        };

        let data = self.data.clone();
        let handle = self.jobs.schedule(label, &dependency, move || {
            let mut data = data.lock();
            work(&mut data);
        });
        self.tail = handle.clone();
        handle
    }
}

impl std::fmt::Debug for MeshLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshLease")
            .field("vertex_count", &self.vertex_count)
            .field("tail", &self.tail)
            .finish()
    }
}
