//! Dependency-tracked jobs on a shared worker pool.
//!
//! - [`JobSystem`] - rayon-backed pool with a batched flush point
//! - [`JobHandle`] - dependency edge and completion wait
//! - [`MeshLease`] - sequential write access to one deformable's buffers

mod handle;
mod lease;
mod system;

pub use handle::JobHandle;
pub use lease::MeshLease;
pub use system::JobSystem;
