//! Mesh deformation core.
//!
//! Deformables own a rest pose, a render target and worker-visible buffers.
//! A [`DeformableScheduler`] drives them once per tick: it completes the
//! previous frame's job chains, commits their results, then issues and
//! flushes the next batch on a shared [`JobSystem`].
//!
//! ```ignore
//! let mut scheduler = DeformableScheduler::new(DeformConfig::from_env())?;
//! let chain = DeformerChain::new()
//!     .with(Twist::new(Axis::Y, 30.0))
//!     .with(RecalculateNormals::default())
//!     .with(RecalculateBounds);
//! let id = scheduler.register(scheduler.create("column", mesh).with_chain(chain));
//! loop {
//!     scheduler.tick(1.0 / 60.0);
//!     render(scheduler.get(id).unwrap().target());
//! }
//! ```

pub mod channels;
pub mod data;
pub mod deformable;
pub mod deformer;
pub mod error;
pub mod jobs;
pub mod normals;
pub mod point_cache;
pub mod scheduler;

pub use channels::{ChannelSet, StageChannels};
pub use data::{Bounds, ManagedMeshData, NativeMeshData};
pub use deform_config::{DeformConfig, UpdateMode};
pub use deformable::Deformable;
pub use deformer::{Axis, Deformer, DeformerChain, DeformerInfo, DeformerRegistry, FrameTime, StageContext};
pub use error::{FrameLayoutError, JobError, NormalsError, SyncError};
pub use jobs::{JobHandle, JobSystem, MeshLease};
pub use normals::NormalSettings;
pub use point_cache::PointCacheFrames;
pub use scheduler::{DeformableId, DeformableScheduler, TickReport};
