//! Mesh data in its two representations.
//!
//! - [`ManagedMeshData`] - plain arrays exchanged with the source asset and renderer
//! - [`NativeMeshData`] - fixed-capacity buffers the worker jobs operate on
//! - [`sync`] - channel-masked copies between them
//!
//! All cross-representation access goes through [`sync::copy`], so no buffer
//! is ever aliased between the two sides.

mod bounds;
mod managed;
mod native;
pub mod sync;

pub use bounds::Bounds;
pub use managed::ManagedMeshData;
pub use native::NativeMeshData;
pub use sync::{SyncTarget, copy};
