//! File formats at the edge of the deformation core.
//!
//! - [`pc2`] - binary point-cache animation import and export
//! - [`obj`] - textual mesh export of committed render targets

pub mod error;
pub mod obj;
pub mod pc2;

pub use error::{ObjError, PointCacheError};
pub use obj::{export_obj, write_obj};
pub use pc2::{Pc2Header, import_point_cache, parse_point_cache, read_point_cache, write_point_cache};
