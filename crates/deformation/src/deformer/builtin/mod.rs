//! Built-in deformer stages.
//!
//! Position stages run their per-vertex math with rayon inside the job, so a
//! single large mesh still spreads across the pool.

mod inflate;
mod mask;
mod playback;
mod recalculate;
mod sine;
mod spherify;
mod transform;
mod twist;

pub use inflate::Inflate;
pub use mask::{ColorChannel, VertexColorMask};
pub use playback::PointCachePlayer;
pub use recalculate::{RecalculateBounds, RecalculateNormals};
pub use sine::Sine;
pub use spherify::Spherify;
pub use transform::{Offset, Scale};
pub use twist::Twist;

use glam::Vec3;
use rayon::prelude::*;

use super::StageContext;
use crate::jobs::JobHandle;

/// Schedule a job applying `f` to every position.
fn map_positions<F>(ctx: &mut StageContext<'_>, label: &str, dependency: JobHandle, f: F) -> JobHandle
where
    F: Fn(Vec3) -> Vec3 + Send + Sync + 'static,
{
    ctx.lease.schedule(label, dependency, move |data| {
        data.positions_mut().par_iter_mut().for_each(|p| *p = f(*p));
    })
}
