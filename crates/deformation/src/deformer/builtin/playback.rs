use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{trace, warn};

use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;
use crate::point_cache::PointCacheFrames;

/// Replace positions with a looping point-cache animation.
///
/// A cache whose frame size doesn't match the mesh leaves positions at the
/// rest pose. The mismatch is warned about once per mesh vertex count.
#[derive(Debug)]
pub struct PointCachePlayer {
    pub frames: Arc<PointCacheFrames>,
    /// Playback rate multiplier
    pub speed: f32,
    /// Seconds added to scene time before sampling
    pub time_offset: f32,
    /// Vertex count last warned about, 0 if none
    mismatch_reported: AtomicUsize,
}

impl PointCachePlayer {
    pub fn new(frames: Arc<PointCacheFrames>) -> Self {
        Self {
            frames,
            speed: 1.0,
            time_offset: 0.0,
            mismatch_reported: AtomicUsize::new(0),
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_time_offset(mut self, time_offset: f32) -> Self {
        self.time_offset = time_offset;
        self
    }

    fn report_mismatch(&self, vertex_count: usize) {
        if self.mismatch_reported.swap(vertex_count, Ordering::Relaxed) == vertex_count {
            trace!("Point cache still mismatched for {} vertices", vertex_count);
            return;
        }
        warn!(
            "Point cache has {} points per frame but the mesh has {} vertices; skipping",
            self.frames.frame_size(),
            vertex_count
        );
    }
}

impl Clone for PointCachePlayer {
    fn clone(&self) -> Self {
        Self {
            frames: self.frames.clone(),
            speed: self.speed,
            time_offset: self.time_offset,
            mismatch_reported: AtomicUsize::new(0),
        }
    }
}

impl Default for PointCachePlayer {
    fn default() -> Self {
        Self::new(Arc::new(PointCacheFrames::empty()))
    }
}

impl Deformer for PointCachePlayer {
    fn name(&self) -> &str {
        "Point Cache"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::new(ChannelSet::empty(), ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        !self.frames.is_empty() && self.speed.is_finite() && self.time_offset.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        if self.frames.frame_size() != ctx.vertex_count() {
            self.report_mismatch(ctx.vertex_count());
            return dependency;
        }
        let frames = self.frames.clone();
        let time = ctx.clock.time * self.speed + self.time_offset;
        ctx.lease.schedule(self.name(), dependency, move |data| {
            frames.sample(time, data.positions_mut());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ManagedMeshData;
    use crate::deformer::FrameTime;
    use crate::deformer::builtin::test_support::{approx_eq, column, run_stage};
    use glam::Vec3;

    fn two_frames() -> Arc<PointCacheFrames> {
        let points = vec![Vec3::ZERO, Vec3::ZERO, Vec3::ONE, Vec3::ONE];
        Arc::new(PointCacheFrames::new(2, points, 0.0, 1.0).unwrap())
    }

    #[test]
    fn test_plays_at_scene_time() {
        let rest = ManagedMeshData::new(vec![Vec3::splat(9.0); 2], Vec::new());
        let clock = FrameTime {
            time: 0.5,
            ..Default::default()
        };
        let out = run_stage(&PointCachePlayer::new(two_frames()), &rest, clock);
        assert!(out.positions().iter().all(|p| approx_eq(*p, Vec3::splat(0.5))));
    }

    #[test]
    fn test_mismatched_cache_leaves_positions() {
        let rest = column(3);
        let out = run_stage(&PointCachePlayer::new(two_frames()), &rest, FrameTime::default());
        assert_eq!(out.positions(), rest.positions.as_slice());
    }

    #[test]
    fn test_mismatch_reported_per_vertex_count() {
        let player = PointCachePlayer::new(two_frames());
        run_stage(&player, &column(3), FrameTime::default());
        run_stage(&player, &column(3), FrameTime::default());
        assert_eq!(player.mismatch_reported.load(Ordering::Relaxed), 3);

        run_stage(&player, &column(5), FrameTime::default());
        assert_eq!(player.mismatch_reported.load(Ordering::Relaxed), 5);
        // A clone for another mesh reports its own mismatch.
        assert_eq!(player.clone().mismatch_reported.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_empty_cache_is_idle() {
        assert!(!PointCachePlayer::default().can_process());
    }
}
