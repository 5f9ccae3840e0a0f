//! Frame-sampled vertex animation.

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::FrameLayoutError;

/// Flat point buffer holding `frame_count` frames of `frame_size` points.
///
/// Point `i` of frame `f` lives at `f * frame_size + i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCacheFrames {
    points: Vec<Vec3>,
    frame_size: usize,
    frame_count: usize,
    /// Scene frame the first cached frame plays at
    pub start_frame: f32,
    /// Frames per second
    pub frame_rate: f32,
}

impl PointCacheFrames {
    pub fn new(
        frame_size: usize,
        points: Vec<Vec3>,
        start_frame: f32,
        frame_rate: f32,
    ) -> Result<Self, FrameLayoutError> {
        if frame_size == 0 {
            if !points.is_empty() {
                return Err(FrameLayoutError::ZeroFrameSize);
            }
            return Ok(Self {
                start_frame,
                frame_rate,
                ..Default::default()
            });
        }
        if points.len() % frame_size != 0 {
            return Err(FrameLayoutError::PartialFrame {
                points: points.len(),
                frame_size,
            });
        }
        Ok(Self {
            frame_count: points.len() / frame_size,
            points,
            frame_size,
            start_frame,
            frame_rate,
        })
    }

    /// Placeholder with no frames.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// The whole flat buffer.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn frame(&self, index: usize) -> Option<&[Vec3]> {
        if index >= self.frame_count {
            return None;
        }
        let start = index * self.frame_size;
        Some(&self.points[start..start + self.frame_size])
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f32 {
        if self.frame_rate > 0.0 {
            self.frame_count as f32 / self.frame_rate
        } else {
            0.0
        }
    }

    /// Fractional cache frame shown at `time`, wrapped into the cache.
    pub fn frame_at(&self, time: f32) -> f32 {
        if self.is_empty() || !(self.frame_rate > 0.0) || !time.is_finite() {
            return 0.0;
        }
        (time * self.frame_rate - self.start_frame).rem_euclid(self.frame_count as f32)
    }

    /// Write the interpolated frame at `time` into `out`.
    ///
    /// Playback loops, blending the last frame back into the first. Returns
    /// false without touching `out` if the cache is empty or `out` doesn't
    /// hold exactly one frame.
    pub fn sample(&self, time: f32, out: &mut [Vec3]) -> bool {
        if self.is_empty() || out.len() != self.frame_size {
            return false;
        }
        let position = self.frame_at(time);
        let base = position.floor();
        let t = position - base;
        let current = base as usize % self.frame_count;
        let next = (current + 1) % self.frame_count;

        let (Some(a), Some(b)) = (self.frame(current), self.frame(next)) else {
            return false;
        };
        out.par_iter_mut()
            .zip(a.par_iter().zip(b.par_iter()))
            .for_each(|(o, (a, b))| *o = a.lerp(*b, t));
        true
    }
}
