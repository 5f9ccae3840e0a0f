use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::map_positions;
use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;

/// Pull vertices toward a sphere around `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spherify {
    pub center: Vec3,
    pub radius: f32,
    /// Blend between the input (0) and the sphere (1)
    pub factor: f32,
}

impl Spherify {
    pub fn new(radius: f32, factor: f32) -> Self {
        Self {
            center: Vec3::ZERO,
            radius,
            factor,
        }
    }
}

impl Deformer for Spherify {
    fn name(&self) -> &str {
        "Spherify"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::read_write(ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.factor != 0.0 && self.factor.is_finite() && self.radius > 0.0 && self.radius.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let Self {
            center,
            radius,
            factor,
        } = *self;
        map_positions(ctx, self.name(), dependency, move |p| {
            // Vertices at the center have no direction and stay put.
            let on_sphere = center + (p - center).normalize_or_zero() * radius;
            if on_sphere == center { p } else { p.lerp(on_sphere, factor) }
        })
    }
}
