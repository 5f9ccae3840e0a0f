use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::map_positions;
use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;

/// Translate every vertex by a constant offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub offset: Vec3,
}

impl Offset {
    pub fn new(offset: Vec3) -> Self {
        Self { offset }
    }
}

impl Deformer for Offset {
    fn name(&self) -> &str {
        "Offset"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::read_write(ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.offset != Vec3::ZERO && self.offset.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let offset = self.offset;
        map_positions(ctx, self.name(), dependency, move |p| p + offset)
    }
}

/// Scale vertices about a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub factor: Vec3,
    pub pivot: Vec3,
}

impl Scale {
    pub fn new(factor: Vec3, pivot: Vec3) -> Self {
        Self { factor, pivot }
    }

    pub fn uniform(factor: f32) -> Self {
        Self::new(Vec3::splat(factor), Vec3::ZERO)
    }
}

impl Deformer for Scale {
    fn name(&self) -> &str {
        "Scale"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::read_write(ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.factor != Vec3::ONE && self.factor.is_finite() && self.pivot.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let Self { factor, pivot } = *self;
        map_positions(ctx, self.name(), dependency, move |p| pivot + (p - pivot) * factor)
    }
}
