use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channels::{ChannelSet, StageChannels};
use crate::data::Bounds;
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;
use crate::normals::{self, NormalSettings};

/// Smooth normals from the current positions.
///
/// Place after every stage that moves positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecalculateNormals {
    pub settings: NormalSettings,
}

impl RecalculateNormals {
    pub fn new(smoothing_angle: f32) -> Self {
        Self {
            settings: NormalSettings {
                smoothing_angle,
                ..Default::default()
            },
        }
    }

    pub fn with_settings(settings: NormalSettings) -> Self {
        Self { settings }
    }
}

impl Deformer for RecalculateNormals {
    fn name(&self) -> &str {
        "Recalculate Normals"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::new(ChannelSet::POSITIONS | ChannelSet::INDICES, ChannelSet::NORMALS)
    }

    fn can_process(&self) -> bool {
        self.settings.smoothing_angle.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let settings = self.settings;
        ctx.lease.schedule(self.name(), dependency, move |data| {
            if let Err(e) = normals::recalculate(data, &settings) {
                warn!("Normal recalculation skipped: {}", e);
            }
        })
    }
}

/// Refit the bounds record to the current positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecalculateBounds;

impl Deformer for RecalculateBounds {
    fn name(&self) -> &str {
        "Recalculate Bounds"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::new(ChannelSet::POSITIONS, ChannelSet::BOUNDS)
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        ctx.lease.schedule(self.name(), dependency, |data| {
            let bounds = Bounds::from_points(data.positions());
            data.set_bounds(bounds);
        })
    }
}
