use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;

/// Vertex color component used as a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    #[default]
    R,
    G,
    B,
    A,
}

impl ColorChannel {
    fn index(self) -> usize {
        match self {
            ColorChannel::R => 0,
            ColorChannel::G => 1,
            ColorChannel::B => 2,
            ColorChannel::A => 3,
        }
    }
}

/// Limit earlier stages' effect by a vertex color channel.
///
/// A weight of 1 keeps the deformed position, 0 restores the mask snapshot
/// (the rest pose). `factor` scales how much of the mask is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexColorMask {
    pub channel: ColorChannel,
    pub invert: bool,
    pub factor: f32,
}

impl VertexColorMask {
    pub fn new(channel: ColorChannel) -> Self {
        Self {
            channel,
            invert: false,
            factor: 1.0,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }
}

impl Default for VertexColorMask {
    fn default() -> Self {
        Self::new(ColorChannel::R)
    }
}

impl Deformer for VertexColorMask {
    fn name(&self) -> &str {
        "Vertex Color Mask"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::new(
            ChannelSet::POSITIONS | ChannelSet::COLORS | ChannelSet::MASK_POSITIONS,
            ChannelSet::POSITIONS,
        )
    }

    fn can_process(&self) -> bool {
        self.factor != 0.0 && self.factor.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let component = self.channel.index();
        let Self { invert, factor, .. } = *self;
        ctx.lease.schedule(self.name(), dependency, move |data| {
            let (mask, colors, positions) = data.mask_inputs_mut();
            positions
                .par_iter_mut()
                .zip(mask.par_iter().zip(colors.par_iter()))
                .for_each(|(p, (rest, color))| {
                    let weight = color[component].clamp(0.0, 1.0);
                    let weight = if invert { 1.0 - weight } else { weight };
                    let keep = 1.0 - factor * (1.0 - weight);
                    *p = rest.lerp(*p, keep);
                });
        })
    }
}
