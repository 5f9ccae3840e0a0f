use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Deformer, StageContext};
use crate::jobs::JobHandle;

/// Push vertices along their normals.
///
/// Uses whatever normals are in the buffers when the job runs: the rest pose
/// normals unless an earlier stage recalculated them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inflate {
    /// Distance along the normal
    pub amount: f32,
}

impl Inflate {
    pub fn new(amount: f32) -> Self {
        Self { amount }
    }
}

impl Deformer for Inflate {
    fn name(&self) -> &str {
        "Inflate"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::new(ChannelSet::POSITIONS | ChannelSet::NORMALS, ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.amount != 0.0 && self.amount.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let amount = self.amount;
        ctx.lease.schedule(self.name(), dependency, move |data| {
            let (normals, positions) = data.displacement_inputs_mut();
            positions
                .par_iter_mut()
                .zip(normals.par_iter())
                .for_each(|(p, n)| *p += n.normalize_or_zero() * amount);
        })
    }
}
