use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::map_positions;
use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Axis, Deformer, StageContext};
use crate::jobs::JobHandle;

/// Travelling sine wave.
///
/// Vertices move along `axis` by `amplitude * sin(TAU * (frequency * d + speed * t))`
/// where `d` is the coordinate along `along` and `t` is scene time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sine {
    /// Displacement direction
    pub axis: Axis,
    /// Direction the wave travels along
    pub along: Axis,
    pub amplitude: f32,
    /// Waves per unit length
    pub frequency: f32,
    /// Waves per second
    pub speed: f32,
}

impl Sine {
    pub fn new(axis: Axis, amplitude: f32, frequency: f32) -> Self {
        Self {
            axis,
            along: axis.perpendicular().0,
            amplitude,
            frequency,
            speed: 0.0,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

impl Deformer for Sine {
    fn name(&self) -> &str {
        "Sine"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::read_write(ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.amplitude != 0.0
            && self.amplitude.is_finite()
            && self.frequency.is_finite()
            && self.speed.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let axis = self.axis.vector();
        let along = self.along.vector();
        let Self {
            amplitude,
            frequency,
            speed,
            ..
        } = *self;
        let phase = speed * ctx.clock.time;
        map_positions(ctx, self.name(), dependency, move |p| {
            p + axis * amplitude * (TAU * (frequency * p.dot(along) + phase)).sin()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deformer::FrameTime;
    use crate::deformer::builtin::test_support::{approx_eq, run_stage};
    use crate::data::ManagedMeshData;
    use glam::Vec3;

    fn row() -> ManagedMeshData {
        // x = 0, 0.25, 0.5, 0.75
        let positions = (0..4).map(|i| Vec3::new(i as f32 * 0.25, 0.0, 0.0)).collect();
        ManagedMeshData::new(positions, Vec::new())
    }

    #[test]
    fn test_static_wave() {
        let stage = Sine::new(Axis::Y, 2.0, 1.0);
        assert_eq!(stage.along, Axis::Z);
        let stage = Sine { along: Axis::X, ..stage };

        let out = run_stage(&stage, &row(), FrameTime::default());
        let heights: Vec<f32> = out.positions().iter().map(|p| p.y).collect();
        let expected = [0.0, 2.0, 0.0, -2.0];
        for (h, e) in heights.iter().zip(expected) {
            assert!((h - e).abs() < 1e-4, "{heights:?}");
        }
    }

    #[test]
    fn test_wave_travels_with_time() {
        let stage = Sine {
            along: Axis::X,
            ..Sine::new(Axis::Y, 1.0, 1.0).with_speed(1.0)
        };
        let clock = FrameTime {
            time: 0.25,
            ..Default::default()
        };
        let out = run_stage(&stage, &row(), clock);
        // Quarter period later the crest sits at x = 0.
        assert!(approx_eq(out.positions()[0], Vec3::new(0.0, 1.0, 0.0)));
    }
}
