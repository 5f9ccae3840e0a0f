use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::map_positions;
use crate::channels::{ChannelSet, StageChannels};
use crate::deformer::{Axis, Deformer, StageContext};
use crate::jobs::JobHandle;

/// Rotate vertices about an axis by an angle proportional to their height
/// along it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub axis: Axis,
    /// Degrees of rotation per unit of distance along the axis
    pub angle_per_unit: f32,
    /// Height at which the rotation is zero
    pub origin: Vec3,
}

impl Twist {
    pub fn new(axis: Axis, angle_per_unit: f32) -> Self {
        Self {
            axis,
            angle_per_unit,
            origin: Vec3::ZERO,
        }
    }
}

impl Deformer for Twist {
    fn name(&self) -> &str {
        "Twist"
    }

    fn channels(&self) -> StageChannels {
        StageChannels::read_write(ChannelSet::POSITIONS)
    }

    fn can_process(&self) -> bool {
        self.angle_per_unit != 0.0 && self.angle_per_unit.is_finite()
    }

    fn schedule(&self, ctx: &mut StageContext<'_>, dependency: JobHandle) -> JobHandle {
        let axis = self.axis.vector();
        let origin = self.origin;
        let rate = self.angle_per_unit.to_radians();
        map_positions(ctx, self.name(), dependency, move |p| {
            let local = p - origin;
            let rotation = Quat::from_axis_angle(axis, local.dot(axis) * rate);
            origin + rotation * local
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deformer::FrameTime;
    use crate::deformer::builtin::test_support::{approx_eq, column, run_stage};

    #[test]
    fn test_twist_rotates_by_height() {
        // Points at (1, y, 0) for y = 0, 1, 2; 90 degrees per unit about Y.
        let out = run_stage(&Twist::new(Axis::Y, 90.0), &column(3), FrameTime::default());
        assert!(approx_eq(out.positions()[0], Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx_eq(out.positions()[1], Vec3::new(0.0, 1.0, -1.0)));
        assert!(approx_eq(out.positions()[2], Vec3::new(-1.0, 2.0, 0.0)));
    }

    #[test]
    fn test_twist_preserves_distance_to_axis() {
        let out = run_stage(&Twist::new(Axis::Y, 37.0), &column(5), FrameTime::default());
        for p in out.positions() {
            assert!((Vec3::new(p.x, 0.0, p.z).length() - 1.0).abs() < 1e-5);
        }
    }
}
