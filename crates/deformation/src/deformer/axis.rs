use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Principal axis a stage is oriented along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    /// Unit vector along the axis.
    pub fn vector(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// The two axes perpendicular to this one, in right-handed order.
    pub fn perpendicular(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perpendicular_is_right_handed() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (u, v) = axis.perpendicular();
            assert_eq!(u.vector().cross(v.vector()), axis.vector());
        }
    }
}
