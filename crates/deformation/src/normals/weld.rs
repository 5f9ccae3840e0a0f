//! Position welding keys.
//!
//! Coordinates are quantized to a tolerance and mixed with 32-bit FNV-1a, so
//! vertices that occupy the same location land in the same bucket no matter
//! which buffer index they have.

use std::hash::{Hash, Hasher};

use deform_config::DEFAULT_WELD_EPSILON;
use glam::Vec3;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Quantized position used as a smoothing-group key.
///
/// Equality compares the quantized cell exactly; hashing uses the FNV mix of
/// that cell, so hash collisions never merge distinct positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionKey {
    cell: [i64; 3],
    hash: u32,
}

impl PositionKey {
    /// Quantize `position` with step `epsilon`.
    ///
    /// Non-positive or non-finite steps fall back to the default tolerance.
    pub fn new(position: Vec3, epsilon: f32) -> Self {
        let step = if epsilon.is_finite() && epsilon > 0.0 {
            epsilon as f64
        } else {
            DEFAULT_WELD_EPSILON as f64
        };
        let quantize = |value: f32| (value as f64 / step).round() as i64;
        let cell = [quantize(position.x), quantize(position.y), quantize(position.z)];
        Self {
            cell,
            hash: fnv1a(&cell),
        }
    }

    pub fn cell(&self) -> [i64; 3] {
        self.cell
    }

    /// The 32-bit position hash.
    pub fn hash_value(&self) -> u32 {
        self.hash
    }
}

impl Hash for PositionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash);
    }
}

fn fnv1a(cell: &[i64; 3]) -> u32 {
    cell.iter()
        .flat_map(|component| component.to_le_bytes())
        .fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ byte as u32).wrapping_mul(FNV_PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coincident_positions_share_key() {
        let a = PositionKey::new(Vec3::new(0.1, 0.2, 0.3), 1e-5);
        let b = PositionKey::new(Vec3::new(0.1 + 1e-7, 0.2, 0.3 - 1e-7), 1e-5);
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_distant_positions_differ() {
        let a = PositionKey::new(Vec3::new(0.1, 0.2, 0.3), 1e-5);
        let b = PositionKey::new(Vec3::new(0.1001, 0.2, 0.3), 1e-5);
        assert_ne!(a, b);
    }

    #[test]
    fn test_epsilon_controls_welding() {
        let p = Vec3::new(1.0, 1.0, 1.0);
        let q = Vec3::new(1.004, 1.0, 1.0);
        assert_ne!(PositionKey::new(p, 1e-5), PositionKey::new(q, 1e-5));
        assert_eq!(PositionKey::new(p, 0.1), PositionKey::new(q, 0.1));
    }

    #[test]
    fn test_invalid_epsilon_falls_back() {
        let p = Vec3::new(0.5, -0.25, 2.0);
        assert_eq!(PositionKey::new(p, 0.0), PositionKey::new(p, DEFAULT_WELD_EPSILON));
        assert_eq!(PositionKey::new(p, f32::NAN), PositionKey::new(p, DEFAULT_WELD_EPSILON));
    }

    #[test]
    fn test_fnv_reference_value() {
        // FNV-1a of 24 zero bytes.
        let expected = (0..24).fold(FNV_OFFSET_BASIS, |hash, _| hash.wrapping_mul(FNV_PRIME));
        assert_eq!(PositionKey::new(Vec3::ZERO, 1e-5).hash_value(), expected);
    }
}
