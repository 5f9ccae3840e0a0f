//! Angle-threshold smooth normal recalculation.
//!
//! Mesh builders duplicate vertices along UV seams and hard edges, so a naive
//! per-index average leaves visible shading seams. This module welds vertices
//! by position instead:
//!
//! 1. Face normals are computed per triangle (degenerate triangles give zero).
//! 2. Every (vertex, triangle) corner is bucketed by its [`PositionKey`].
//! 3. Within a bucket, each distinct vertex index sums the face normals of
//!    all corners that either share its index or whose face lies within the
//!    smoothing angle of its own face, then normalizes the sum.
//!
//! Topology is never modified; only the normal channel is written. Vertices
//! no triangle references keep their previous normal.

mod weld;

pub use weld::PositionKey;

use std::collections::HashMap;

use deform_config::{DEFAULT_SMOOTHING_ANGLE, DEFAULT_WELD_EPSILON, DeformConfig};
use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channels::ChannelSet;
use crate::data::NativeMeshData;
use crate::error::NormalsError;

/// Parameters for normal recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalSettings {
    /// Maximum dihedral angle (degrees) across which faces blend
    pub smoothing_angle: f32,
    /// Quantization step for welding coincident vertices
    pub weld_epsilon: f32,
}

impl Default for NormalSettings {
    fn default() -> Self {
        Self {
            smoothing_angle: DEFAULT_SMOOTHING_ANGLE,
            weld_epsilon: DEFAULT_WELD_EPSILON,
        }
    }
}

impl From<&DeformConfig> for NormalSettings {
    fn from(config: &DeformConfig) -> Self {
        Self {
            smoothing_angle: config.smoothing_angle,
            weld_epsilon: config.weld_epsilon,
        }
    }
}

impl NormalSettings {
    pub fn new(smoothing_angle: f32, weld_epsilon: f32) -> Self {
        Self {
            smoothing_angle,
            weld_epsilon,
        }
    }

    /// Minimum face-normal cosine for two faces to blend.
    ///
    /// At 180 degrees or more every pair passes, including pairs whose dot
    /// product rounds slightly below -1.
    pub fn cos_threshold(&self) -> f32 {
        if self.smoothing_angle >= 180.0 {
            f32::NEG_INFINITY
        } else {
            self.smoothing_angle.max(0.0).to_radians().cos()
        }
    }
}

/// Per-triangle unit normals; zero for degenerate triangles.
pub fn face_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    indices
        .par_chunks_exact(3)
        .map(|tri| {
            let a = positions[tri[0] as usize];
            let b = positions[tri[1] as usize];
            let c = positions[tri[2] as usize];
            (b - a).cross(c - a).normalize_or_zero()
        })
        .collect()
}

/// Recalculate normals in place from positions and a triangle list.
pub fn recalculate_normals(
    positions: &[Vec3],
    indices: &[u32],
    normals: &mut [Vec3],
    settings: &NormalSettings,
) -> Result<(), NormalsError> {
    if normals.len() != positions.len() {
        return Err(NormalsError::MissingChannels(ChannelSet::NORMALS));
    }
    if indices.len() % 3 != 0 {
        return Err(NormalsError::NotTriangles(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(NormalsError::IndexOutOfRange {
            index,
            vertex_count: positions.len(),
        });
    }

    let faces = face_normals(positions, indices);

    let mut groups: HashMap<PositionKey, Vec<(u32, u32)>> = HashMap::with_capacity(positions.len());
    for (triangle, corners) in indices.chunks_exact(3).enumerate() {
        for &vertex in corners {
            let key = PositionKey::new(positions[vertex as usize], settings.weld_epsilon);
            groups.entry(key).or_default().push((vertex, triangle as u32));
        }
    }

    let cos_threshold = settings.cos_threshold();
    let groups: Vec<Vec<(u32, u32)>> = groups.into_values().collect();
    let blended: Vec<(u32, Vec3)> = groups
        .par_iter()
        .flat_map_iter(|entries| blend_group(entries, &faces, cos_threshold))
        .collect();

    for (vertex, normal) in blended {
        normals[vertex as usize] = normal;
    }
    Ok(())
}

/// Recalculate the normal channel of native mesh data.
pub fn recalculate(data: &mut NativeMeshData, settings: &NormalSettings) -> Result<(), NormalsError> {
    let required = ChannelSet::POSITIONS | ChannelSet::INDICES | ChannelSet::NORMALS;
    let missing = data.missing(required);
    if !missing.is_empty() {
        return Err(NormalsError::MissingChannels(missing));
    }
    let (positions, indices, normals) = data.normal_inputs_mut();
    recalculate_normals(positions, indices, normals, settings)
}

/// Blend one position bucket, once per distinct vertex index.
///
/// The first corner of a vertex (in triangle order) supplies the reference
/// face for the angle test.
fn blend_group(entries: &[(u32, u32)], faces: &[Vec3], cos_threshold: f32) -> Vec<(u32, Vec3)> {
    let mut out = Vec::new();
    for (i, &(vertex, triangle)) in entries.iter().enumerate() {
        if entries[..i].iter().any(|&(seen, _)| seen == vertex) {
            continue;
        }
        let reference = faces[triangle as usize];
        let sum = entries
            .iter()
            .fold(Vec3::ZERO, |sum, &(other_vertex, other_triangle)| {
                let face = faces[other_triangle as usize];
                if other_vertex == vertex || reference.dot(face) >= cos_threshold {
                    sum + face
                } else {
                    sum
                }
            });
        out.push((vertex, sum.normalize_or_zero()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    /// Unit quad in the XY plane sharing the diagonal vertices.
    fn flat_quad() -> (Vec<Vec3>, Vec<u32>) {
        (
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Two triangles meeting at 90 degrees along the Y axis, with the shared
    /// edge duplicated per triangle (six buffer vertices).
    fn folded_seam() -> (Vec<Vec3>, Vec<u32>) {
        (
            vec![
                // XY plane, normal +Z
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                // wall in the YZ plane, normal +X
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            vec![0, 1, 2, 3, 4, 5],
        )
    }

    #[rstest]
    #[case(0.0)]
    #[case(30.0)]
    #[case(90.0)]
    #[case(180.0)]
    fn test_coplanar_quad_uses_face_normal(#[case] angle: f32) {
        let (positions, indices) = flat_quad();
        let mut normals = vec![Vec3::ZERO; 4];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::new(angle, 1e-5)).unwrap();
        for n in normals {
            assert!(approx_eq(n, Vec3::Z), "angle {angle}: {n:?}");
        }
    }

    #[test]
    fn test_fold_hard_at_zero_degrees() {
        let (positions, indices) = folded_seam();
        let faces = face_normals(&positions, &indices);
        assert!(approx_eq(faces[0], Vec3::Z));
        assert!(approx_eq(faces[1], Vec3::X));

        let mut normals = vec![Vec3::ZERO; 6];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::new(0.0, 1e-5)).unwrap();
        for n in &normals[0..3] {
            assert!(approx_eq(*n, Vec3::Z));
        }
        for n in &normals[3..6] {
            assert!(approx_eq(*n, Vec3::X));
        }
    }

    #[test]
    fn test_fold_smooth_at_180_degrees() {
        let (positions, indices) = folded_seam();
        let mut normals = vec![Vec3::ZERO; 6];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::new(180.0, 1e-5)).unwrap();

        let blended = (Vec3::X + Vec3::Z).normalize();
        // Seam vertices (origin and +Y) blend both faces.
        for vertex in [0, 2, 3, 4] {
            assert!(approx_eq(normals[vertex], blended), "vertex {vertex}: {:?}", normals[vertex]);
        }
        // Corners touched by a single face keep it.
        assert!(approx_eq(normals[1], Vec3::Z));
        assert!(approx_eq(normals[5], Vec3::X));
    }

    #[test]
    fn test_coincident_vertices_weld() {
        // Two faces folded by 30 degrees, seam duplicated.
        let tilt = 30f32.to_radians();
        let far = Vec3::new(0.0, -tilt.cos(), tilt.sin());
        let mut positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::ZERO,
            far,
            Vec3::X,
        ];
        let indices = vec![0, 1, 2, 3, 4, 5];
        let settings = NormalSettings::new(60.0, 1e-5);

        let mut normals = vec![Vec3::ZERO; 6];
        recalculate_normals(&positions, &indices, &mut normals, &settings).unwrap();
        assert!(approx_eq(normals[0], normals[3]));
        assert!(approx_eq(normals[1], normals[5]));

        // Pull one duplicate out of tolerance: the pair no longer matches.
        positions[3] = Vec3::new(0.0, 0.0, 0.01);
        recalculate_normals(&positions, &indices, &mut normals, &settings).unwrap();
        assert!(!approx_eq(normals[0], normals[3]));
    }

    #[test]
    fn test_idempotent() {
        let (positions, indices) = folded_seam();
        let settings = NormalSettings::new(45.0, 1e-5);
        let mut first = vec![Vec3::ZERO; 6];
        recalculate_normals(&positions, &indices, &mut first, &settings).unwrap();
        let mut second = first.clone();
        recalculate_normals(&positions, &indices, &mut second, &settings).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_index_always_blends() {
        // Same fold, but the seam vertices are shared indices.
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let mut normals = vec![Vec3::ZERO; 4];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::new(0.0, 1e-5)).unwrap();
        let blended = (Vec3::X + Vec3::Z).normalize();
        assert!(approx_eq(normals[0], blended));
        assert!(approx_eq(normals[2], blended));
    }

    #[test]
    fn test_degenerate_triangle_contributes_zero() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0), Vec3::Y];
        let indices = vec![0, 1, 2, 0, 1, 3];
        let mut normals = vec![Vec3::ONE; 4];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::new(180.0, 1e-5)).unwrap();
        assert!(normals.iter().all(|n| n.is_finite()));
        assert!(approx_eq(normals[0], Vec3::Z));
        // Only the degenerate face touches vertex 2.
        assert_eq!(normals[2], Vec3::ZERO);
    }

    #[test]
    fn test_unreferenced_vertex_keeps_normal() {
        let (mut positions, indices) = flat_quad();
        positions.push(Vec3::splat(5.0));
        let mut normals = vec![Vec3::Y; 5];
        recalculate_normals(&positions, &indices, &mut normals, &NormalSettings::default()).unwrap();
        assert_eq!(normals[4], Vec3::Y);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (positions, _) = flat_quad();
        let mut normals = vec![Vec3::ZERO; 4];
        let settings = NormalSettings::default();
        assert_eq!(
            recalculate_normals(&positions, &[0, 1], &mut normals, &settings),
            Err(NormalsError::NotTriangles(2))
        );
        assert_eq!(
            recalculate_normals(&positions, &[0, 1, 9], &mut normals, &settings),
            Err(NormalsError::IndexOutOfRange {
                index: 9,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn test_native_requires_channels() {
        let mut data = NativeMeshData::new(4, 6, ChannelSet::POSITIONS | ChannelSet::INDICES);
        assert_eq!(
            recalculate(&mut data, &NormalSettings::default()),
            Err(NormalsError::MissingChannels(ChannelSet::NORMALS))
        );
    }
}
