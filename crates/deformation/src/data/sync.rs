//! Channel-masked copies between the two mesh representations.
//!
//! Every direction validates the whole request before copying anything: if
//! either side is missing a requested channel, or the sides disagree on the
//! vertex/index count of a requested channel, the copy is rejected and no
//! channel is touched.

use tracing::trace;

use super::managed::ManagedMeshData;
use super::native::NativeMeshData;
use crate::channels::ChannelSet;
use crate::error::SyncError;

/// A destination that can receive channels from `Source`.
pub trait SyncTarget<Source: ?Sized> {
    /// Copy the requested channels from `source` into `self`.
    fn copy_from(&mut self, channels: ChannelSet, source: &Source) -> Result<(), SyncError>;
}

/// Copy `channels` from `from` into `to`.
///
/// Works for managed→native, native→managed and native→native.
pub fn copy<S: ?Sized, D: SyncTarget<S>>(
    channels: ChannelSet,
    from: &S,
    to: &mut D,
) -> Result<(), SyncError> {
    to.copy_from(channels, from)
}

fn check_sides(source_missing: ChannelSet, destination_missing: ChannelSet) -> Result<(), SyncError> {
    if !source_missing.is_empty() {
        return Err(SyncError::InvalidSource {
            missing: source_missing,
        });
    }
    if !destination_missing.is_empty() {
        return Err(SyncError::InvalidDestination {
            missing: destination_missing,
        });
    }
    Ok(())
}

fn check_counts(
    channels: ChannelSet,
    source_vertices: usize,
    destination_vertices: usize,
    source_indices: usize,
    destination_indices: usize,
) -> Result<(), SyncError> {
    let per_vertex = channels & ChannelSet::PER_VERTEX;
    if !per_vertex.is_empty() && source_vertices != destination_vertices {
        // Report the first offending channel.
        let channel = per_vertex.iter().next().unwrap_or(per_vertex);
        return Err(SyncError::VertexCountMismatch {
            channel,
            source_len: source_vertices,
            destination_len: destination_vertices,
        });
    }
    if channels.contains(ChannelSet::INDICES) && source_indices != destination_indices {
        return Err(SyncError::IndexCountMismatch {
            source_len: source_indices,
            destination_len: destination_indices,
        });
    }
    Ok(())
}

impl SyncTarget<ManagedMeshData> for NativeMeshData {
    fn copy_from(&mut self, channels: ChannelSet, source: &ManagedMeshData) -> Result<(), SyncError> {
        check_sides(source.missing(channels), self.missing(channels))?;
        check_counts(
            channels,
            source.vertex_count(),
            self.vertex_count(),
            source.index_count(),
            self.index_count(),
        )?;
        trace!("sync managed -> native: {:?}", channels.names());
        self.fill_from_managed(channels, source);
        Ok(())
    }
}

impl SyncTarget<NativeMeshData> for ManagedMeshData {
    /// The mask snapshot has no managed counterpart and is ignored.
    fn copy_from(&mut self, channels: ChannelSet, source: &NativeMeshData) -> Result<(), SyncError> {
        let channels = channels & ChannelSet::MANAGED;
        check_sides(source.missing(channels), self.missing(channels))?;
        check_counts(
            channels,
            source.vertex_count(),
            self.vertex_count(),
            source.index_count(),
            self.index_count(),
        )?;
        trace!("sync native -> managed: {:?}", channels.names());
        source.write_to_managed(channels, self);
        Ok(())
    }
}

impl SyncTarget<NativeMeshData> for NativeMeshData {
    fn copy_from(&mut self, channels: ChannelSet, source: &NativeMeshData) -> Result<(), SyncError> {
        check_sides(source.missing(channels), self.missing(channels))?;
        check_counts(
            channels,
            source.vertex_count(),
            self.vertex_count(),
            source.index_count(),
            self.index_count(),
        )?;
        trace!("sync native -> native: {:?}", channels.names());
        self.fill_from_native(channels, source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3, Vec4};
    use rstest::rstest;

    fn quad() -> ManagedMeshData {
        ManagedMeshData::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .with_normals(vec![Vec3::Z; 4])
        .with_tangents(vec![Vec4::new(1.0, 0.0, 0.0, 1.0); 4])
        .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y])
        .with_colors(vec![Vec4::new(1.0, 0.5, 0.25, 1.0); 4])
    }

    /// Every non-empty subset of the managed channels.
    fn managed_subsets() -> Vec<ChannelSet> {
        let flags: Vec<ChannelSet> = ChannelSet::MANAGED.iter().collect();
        (1u32..(1 << flags.len()))
            .map(|mask| {
                flags
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| mask & (1 << bit) != 0)
                    .fold(ChannelSet::empty(), |acc, (_, flag)| acc | *flag)
            })
            .collect()
    }

    #[test]
    fn test_round_trip_every_subset() {
        let original = quad();
        for channels in managed_subsets() {
            let mut native = NativeMeshData::new(4, 6, ChannelSet::ALL);
            copy(channels, &original, &mut native).unwrap();

            let mut managed = original.clone();
            copy(channels, &native, &mut managed).unwrap();
            assert_eq!(managed, original, "round trip changed data for {:?}", channels);
        }
    }

    #[test]
    fn test_unrequested_channels_untouched() {
        let mut native = NativeMeshData::from_managed(&quad());
        native.positions_mut()[0] = Vec3::splat(9.0);
        native.normals_mut()[0] = Vec3::X;

        let mut managed = quad();
        copy(ChannelSet::POSITIONS, &native, &mut managed).unwrap();

        assert_eq!(managed.positions[0], Vec3::splat(9.0));
        assert_eq!(managed.normals, quad().normals);
        assert_eq!(managed.uvs, quad().uvs);
    }

    #[test]
    fn test_invalid_source_aborts_whole_copy() {
        let source = NativeMeshData::new(4, 6, ChannelSet::POSITIONS);
        let mut managed = quad();
        let err = copy(ChannelSet::POSITIONS | ChannelSet::NORMALS, &source, &mut managed).unwrap_err();

        assert_eq!(
            err,
            SyncError::InvalidSource {
                missing: ChannelSet::NORMALS
            }
        );
        // Positions were valid but must not have been copied.
        assert_eq!(managed, quad());
    }

    #[test]
    fn test_invalid_destination_reported() {
        let source = NativeMeshData::from_managed(&quad());
        let mut target = NativeMeshData::new(4, 6, ChannelSet::POSITIONS);
        let err = copy(ChannelSet::POSITIONS | ChannelSet::UVS, &source, &mut target).unwrap_err();
        assert_eq!(
            err,
            SyncError::InvalidDestination {
                missing: ChannelSet::UVS
            }
        );
        assert!(target.positions().iter().all(|p| *p == Vec3::ZERO));
    }

    #[rstest]
    #[case(ChannelSet::POSITIONS)]
    #[case(ChannelSet::NORMALS | ChannelSet::COLORS)]
    #[case(ChannelSet::MASK_POSITIONS)]
    fn test_vertex_count_mismatch(#[case] channels: ChannelSet) {
        let source = NativeMeshData::new(4, 6, ChannelSet::ALL);
        let mut target = NativeMeshData::new(5, 6, ChannelSet::ALL);
        let err = copy(channels, &source, &mut target).unwrap_err();
        assert!(matches!(
            err,
            SyncError::VertexCountMismatch {
                source_len: 4,
                destination_len: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_index_count_mismatch() {
        let source = NativeMeshData::new(4, 6, ChannelSet::ALL);
        let mut target = NativeMeshData::new(4, 3, ChannelSet::ALL);
        let err = copy(ChannelSet::INDICES, &source, &mut target).unwrap_err();
        assert_eq!(
            err,
            SyncError::IndexCountMismatch {
                source_len: 6,
                destination_len: 3
            }
        );
        // Bounds alone don't care about counts.
        assert!(copy(ChannelSet::BOUNDS, &source, &mut target).is_ok());
    }

    #[test]
    fn test_mask_sourced_from_managed_positions() {
        let managed = quad();
        let mut native = NativeMeshData::new(4, 6, ChannelSet::ALL);
        copy(ChannelSet::MASK_POSITIONS, &managed, &mut native).unwrap();
        assert_eq!(native.mask_positions(), managed.positions.as_slice());
        assert!(native.positions().iter().all(|p| *p == Vec3::ZERO));
    }

    #[test]
    fn test_native_to_native() {
        let source = NativeMeshData::from_managed(&quad());
        let mut target = NativeMeshData::new(4, 6, ChannelSet::ALL);
        copy(ChannelSet::ALL & source.allocated(), &source, &mut target).unwrap();
        assert_eq!(target.positions(), source.positions());
        assert_eq!(target.mask_positions(), source.mask_positions());
        assert_eq!(target.indices(), source.indices());
        assert_eq!(target.bounds(), source.bounds());
    }
}
