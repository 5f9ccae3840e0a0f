//! POINTCACHE2 (`.pc2`) vertex animation files.
//!
//! Layout, all little-endian:
//!
//! | bytes | field                        |
//! |-------|------------------------------|
//! | 12    | signature `"POINTCACHE2\0"`  |
//! | 4     | `i32` version (1)            |
//! | 4     | `i32` points per frame       |
//! | 4     | `f32` start frame            |
//! | 4     | `f32` frame rate             |
//! | 4     | `i32` frame count            |
//!
//! followed by `frame count * points` triples of `f32`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use deformation::PointCacheFrames;
use glam::Vec3;
use tracing::{debug, error, info};

use crate::error::PointCacheError;

pub const SIGNATURE: &[u8; 12] = b"POINTCACHE2\0";
pub const VERSION: i32 = 1;

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pc2Header {
    pub points: usize,
    pub start_frame: f32,
    pub frame_rate: f32,
    pub frames: usize,
}

impl Pc2Header {
    pub const SIZE: usize = 32;

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..12].copy_from_slice(SIGNATURE);
        bytes[12..16].copy_from_slice(&VERSION.to_le_bytes());
        bytes[16..20].copy_from_slice(&(self.points as i32).to_le_bytes());
        bytes[20..24].copy_from_slice(&self.start_frame.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.frame_rate.to_le_bytes());
        bytes[28..32].copy_from_slice(&(self.frames as i32).to_le_bytes());
        bytes
    }

    /// Read and validate a header
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PointCacheError> {
        if bytes.len() < Self::SIZE {
            return Err(PointCacheError::Truncated {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        if &bytes[0..12] != SIGNATURE {
            return Err(PointCacheError::BadSignature);
        }
        let version = i32_at(bytes, 12);
        if version != VERSION {
            return Err(PointCacheError::UnsupportedVersion(version));
        }
        let points = count_at(bytes, 16, "point count")?;
        let start_frame = f32_at(bytes, 20);
        let frame_rate = f32_at(bytes, 24);
        let frames = count_at(bytes, 28, "frame count")?;
        if !start_frame.is_finite() || !frame_rate.is_finite() {
            return Err(PointCacheError::InvalidHeader(format!(
                "non-finite timing (start {start_frame}, rate {frame_rate})"
            )));
        }
        Ok(Self {
            points,
            start_frame,
            frame_rate,
            frames,
        })
    }

    /// Size of the point data following the header
    pub fn body_size(&self) -> Option<usize> {
        self.points.checked_mul(self.frames)?.checked_mul(12)
    }
}

/// Decode a whole point cache from memory.
pub fn parse_point_cache(bytes: &[u8]) -> Result<PointCacheFrames, PointCacheError> {
    let header = Pc2Header::from_bytes(bytes)?;
    let body_size = header
        .body_size()
        .ok_or_else(|| PointCacheError::InvalidHeader("point data size overflows".to_string()))?;
    let expected = Pc2Header::SIZE + body_size;
    if bytes.len() < expected {
        return Err(PointCacheError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }
    if bytes.len() > expected {
        debug!("Ignoring {} trailing bytes after point data", bytes.len() - expected);
    }

    let points = bytes[Pc2Header::SIZE..expected]
        .chunks_exact(12)
        .map(|c| Vec3::new(f32_at(c, 0), f32_at(c, 4), f32_at(c, 8)))
        .collect();
    Ok(PointCacheFrames::new(
        header.points,
        points,
        header.start_frame,
        header.frame_rate,
    )?)
}

/// Read a point cache from any reader.
pub fn read_point_cache(mut reader: impl Read) -> Result<PointCacheFrames, PointCacheError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_point_cache(&bytes)
}

/// Import a point cache file.
///
/// Failures are logged and produce an empty cache, never a partial one.
pub fn import_point_cache(path: impl AsRef<Path>) -> PointCacheFrames {
    let path = path.as_ref();
    let result = File::open(path)
        .map_err(PointCacheError::from)
        .and_then(|file| read_point_cache(BufReader::new(file)));
    match result {
        Ok(frames) => {
            info!(
                "Imported point cache {:?}: {} frames of {} points",
                path,
                frames.frame_count(),
                frames.frame_size()
            );
            frames
        }
        Err(e) => {
            error!("Failed to import point cache {:?}: {}", path, e);
            PointCacheFrames::empty()
        }
    }
}

/// Write `frames` in POINTCACHE2 layout.
pub fn write_point_cache(frames: &PointCacheFrames, writer: impl Write) -> Result<(), PointCacheError> {
    let header = Pc2Header {
        points: frames.frame_size(),
        start_frame: frames.start_frame,
        frame_rate: frames.frame_rate,
        frames: frames.frame_count(),
    };
    if i32::try_from(header.points).is_err() || i32::try_from(header.frames).is_err() {
        return Err(PointCacheError::InvalidHeader("counts exceed i32 range".to_string()));
    }

    let mut writer = BufWriter::new(writer);
    writer.write_all(&header.to_bytes())?;
    for p in frames.points() {
        for value in p.to_array() {
            writer.write_all(&value.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn count_at(bytes: &[u8], offset: usize, what: &str) -> Result<usize, PointCacheError> {
    let value = i32_at(bytes, offset);
    usize::try_from(value).map_err(|_| PointCacheError::InvalidHeader(format!("negative {what} {value}")))
}
