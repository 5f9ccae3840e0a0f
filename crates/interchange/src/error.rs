use deformation::FrameLayoutError;

/// Errors raised while reading or writing point caches.
#[derive(Debug, thiserror::Error)]
pub enum PointCacheError {
    #[error("Not a point cache: bad signature")]
    BadSignature,

    #[error("Unsupported point cache version {0}")]
    UnsupportedVersion(i32),

    #[error("Point cache truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid point cache header: {0}")]
    InvalidHeader(String),

    #[error(transparent)]
    Layout(#[from] FrameLayoutError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while exporting meshes.
#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    #[error("Mesh has no positions")]
    MissingPositions,

    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
