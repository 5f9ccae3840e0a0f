//! Wavefront OBJ export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use deformation::{ChannelSet, ManagedMeshData};
use tracing::info;

use crate::error::ObjError;

/// Write `mesh` as OBJ text.
///
/// Emits `v` lines, then `vt` and `vn` when the mesh carries those channels,
/// then one `f` line per triangle with 1-based indices shared across the
/// attribute streams. Nothing is written if an index is out of range.
pub fn write_obj(mesh: &ManagedMeshData, writer: impl Write) -> Result<(), ObjError> {
    let vertex_count = mesh.vertex_count();
    if vertex_count == 0 {
        return Err(ObjError::MissingPositions);
    }
    if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ObjError::IndexOutOfRange { index, vertex_count });
    }
    let available = mesh.available();
    let has_uvs = available.contains(ChannelSet::UVS);
    let has_normals = available.contains(ChannelSet::NORMALS);

    let mut w = BufWriter::new(writer);
    for p in &mesh.positions {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }
    if has_uvs {
        for uv in &mesh.uvs {
            writeln!(w, "vt {} {}", uv.x, uv.y)?;
        }
    }
    if has_normals {
        for n in &mesh.normals {
            writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    if available.contains(ChannelSet::INDICES) {
        for tri in mesh.indices.chunks_exact(3) {
            write!(w, "f")?;
            for &index in tri {
                let i = index as u64 + 1;
                match (has_uvs, has_normals) {
                    (true, true) => write!(w, " {i}/{i}/{i}")?,
                    (true, false) => write!(w, " {i}/{i}")?,
                    (false, true) => write!(w, " {i}//{i}")?,
                    (false, false) => write!(w, " {i}")?,
                }
            }
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Export `mesh` to an OBJ file.
pub fn export_obj(mesh: &ManagedMeshData, path: impl AsRef<Path>) -> Result<(), ObjError> {
    let path = path.as_ref();
    write_obj(mesh, File::create(path)?)?;
    info!(
        "Exported OBJ {:?}: {} vertices, {} triangles",
        path,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(())
}
