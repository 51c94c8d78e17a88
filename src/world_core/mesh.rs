use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::world_core::config::{MeshConfig, NormalStrategy};
use crate::world_core::heightmap::HeightField;

/// UV-space determinants smaller than this make the tangent solve unstable.
const MIN_UV_DETERMINANT: f32 = 1e-12;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub uv: [f32; 2],
}

/// Interleaved vertices (one per grid cell) plus a triangle list.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Triangles whose UV basis was too degenerate to contribute a tangent.
    pub degenerate_tangent_triangles: usize,
}

impl MeshBuffers {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

pub fn build_mesh(field: &HeightField, config: &MeshConfig) -> MeshBuffers {
    build_mesh_at(field, config, (0, 0))
}

/// Builds the mesh with vertex positions offset by `origin`, given in grid
/// cells, so chunks land at their place in the world. UVs stay chunk-local.
pub fn build_mesh_at(field: &HeightField, config: &MeshConfig, origin: (i64, i64)) -> MeshBuffers {
    let width = field.width();
    let depth = field.depth();
    let total = width * depth;

    let positions: Vec<Vec3> = maybe_par_iter!(0..total)
        .map(|idx| {
            let x = idx % width;
            let z = idx / width;
            Vec3::new(
                (origin.0 + x as i64) as f32 * config.horizontal_scale,
                field.values()[idx] * config.vertical_scale,
                (origin.1 + z as i64) as f32 * config.horizontal_scale,
            )
        })
        .collect();

    let uvs: Vec<Vec2> = maybe_par_iter!(0..total)
        .map(|idx| {
            let x = (idx % width) as f32;
            let z = (idx / width) as f32;
            Vec2::new(
                x / width as f32 * config.uv_scale,
                z / depth as f32 * config.uv_scale,
            )
        })
        .collect();

    let indices = grid_indices(width, depth);

    let normals = match config.normals {
        NormalStrategy::FaceAccumulation => face_normals(&positions, &indices),
        NormalStrategy::FiniteDifference => gradient_normals(field, config),
    };

    let (tangents, degenerate) = compute_tangents(&positions, &uvs, &normals, &indices);
    if degenerate > 0 {
        log::trace!("{degenerate} triangles skipped for tangents (degenerate UVs)");
    }

    let vertices = (0..total)
        .map(|i| MeshVertex {
            position: positions[i].to_array(),
            normal: normals[i].to_array(),
            tangent: tangents[i].to_array(),
            uv: uvs[i].to_array(),
        })
        .collect();

    MeshBuffers {
        vertices,
        indices,
        degenerate_tangent_triangles: degenerate,
    }
}

/// Two triangles per quad, `(tl, bl, tr)` and `(tr, bl, br)`, which faces up
/// for a y-up, z-forward grid.
pub fn grid_indices(width: usize, depth: usize) -> Vec<u32> {
    if width < 2 || depth < 2 {
        return Vec::new();
    }
    let mut indices = Vec::with_capacity((width - 1) * (depth - 1) * 6);
    for z in 0..(depth - 1) {
        for x in 0..(width - 1) {
            let top_left = (z * width + x) as u32;
            let top_right = top_left + 1;
            let bottom_left = top_left + width as u32;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                bottom_left,
                top_right,
                top_right,
                bottom_left,
                bottom_right,
            ]);
        }
    }
    indices
}

/// Averages the unit face normals of every triangle touching a vertex.
fn face_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    debug_assert!(indices.len() % 3 == 0);
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        debug_assert!(i0 < positions.len() && i1 < positions.len() && i2 < positions.len());
        let a = positions[i0];
        let face_normal = (positions[i1] - a)
            .cross(positions[i2] - a)
            .normalize_or_zero();
        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

/// Central differences over the height field with edge clamping.
fn gradient_normals(field: &HeightField, config: &MeshConfig) -> Vec<Vec3> {
    let width = field.width();
    let k = config.vertical_scale / config.horizontal_scale;

    maybe_par_iter!(0..field.len())
        .map(|idx| {
            let x = (idx % width) as isize;
            let z = (idx / width) as isize;
            let h_l = field.get_clamped(x - 1, z);
            let h_r = field.get_clamped(x + 1, z);
            let h_d = field.get_clamped(x, z - 1);
            let h_u = field.get_clamped(x, z + 1);
            Vec3::new((h_l - h_r) * k, 2.0, (h_d - h_u) * k).normalize()
        })
        .collect()
}

/// Per-triangle UV-space tangent solve, accumulated per vertex and then
/// Gram-Schmidt orthogonalized against the normal. Returns the tangents and
/// the number of triangles skipped for a degenerate UV basis.
fn compute_tangents(
    positions: &[Vec3],
    uvs: &[Vec2],
    normals: &[Vec3],
    indices: &[u32],
) -> (Vec<Vec3>, usize) {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    let mut degenerate = 0;

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let edge1 = positions[i1] - positions[i0];
        let edge2 = positions[i2] - positions[i0];
        let duv1 = uvs[i1] - uvs[i0];
        let duv2 = uvs[i2] - uvs[i0];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < MIN_UV_DETERMINANT {
            degenerate += 1;
            continue;
        }
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) / det;
        accumulated[i0] += tangent;
        accumulated[i1] += tangent;
        accumulated[i2] += tangent;
    }

    let tangents = accumulated
        .into_iter()
        .zip(normals)
        .map(|(t, &n)| {
            let projected = t - n * n.dot(t);
            projected
                .try_normalize()
                .unwrap_or_else(|| fallback_tangent(n))
        })
        .collect();

    (tangents, degenerate)
}

fn fallback_tangent(normal: Vec3) -> Vec3 {
    (Vec3::X - normal * normal.dot(Vec3::X))
        .try_normalize()
        .unwrap_or_else(|| normal.any_orthonormal_vector())
}
