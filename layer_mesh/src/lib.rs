//! Converts per-layer 2D slice geometry into GPU-ready triangle meshes:
//! contour decimation, ear-clipping triangulation, vertical wall extrusion
//! and incremental per-layer builds with pooled buffers.

use nalgebra::Vector3;

pub mod builder;
pub mod context;
pub mod lod;
pub mod simplify;
pub mod triangulate;
pub mod zcache;

/// One mesh vertex as uploaded to the GPU. The color channels double as a
/// data contract for the shader: R is the topmost-layer flag (0 or 1 before
/// the radial gradient is applied), A carries `part id / 255`, and G/B are
/// zero for part geometry but hold literal color for fixture meshes.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, color: [f32; 4]) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            normal: [normal.x, normal.y, normal.z],
            color,
        }
    }
}

/// Raw vertex/index arrays for one build unit. Indices are local, starting
/// at zero, so many geometries can be merged or batched later.
#[derive(Debug, Default, Clone)]
pub struct LayerGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl LayerGeometry {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Merges many geometries into one, offsetting each incoming index by
    /// the vertex count accumulated so far. Returns `None` when nothing
    /// non-empty was supplied.
    pub fn merge(geometries: impl IntoIterator<Item = LayerGeometry>) -> Option<LayerGeometry> {
        let mut out = LayerGeometry::default();
        for geometry in geometries {
            let base = out.vertices.len() as u32;
            out.vertices.extend_from_slice(&geometry.vertices);
            out.indices
                .extend(geometry.indices.iter().map(|index| base + index));
        }

        (!out.is_empty()).then_some(out)
    }

    /// Clears the topmost-layer flag (R channel) on vertices from
    /// `from_vertex` on. Called when a newer layer becomes the topmost so
    /// previously emitted geometry does not need a rebuild.
    pub fn clear_last_layer_flag(&mut self, from_vertex: usize) {
        for vertex in self.vertices.iter_mut().skip(from_vertex) {
            if vertex.color[0] > 0.5 {
                vertex.color[0] = 0.0;
            }
        }
    }
}
