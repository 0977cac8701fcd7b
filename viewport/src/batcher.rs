//! Accumulates many per-layer geometries into as few GPU meshes as
//! possible. Each batch stays well inside the 32-bit index space; when a
//! geometry does not fit, the caller ends the batch and starts a new one.

use layer_mesh::{LayerGeometry, Vertex};
use wgpu::Device;

use crate::mesh::GpuMesh;

pub const MAX_VERTICES_PER_BATCH: usize = 1_000_000;
pub const MAX_INDICES_PER_BATCH: usize = 3_000_000;

pub struct MeshBatcher {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    max_vertices: usize,
    max_indices: usize,
}

impl Default for MeshBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBatcher {
    pub fn new() -> Self {
        Self::with_limits(MAX_VERTICES_PER_BATCH, MAX_INDICES_PER_BATCH)
    }

    pub fn with_limits(max_vertices: usize, max_indices: usize) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            max_vertices,
            max_indices,
        }
    }

    pub fn begin_batch(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Appends a geometry, offsetting its indices by the vertices already
    /// batched. Returns `false` without touching the batch when the
    /// geometry would push either count past its limit.
    pub fn add_to_batch(&mut self, geometry: &LayerGeometry) -> bool {
        if self.vertices.len() + geometry.vertices.len() > self.max_vertices
            || self.indices.len() + geometry.indices.len() > self.max_indices
        {
            return false;
        }

        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&geometry.vertices);
        self.indices
            .extend(geometry.indices.iter().map(|index| base + index));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the batch is at 90% of either limit, a hint to end it before
    /// a typical layer gets rejected.
    pub fn is_full(&self) -> bool {
        self.vertices.len() * 10 >= self.max_vertices * 9
            || self.indices.len() * 10 >= self.max_indices * 9
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Uploads the accumulated batch (or `None` if empty) and clears the
    /// batcher for reuse.
    pub fn end_batch(&mut self, device: &Device) -> Option<GpuMesh> {
        let mesh = GpuMesh::upload(device, &self.vertices, &self.indices);
        self.begin_batch();
        mesh
    }
}
