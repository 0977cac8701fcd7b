//! GPU mesh creation and the dynamic, grow-by-doubling variant used for the
//! mesh that changes every time the visible layer range moves.

use layer_mesh::{LayerGeometry, Vertex};
use tracing::debug;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferDescriptor, BufferUsages, Device, Queue,
};

/// Dynamic buffers never shrink below these, so the common case of
/// scrubbing through similarly sized layers reuses one allocation.
pub const MIN_DYNAMIC_VERTICES: usize = 65_536;
pub const MIN_DYNAMIC_INDICES: usize = 196_608;

/// A vertex/index buffer pair plus live counts. The buffers may be larger
/// than the counts; only `[0, count)` is valid.
pub struct GpuMesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl GpuMesh {
    /// Uploads geometry into freshly created buffers. Empty input produces
    /// no mesh rather than zero-sized buffers.
    pub fn upload(device: &Device, vertices: &[Vertex], indices: &[u32]) -> Option<Self> {
        if vertices.is_empty() || indices.is_empty() {
            return None;
        }

        let vertex_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(vertices),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        });

        let index_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(indices),
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
        });

        Some(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        })
    }
}

/// Merges many geometries and uploads the result as one mesh. `None` when
/// everything was empty.
pub fn merge_to_mesh(
    device: &Device,
    geometries: impl IntoIterator<Item = LayerGeometry>,
) -> Option<GpuMesh> {
    let merged = LayerGeometry::merge(geometries)?;
    GpuMesh::upload(device, &merged.vertices, &merged.indices)
}

/// A mesh that is rewritten every update. While the new geometry fits the
/// existing buffers it is written in place; otherwise the buffers are
/// recreated at double the previous capacity (with the `MIN_DYNAMIC_*`
/// floors) so repeated growth settles quickly.
#[derive(Default)]
pub struct DynamicMesh {
    mesh: Option<GpuMesh>,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl DynamicMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self) -> Option<&GpuMesh> {
        self.mesh.as_ref()
    }

    pub fn update(&mut self, device: &Device, queue: &Queue, geometry: &LayerGeometry) {
        if geometry.is_empty() {
            self.reset();
            return;
        }

        match &mut self.mesh {
            Some(mesh)
                if geometry.vertices.len() <= self.vertex_capacity
                    && geometry.indices.len() <= self.index_capacity =>
            {
                queue.write_buffer(
                    &mesh.vertex_buffer,
                    0,
                    bytemuck::cast_slice(&geometry.vertices),
                );
                queue.write_buffer(&mesh.index_buffer, 0, bytemuck::cast_slice(&geometry.indices));
                mesh.vertex_count = geometry.vertices.len() as u32;
                mesh.index_count = geometry.indices.len() as u32;
            }
            _ => self.recreate(device, queue, geometry),
        }
    }

    /// Drops the buffers and capacities so the next update recreates from
    /// scratch. Also the recovery path when the mesh is in an unknown state.
    pub fn reset(&mut self) {
        self.mesh = None;
        self.vertex_capacity = 0;
        self.index_capacity = 0;
    }

    fn recreate(&mut self, device: &Device, queue: &Queue, geometry: &LayerGeometry) {
        self.vertex_capacity = geometry
            .vertices
            .len()
            .max(self.vertex_capacity * 2)
            .max(MIN_DYNAMIC_VERTICES);
        self.index_capacity = geometry
            .indices
            .len()
            .max(self.index_capacity * 2)
            .max(MIN_DYNAMIC_INDICES);
        debug!(
            vertices = self.vertex_capacity,
            indices = self.index_capacity,
            "recreating dynamic mesh buffers"
        );

        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: None,
            size: (self.vertex_capacity * std::mem::size_of::<Vertex>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: None,
            size: (self.index_capacity * std::mem::size_of::<u32>()) as u64,
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&geometry.vertices));
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&geometry.indices));

        self.mesh = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: geometry.vertices.len() as u32,
            index_count: geometry.indices.len() as u32,
        });
    }
}
