//! GPU-side half of the layer viewer: buffer upload and in-place update,
//! batching of per-layer geometry, build-platform fixture meshes and the
//! frustum/LOD selector. Everything here runs on the thread that owns the
//! device; the CPU-side geometry arrives pre-built from `layer_mesh`.

use std::mem;

use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

pub use layer_mesh::{LayerGeometry, Vertex};

pub mod batcher;
pub mod frustum;
pub mod mesh;
pub mod platform;

pub const VERTEX_BUFFER_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: mem::size_of::<Vertex>() as BufferAddress,
    step_mode: VertexStepMode::Vertex,
    attributes: &[
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: 4 * 3,
            shader_location: 1,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: 4 * 6,
            shader_location: 2,
            format: VertexFormat::Float32x4,
        },
    ],
};
