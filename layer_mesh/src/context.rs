//! Pooled scratch buffers for geometry assembly. Building a layer touches
//! tens of thousands of vertices; renting the backing storage from a shared
//! pool keeps rebuild-heavy interactions (scrubbing through layers) from
//! reallocating every frame.

use std::sync::Arc;

use cli_format::Point;
use nalgebra::Vector3;
use parking_lot::Mutex;

use crate::{LayerGeometry, Vertex};

pub const DEFAULT_VERTEX_CAPACITY: usize = 65_536;
pub const DEFAULT_INDEX_CAPACITY: usize = 262_144;
/// Buffers returned beyond this are dropped instead of retained.
pub const MAX_POOLED_BUFFERS: usize = 16;

/// Shared pool of vertex and index buffers. Rented buffers come back empty
/// but with their capacity intact.
#[derive(Debug, Default)]
pub struct BufferPool {
    vertices: Mutex<Vec<Vec<Vertex>>>,
    indices: Mutex<Vec<Vec<u32>>>,
}

impl BufferPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn rent_vertices(&self) -> Vec<Vertex> {
        self.vertices
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DEFAULT_VERTEX_CAPACITY))
    }

    fn rent_indices(&self) -> Vec<u32> {
        self.indices
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DEFAULT_INDEX_CAPACITY))
    }

    fn return_vertices(&self, mut buffer: Vec<Vertex>) {
        let mut pool = self.vertices.lock();
        if pool.len() < MAX_POOLED_BUFFERS {
            buffer.clear();
            pool.push(buffer);
        }
    }

    fn return_indices(&self, mut buffer: Vec<u32>) {
        let mut pool = self.indices.lock();
        if pool.len() < MAX_POOLED_BUFFERS {
            buffer.clear();
            pool.push(buffer);
        }
    }
}

/// Assembly scratch space for one build. Accumulates vertices and indices
/// through the add_* methods, hands out a [`LayerGeometry`] copy, and
/// returns its storage to the pool on drop.
pub struct GeometryContext {
    pool: Arc<BufferPool>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryContext {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        let vertices = pool.rent_vertices();
        let indices = pool.rent_indices();
        Self {
            pool,
            vertices,
            indices,
        }
    }

    /// Guarantees room for `additional` more vertices without reallocating.
    pub fn ensure_vertex_capacity(&mut self, additional: usize) {
        self.vertices.reserve(additional);
    }

    pub fn ensure_index_capacity(&mut self, additional: usize) {
        self.indices.reserve(additional);
    }

    /// Appends a vertex and returns its index.
    pub fn add_vertex(&mut self, position: Vector3<f32>, normal: Vector3<f32>, color: [f32; 4]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(position, normal, color));
        index
    }

    /// Appends a quad as two triangles. Corners are given in winding order.
    pub fn add_quad(&mut self, corners: [Vector3<f32>; 4], normal: Vector3<f32>, colors: [[f32; 4]; 4]) {
        self.ensure_vertex_capacity(4);
        self.ensure_index_capacity(6);

        let base = self.vertices.len() as u32;
        for (corner, color) in corners.into_iter().zip(colors) {
            self.vertices.push(Vertex::new(corner, normal, color));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Extrudes the 2D segment `a -> b` into a vertical wall quad between
    /// `z_bottom` and `z_top`. The normal is the segment's outward
    /// perpendicular; degenerate segments get an arbitrary +X normal rather
    /// than a NaN one.
    pub fn add_wall_segment(
        &mut self,
        a: Point,
        b: Point,
        z_bottom: f32,
        z_top: f32,
        color_a: [f32; 4],
        color_b: [f32; 4],
    ) {
        let edge = b - a;
        let length = edge.norm();
        let normal = if length < 1e-4 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(-edge.y / length, edge.x / length, 0.0)
        };

        self.add_quad(
            [
                Vector3::new(a.x, a.y, z_bottom),
                Vector3::new(a.x, a.y, z_top),
                Vector3::new(b.x, b.y, z_top),
                Vector3::new(b.x, b.y, z_bottom),
            ],
            normal,
            [color_a, color_a, color_b, color_b],
        );
    }

    /// Fan-triangulates a convex polygon at height `z`. `color` is sampled
    /// per point so a gradient can vary across the cap.
    pub fn add_convex_fan(
        &mut self,
        points: &[Point],
        z: f32,
        normal: Vector3<f32>,
        mut color: impl FnMut(Point) -> [f32; 4],
    ) {
        if points.len() < 3 {
            return;
        }

        self.ensure_vertex_capacity(points.len());
        self.ensure_index_capacity((points.len() - 2) * 3);

        let base = self.vertices.len() as u32;
        for &point in points {
            let color = color(point);
            self.vertices
                .push(Vertex::new(Vector3::new(point.x, point.y, z), normal, color));
        }
        for i in 1..points.len() as u32 - 1 {
            self.indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Copies the accumulated geometry out; the scratch buffers stay rented
    /// for further assembly.
    pub fn to_geometry(&self) -> LayerGeometry {
        LayerGeometry {
            vertices: self.vertices.clone(),
            indices: self.indices.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

impl Drop for GeometryContext {
    fn drop(&mut self) {
        self.pool.return_vertices(std::mem::take(&mut self.vertices));
        self.pool.return_indices(std::mem::take(&mut self.indices));
    }
}

/// Center and radius of a bounding circle over the points, computed from
/// the axis-aligned bounding box. Good enough for gradient falloff.
pub fn bounding_circle<'a>(points: impl IntoIterator<Item = &'a Point>) -> (Point, f32) {
    let (mut min, mut max) = (
        Point::new(f32::INFINITY, f32::INFINITY),
        Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
    );

    let mut any = false;
    for point in points {
        if !point.x.is_finite() || !point.y.is_finite() {
            continue;
        }
        any = true;
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }

    if !any {
        return (Point::new(0.0, 0.0), 0.0);
    }

    let center = (min + max) / 2.0;
    let radius = ((max.x - min.x).max(max.y - min.y)) / 2.0;
    (center, radius)
}
