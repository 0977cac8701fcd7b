//! Fixture meshes for the build chamber: platform slab, grid, axes and the
//! build-volume wireframe. These are non-part geometry, so per the color
//! contract R is 0 and alpha is 0; the literal color rides in G/B.
//!
//! The grid and wireframe return line-list geometry (two indices per line);
//! everything else is triangle lists.

use layer_mesh::{LayerGeometry, Vertex};
use nalgebra::Vector3;

pub const DEFAULT_PLATFORM_SIZE: f32 = 320.0;
pub const GRID_PITCH: f32 = 10.0;

const PLATFORM_COLOR: [f32; 4] = [0.0, 60.0 / 255.0, 60.0 / 255.0, 0.0];
const GRID_COLOR: [f32; 4] = [0.0, 80.0 / 255.0, 80.0 / 255.0, 0.0];
const AXES_COLOR: [f32; 4] = [0.0, 89.0 / 255.0, 89.0 / 255.0, 0.0];
const BOUNDARY_COLOR: [f32; 4] = [0.0, 120.0 / 255.0, 120.0 / 255.0, 0.0];

const AXIS_WIDTH: f32 = 1.0;
/// Z offsets keeping the grid and axes from z-fighting with the slab.
const GRID_LIFT: f32 = 0.01;
const AXES_LIFT: f32 = 0.02;

/// The platform slab: a box centered on the origin with its top face at
/// z = 0, extending `thickness` downward. Six quads with outward normals.
pub fn platform_box(size: f32, thickness: f32) -> LayerGeometry {
    let half = size / 2.0;
    let (top, bottom) = (0.0, -thickness);
    let mut geometry = LayerGeometry::default();

    // Top and bottom.
    push_quad(
        &mut geometry,
        [
            Vector3::new(-half, -half, top),
            Vector3::new(half, -half, top),
            Vector3::new(half, half, top),
            Vector3::new(-half, half, top),
        ],
        Vector3::z(),
        PLATFORM_COLOR,
    );
    push_quad(
        &mut geometry,
        [
            Vector3::new(-half, -half, bottom),
            Vector3::new(-half, half, bottom),
            Vector3::new(half, half, bottom),
            Vector3::new(half, -half, bottom),
        ],
        -Vector3::z(),
        PLATFORM_COLOR,
    );

    // Four sides.
    let sides = [
        (Vector3::new(0.0, -1.0, 0.0), [(-half, -half), (half, -half)]),
        (Vector3::new(1.0, 0.0, 0.0), [(half, -half), (half, half)]),
        (Vector3::new(0.0, 1.0, 0.0), [(half, half), (-half, half)]),
        (Vector3::new(-1.0, 0.0, 0.0), [(-half, half), (-half, -half)]),
    ];
    for (normal, [(ax, ay), (bx, by)]) in sides {
        push_quad(
            &mut geometry,
            [
                Vector3::new(ax, ay, bottom),
                Vector3::new(ax, ay, top),
                Vector3::new(bx, by, top),
                Vector3::new(bx, by, bottom),
            ],
            normal,
            PLATFORM_COLOR,
        );
    }

    geometry
}

/// Grid lines over the platform at `pitch` spacing, as a line list.
pub fn platform_grid(size: f32, pitch: f32) -> LayerGeometry {
    let half = size / 2.0;
    let steps = (size / pitch).round() as i32;
    let mut geometry = LayerGeometry::default();

    for step in 0..=steps {
        let offset = -half + step as f32 * pitch;
        push_line(
            &mut geometry,
            Vector3::new(offset, -half, GRID_LIFT),
            Vector3::new(offset, half, GRID_LIFT),
            GRID_COLOR,
        );
        push_line(
            &mut geometry,
            Vector3::new(-half, offset, GRID_LIFT),
            Vector3::new(half, offset, GRID_LIFT),
            GRID_COLOR,
        );
    }

    geometry
}

/// The +X and +Y axes as flat ribbons from the platform center to its edge.
pub fn platform_axes(size: f32) -> LayerGeometry {
    let half = size / 2.0;
    let w = AXIS_WIDTH / 2.0;
    let mut geometry = LayerGeometry::default();

    push_quad(
        &mut geometry,
        [
            Vector3::new(0.0, -w, AXES_LIFT),
            Vector3::new(half, -w, AXES_LIFT),
            Vector3::new(half, w, AXES_LIFT),
            Vector3::new(0.0, w, AXES_LIFT),
        ],
        Vector3::z(),
        AXES_COLOR,
    );
    push_quad(
        &mut geometry,
        [
            Vector3::new(-w, 0.0, AXES_LIFT),
            Vector3::new(w, 0.0, AXES_LIFT),
            Vector3::new(w, half, AXES_LIFT),
            Vector3::new(-w, half, AXES_LIFT),
        ],
        Vector3::z(),
        AXES_COLOR,
    );

    geometry
}

/// The twelve edges of the build volume as a line list, from the platform
/// top to `height`.
pub fn boundary_wireframe(size: f32, height: f32) -> LayerGeometry {
    let half = size / 2.0;
    let corners = [(-half, -half), (half, -half), (half, half), (-half, half)];
    let mut geometry = LayerGeometry::default();

    for (i, &(x, y)) in corners.iter().enumerate() {
        let (nx, ny) = corners[(i + 1) % 4];
        // Bottom edge, top edge, vertical edge.
        push_line(
            &mut geometry,
            Vector3::new(x, y, 0.0),
            Vector3::new(nx, ny, 0.0),
            BOUNDARY_COLOR,
        );
        push_line(
            &mut geometry,
            Vector3::new(x, y, height),
            Vector3::new(nx, ny, height),
            BOUNDARY_COLOR,
        );
        push_line(
            &mut geometry,
            Vector3::new(x, y, 0.0),
            Vector3::new(x, y, height),
            BOUNDARY_COLOR,
        );
    }

    geometry
}

fn push_quad(
    geometry: &mut LayerGeometry,
    corners: [Vector3<f32>; 4],
    normal: Vector3<f32>,
    color: [f32; 4],
) {
    let base = geometry.vertices.len() as u32;
    for corner in corners {
        geometry.vertices.push(Vertex::new(corner, normal, color));
    }
    geometry
        .indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn push_line(geometry: &mut LayerGeometry, a: Vector3<f32>, b: Vector3<f32>, color: [f32; 4]) {
    let base = geometry.vertices.len() as u32;
    geometry.vertices.push(Vertex::new(a, Vector3::z(), color));
    geometry.vertices.push(Vertex::new(b, Vector3::z(), color));
    geometry.indices.extend_from_slice(&[base, base + 1]);
}
