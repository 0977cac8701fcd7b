//! View-frustum culling and camera-distance LOD selection for per-layer
//! meshes. Planes are extracted from the combined view-projection matrix;
//! tests are conservative (a partially visible bound is kept).

use nalgebra::{Matrix4, Vector3, Vector4};

/// Camera distances at which geometry steps down a detail level.
pub const LOD_NEAR_DISTANCE: f32 = 500.0;
pub const LOD_FAR_DISTANCE: f32 = 1000.0;

/// Axis-aligned bounds of one layer's geometry in build-space millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBounds {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl LayerBounds {
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) / 2.0
    }

    pub fn distance_to(&self, camera: Vector3<f32>) -> f32 {
        (self.center() - camera).norm()
    }
}

/// Six planes as `(normal, d)` with the normal pointing into the frustum:
/// a point is inside a plane when `normal · p + d >= 0`.
#[derive(Debug, Default)]
pub struct FrustumCuller {
    planes: [Vector4<f32>; 6],
}

impl FrustumCuller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-extracts the planes from a view-projection matrix. Left, right,
    /// bottom, top and far come from sums/differences of the last row with
    /// the others; near is the third row alone.
    pub fn update(&mut self, view_projection: &Matrix4<f32>) {
        let row = |i: usize| {
            Vector4::new(
                view_projection[(i, 0)],
                view_projection[(i, 1)],
                view_projection[(i, 2)],
                view_projection[(i, 3)],
            )
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        self.planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        for plane in &mut self.planes {
            let length = plane.xyz().norm();
            if length > 1e-6 {
                *plane /= length;
            }
        }
    }

    pub fn contains_point(&self, point: Vector3<f32>) -> bool {
        self.planes
            .iter()
            .all(|plane| signed_distance(plane, point) >= 0.0)
    }

    pub fn contains_sphere(&self, center: Vector3<f32>, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| signed_distance(plane, center) >= -radius)
    }

    /// Positive-vertex test: for each plane, check the box corner furthest
    /// along the plane normal. Rejects only boxes fully outside a plane.
    pub fn contains_box(&self, bounds: &LayerBounds) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Vector3::new(
                if plane.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            signed_distance(plane, positive) >= 0.0
        })
    }
}

fn signed_distance(plane: &Vector4<f32>, point: Vector3<f32>) -> f32 {
    plane.xyz().dot(&point) + plane.w
}

/// Detail level for a layer at the given camera distance: 0 is full detail,
/// 2 is the most aggressive reduction.
pub fn lod_level(distance: f32) -> u8 {
    if distance < LOD_NEAR_DISTANCE {
        0
    } else if distance < LOD_FAR_DISTANCE {
        1
    } else {
        2
    }
}
