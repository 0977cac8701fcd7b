//! Turns classified layer regions into printable-material geometry: bottom
//! cap, vertical contour walls and a top cap on the topmost layer, with the
//! color channels doubling as shader inputs. Supports both an incremental
//! per-layer mode and a whole-project pass.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use cli_format::{BlockType, GeometryRegion, Layer, Point, Project};
use itertools::Itertools;
use nalgebra::Vector3;
use tracing::trace;

use crate::context::{bounding_circle, BufferPool, GeometryContext};
use crate::simplify::simplify;
use crate::triangulate::{
    is_counter_clockwise, largest_outer_contour, triangulate, unified_convex_hull,
};
use crate::zcache::{LayerZCache, MIN_VALID_HEIGHT};
use crate::LayerGeometry;

/// Width of the flat ribbons used for current-layer outlines, in mm.
pub const THIN_LINE_WIDTH: f32 = 0.2;

/// Cosmetic brightness falloff from the center of the visible geometry to
/// its edge: `1.2 - 0.6 * min(d / max_radius, 1)`, applied to RGB only. The
/// alpha channel carries the part id and is never touched.
#[derive(Debug, Clone, Copy)]
pub struct RadialGradient {
    pub center: Point,
    pub max_radius: f32,
}

impl RadialGradient {
    /// A gradient that leaves colors unchanged.
    pub fn none() -> Self {
        Self {
            center: Point::new(0.0, 0.0),
            max_radius: 0.0,
        }
    }

    pub fn apply(&self, point: Point, color: [f32; 4]) -> [f32; 4] {
        if self.max_radius <= 0.0 {
            return color;
        }

        let distance = (point - self.center).norm();
        let intensity = 1.2 - 0.6 * (distance / self.max_radius).min(1.0);
        [
            color[0] * intensity,
            color[1] * intensity,
            color[2] * intensity,
            color[3],
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Contour decimation tolerance in mm.
    pub simplification_tolerance: f32,
    /// 0 = full detail. At 2 only the largest outer ring of each part is
    /// extruded; at 3 and above every fragment of a part collapses into
    /// one convex hull ring.
    pub lod_level: u8,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            simplification_tolerance: 0.5,
            lod_level: 0,
        }
    }
}

/// Builds layer geometry against a shared buffer pool. Owns the Z cache, so
/// one builder serves one project at a time; create a fresh builder (or
/// invalidate the cache) when switching projects.
pub struct LayerMeshBuilder {
    pool: Arc<BufferPool>,
    z_cache: LayerZCache,
}

impl Default for LayerMeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerMeshBuilder {
    pub fn new() -> Self {
        Self::with_pool(BufferPool::new())
    }

    pub fn with_pool(pool: Arc<BufferPool>) -> Self {
        Self {
            pool,
            z_cache: LayerZCache::new(),
        }
    }

    pub fn invalidate_z_cache(&mut self) {
        self.z_cache.invalidate();
    }

    /// The gradient covering every point in the first `layer_count` layers.
    pub fn project_gradient(project: &Project, layer_count: usize) -> RadialGradient {
        let count = layer_count.min(project.layer_count());
        let points = project.layers[..count]
            .iter()
            .flat_map(|layer| &layer.regions)
            .flat_map(|region| &region.polylines)
            .flat_map(|polyline| &polyline.points);

        let (center, max_radius) = bounding_circle(points);
        RadialGradient { center, max_radius }
    }

    /// Builds one layer's own geometry with local indices starting at zero:
    /// walls for every relevant contour, a bottom cap when this is layer 0
    /// and a top cap when `is_last_layer`. Returns empty geometry for
    /// out-of-range indices or layers with no relevant contours.
    pub fn build_single_layer(
        &mut self,
        project: &Project,
        layer_index: usize,
        is_last_layer: bool,
        gradient: RadialGradient,
        options: &BuildOptions,
    ) -> LayerGeometry {
        let Some((z_bottom, z_top)) = self.z_cache.z_range(project, layer_index) else {
            return LayerGeometry::default();
        };

        let mut context = GeometryContext::new(self.pool.clone());
        build_layer_into(
            &mut context,
            &project.layers[layer_index],
            z_bottom,
            z_top,
            layer_index == 0,
            is_last_layer,
            gradient,
            options,
        );

        if context.is_empty() {
            LayerGeometry::default()
        } else {
            context.to_geometry()
        }
    }

    /// Builds caps and walls for every layer from 0 through
    /// `max_layer_index` into one geometry. The bottom cap goes on the
    /// first layer that has relevant contours and the top cap on the last
    /// such layer; the model stays hollow in between.
    pub fn build_printed_layers(
        &mut self,
        project: &Project,
        max_layer_index: usize,
        options: &BuildOptions,
    ) -> LayerGeometry {
        let count = max_layer_index.saturating_add(1).min(project.layer_count());
        if count == 0 {
            return LayerGeometry::default();
        }

        let gradient = Self::project_gradient(project, count);
        let content: Vec<usize> = (0..count)
            .filter(|&index| layer_has_content(&project.layers[index]))
            .collect();
        let (Some(&first), Some(&last)) = (content.first(), content.last()) else {
            return LayerGeometry::default();
        };

        let mut context = GeometryContext::new(self.pool.clone());
        for index in content {
            let Some((z_bottom, z_top)) = self.z_cache.z_range(project, index) else {
                break;
            };
            trace!(layer = index, z_bottom, z_top, "building layer");
            build_layer_into(
                &mut context,
                &project.layers[index],
                z_bottom,
                z_top,
                index == first,
                index == last,
                gradient,
                options,
            );
        }

        if context.is_empty() {
            LayerGeometry::default()
        } else {
            context.to_geometry()
        }
    }

    /// Flat outline ribbons for the layer currently being printed, at
    /// height `z`. Covers contour and edge polylines as well as hatch scan
    /// lines, drawn as 0.2 mm quads so they survive at distance.
    pub fn build_layer_outlines(&self, project: &Project, layer_index: usize, z: f32) -> LayerGeometry {
        let Some(layer) = project.layers.get(layer_index) else {
            return LayerGeometry::default();
        };

        let mut context = GeometryContext::new(self.pool.clone());
        for region in &layer.regions {
            if !is_outline_region(region.geometry_region) && region.block_type != BlockType::Hatch {
                continue;
            }

            let alpha = part_alpha(region.part.map(|part| part.id).unwrap_or(1));
            let color = [1.0, 0.0, 0.0, alpha];
            for polyline in &region.polylines {
                for (&a, &b) in polyline.points.iter().tuple_windows() {
                    add_thin_line(&mut context, a, b, z, color);
                }
            }
        }

        if context.is_empty() {
            LayerGeometry::default()
        } else {
            context.to_geometry()
        }
    }

    /// Outline ribbons for every layer up to `max_layer_index`, each at its
    /// own height.
    pub fn build_all_outlines(&self, project: &Project, max_layer_index: usize) -> LayerGeometry {
        let count = max_layer_index.saturating_add(1).min(project.layer_count());
        let thickness = project.layer_thickness_mm();

        let layers = (0..count).filter_map(|index| {
            let height = project.layers[index].height;
            let z = if height >= MIN_VALID_HEIGHT {
                height
            } else {
                index as f32 * thickness
            };
            let geometry = self.build_layer_outlines(project, index, z);
            (!geometry.is_empty()).then_some(geometry)
        });

        LayerGeometry::merge(layers).unwrap_or_default()
    }
}

fn part_alpha(part_id: i32) -> f32 {
    part_id as f32 / 255.0
}

fn is_fill_region(region: GeometryRegion) -> bool {
    matches!(
        region,
        GeometryRegion::Infill
            | GeometryRegion::Upskin
            | GeometryRegion::Downskin
            | GeometryRegion::InfillRegionPreview
            | GeometryRegion::UpskinRegionPreview
            | GeometryRegion::DownskinRegionPreview
    )
}

fn is_contour_region(region: GeometryRegion) -> bool {
    matches!(
        region,
        GeometryRegion::Contour | GeometryRegion::ContourUpskin | GeometryRegion::ContourDownskin
    )
}

fn is_outline_region(region: GeometryRegion) -> bool {
    is_contour_region(region) || region == GeometryRegion::Edges
}

/// Part ids that have solid content on this layer. A contour with no infill
/// or hatch behind it is structural only and gets no walls.
fn relevant_parts(layer: &Layer) -> HashSet<i32> {
    layer
        .regions
        .iter()
        .filter(|region| {
            is_fill_region(region.geometry_region) || region.block_type == BlockType::Hatch
        })
        .map(|region| region.part.map(|part| part.id).unwrap_or(0))
        .collect()
}

/// Contour polylines grouped by part id, filtered to parts with solid
/// content. BTreeMap keeps the emission order deterministic.
fn contour_groups(layer: &Layer) -> BTreeMap<i32, Vec<&[Point]>> {
    let relevant = relevant_parts(layer);

    let mut groups: BTreeMap<i32, Vec<&[Point]>> = BTreeMap::new();
    for region in &layer.regions {
        if !is_contour_region(region.geometry_region) || region.block_type != BlockType::PolyLine {
            continue;
        }

        let part_id = region.part.map(|part| part.id).unwrap_or(0);
        if !relevant.contains(&part_id) {
            continue;
        }

        groups.entry(part_id).or_default().extend(
            region
                .polylines
                .iter()
                .map(|polyline| polyline.points.as_slice())
                .filter(|points| points.len() >= 3),
        );
    }

    groups.retain(|_, contours| !contours.is_empty());
    groups
}

fn layer_has_content(layer: &Layer) -> bool {
    !contour_groups(layer).is_empty()
}

#[allow(clippy::too_many_arguments)]
fn build_layer_into(
    context: &mut GeometryContext,
    layer: &Layer,
    z_bottom: f32,
    z_top: f32,
    is_first_layer: bool,
    is_last_layer: bool,
    gradient: RadialGradient,
    options: &BuildOptions,
) {
    let tolerance = options.simplification_tolerance;

    for (part_id, contours) in contour_groups(layer) {
        let alpha = part_alpha(part_id);

        let rings: Vec<Vec<Point>> = if options.lod_level >= 3 {
            unified_convex_hull(contours.iter().copied(), tolerance)
                .into_iter()
                .collect()
        } else if options.lod_level == 2 {
            largest_outer_contour(contours.iter().copied(), tolerance)
                .into_iter()
                .collect()
        } else {
            contours
                .iter()
                .map(|contour| simplify(contour, tolerance))
                .filter(|ring| ring.len() >= 3)
                .collect()
        };

        if is_first_layer {
            for ring in rings.iter().filter(|ring| is_counter_clockwise(ring)) {
                add_cap(context, ring, z_bottom, -Vector3::z(), |point| {
                    gradient.apply(point, [0.0, 0.0, 0.0, alpha])
                });
            }
        }

        let last_flag = if is_last_layer { 1.0 } else { 0.0 };
        for ring in &rings {
            for (&a, &b) in ring.iter().circular_tuple_windows() {
                let color = [last_flag, 0.0, 0.0, alpha];
                context.add_wall_segment(
                    a,
                    b,
                    z_bottom,
                    z_top,
                    gradient.apply(a, color),
                    gradient.apply(b, color),
                );
            }
        }

        if is_last_layer {
            for ring in rings.iter().filter(|ring| is_counter_clockwise(ring)) {
                add_cap(context, ring, z_top, Vector3::z(), |point| {
                    gradient.apply(point, [1.0, 0.0, 0.0, alpha])
                });
            }
        }
    }
}

/// Triangulates a contour into a horizontal cap at height `z`.
fn add_cap(
    context: &mut GeometryContext,
    ring: &[Point],
    z: f32,
    normal: Vector3<f32>,
    mut color: impl FnMut(Point) -> [f32; 4],
) {
    let triangles = triangulate(ring);
    if triangles.is_empty() {
        return;
    }

    context.ensure_vertex_capacity(ring.len());
    context.ensure_index_capacity(triangles.len());

    let base = context.vertices.len() as u32;
    for &point in ring {
        let color = color(point);
        context.add_vertex(Vector3::new(point.x, point.y, z), normal, color);
    }
    context.indices.extend(triangles.iter().map(|index| base + index));
}

/// A flat quad ribbon from `a` to `b` at height `z`. Segments shorter than
/// a tenth of a micron are dropped.
fn add_thin_line(context: &mut GeometryContext, a: Point, b: Point, z: f32, color: [f32; 4]) {
    let edge = b - a;
    let length = edge.norm();
    if length < 1e-4 {
        return;
    }

    let offset = Point::new(-edge.y, edge.x) / length * (THIN_LINE_WIDTH / 2.0);
    context.add_quad(
        [
            Vector3::new(a.x - offset.x, a.y - offset.y, z),
            Vector3::new(a.x + offset.x, a.y + offset.y, z),
            Vector3::new(b.x + offset.x, b.y + offset.y, z),
            Vector3::new(b.x - offset.x, b.y - offset.y, z),
        ],
        Vector3::z(),
        [color; 4],
    );
}

#[cfg(test)]
mod tests {
    use cli_format::{BlockType, GeometryRegion, Layer, Point, Project, Region};

    use super::*;

    fn square_points() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    fn square_layer(part_id: i32) -> Layer {
        Layer {
            height: 0.0,
            regions: vec![
                Region::new(GeometryRegion::Contour, BlockType::PolyLine)
                    .with_part(part_id)
                    .with_polyline(square_points()),
                Region::new(GeometryRegion::Infill, BlockType::Hatch).with_part(part_id),
            ],
        }
    }

    fn square_project(layers: usize) -> Project {
        let mut project = Project::default();
        project.layers = (0..layers).map(|_| square_layer(1)).collect();
        project
    }

    #[test]
    fn single_layer_square_produces_cap_and_walls() {
        let project = square_project(1);
        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_single_layer(
            &project,
            0,
            false,
            RadialGradient::none(),
            &BuildOptions::default(),
        );

        // Bottom cap: 4 vertices, 2 triangles. Walls: 4 quads of 4 vertices
        // and 6 indices each.
        assert_eq!(geometry.vertices.len(), 20);
        assert_eq!(geometry.indices.len(), 30);

        for vertex in &geometry.vertices {
            assert_eq!(vertex.color[0], 0.0);
            assert!((vertex.color[3] - 1.0 / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn topmost_layer_gets_a_flagged_top_cap() {
        let project = square_project(1);
        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_single_layer(
            &project,
            0,
            true,
            RadialGradient::none(),
            &BuildOptions::default(),
        );

        // Cap + walls + top cap.
        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.indices.len(), 36);

        let top_cap: Vec<_> = geometry
            .vertices
            .iter()
            .filter(|v| v.normal == [0.0, 0.0, 1.0])
            .collect();
        assert_eq!(top_cap.len(), 4);
        for vertex in top_cap {
            assert_eq!(vertex.color[0], 1.0);
            assert_eq!(vertex.position[2], 0.05);
        }
    }

    #[test]
    fn contour_without_solid_content_is_skipped() {
        let mut project = Project::default();
        project.layers.push(Layer {
            height: 0.0,
            regions: vec![
                Region::new(GeometryRegion::Contour, BlockType::PolyLine)
                    .with_part(1)
                    .with_polyline(square_points()),
                // Fill belongs to a different part.
                Region::new(GeometryRegion::Infill, BlockType::Hatch).with_part(2),
            ],
        });

        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_single_layer(
            &project,
            0,
            false,
            RadialGradient::none(),
            &BuildOptions::default(),
        );
        assert!(geometry.is_empty());
    }

    #[test]
    fn out_of_range_layer_is_empty() {
        let project = square_project(1);
        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_single_layer(
            &project,
            5,
            false,
            RadialGradient::none(),
            &BuildOptions::default(),
        );
        assert!(geometry.is_empty());
    }

    #[test]
    fn whole_project_caps_only_the_ends() {
        let project = square_project(3);
        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_printed_layers(&project, 2, &BuildOptions::default());

        // One bottom cap, three layers of walls, one top cap.
        assert_eq!(geometry.vertices.len(), 4 + 3 * 16 + 4);
        assert_eq!(geometry.indices.len(), 6 + 3 * 24 + 6);

        // Top cap plus the topmost layer's walls carry the flag. The
        // gradient scales R to at least 0.6, so flagged stays above 0.5.
        let flagged = geometry
            .vertices
            .iter()
            .filter(|v| v.color[0] > 0.5)
            .count();
        assert_eq!(flagged, 4 + 16);
    }

    #[test]
    fn max_layer_index_truncates_the_build() {
        let project = square_project(3);
        let mut builder = LayerMeshBuilder::new();
        let geometry = builder.build_printed_layers(&project, 0, &BuildOptions::default());
        assert_eq!(geometry.vertices.len(), 4 + 16 + 4);
    }

    #[test]
    fn aggressive_lod_extrudes_one_ring_per_part() {
        let small: Vec<Point> = square_points().iter().map(|p| p * 0.2).collect();
        let mut project = Project::default();
        project.layers.push(Layer {
            height: 0.0,
            regions: vec![
                Region::new(GeometryRegion::Contour, BlockType::PolyLine)
                    .with_part(1)
                    .with_polyline(square_points())
                    .with_polyline(small),
                Region::new(GeometryRegion::Infill, BlockType::Hatch).with_part(1),
            ],
        });

        let mut builder = LayerMeshBuilder::new();
        let options = BuildOptions {
            lod_level: 2,
            ..Default::default()
        };
        let full = builder.build_single_layer(&project, 0, false, RadialGradient::none(), &options);

        // Only the 10 mm ring survives: its cap plus 4 wall quads.
        assert_eq!(full.vertices.len(), 4 + 16);
    }

    #[test]
    fn hull_lod_collapses_fragments_to_one_ring() {
        let right: Vec<Point> = square_points()
            .iter()
            .map(|p| p + Point::new(20.0, 0.0))
            .collect();
        let mut project = Project::default();
        project.layers.push(Layer {
            height: 0.0,
            regions: vec![
                Region::new(GeometryRegion::Contour, BlockType::PolyLine)
                    .with_part(1)
                    .with_polyline(square_points())
                    .with_polyline(right),
                Region::new(GeometryRegion::Infill, BlockType::Hatch).with_part(1),
            ],
        });

        let mut builder = LayerMeshBuilder::new();
        let options = BuildOptions {
            lod_level: 3,
            ..Default::default()
        };
        let geometry =
            builder.build_single_layer(&project, 0, false, RadialGradient::none(), &options);

        // The hull of both squares is one 30x10 rectangle: its cap plus 4
        // wall quads, instead of two caps and 8 quads at full detail.
        assert_eq!(geometry.vertices.len(), 4 + 16);
        assert_eq!(geometry.indices.len(), 6 + 24);
    }

    #[test]
    fn huge_max_layer_index_saturates_instead_of_panicking() {
        let project = square_project(2);
        let mut builder = LayerMeshBuilder::new();

        let solid = builder.build_printed_layers(&project, usize::MAX, &BuildOptions::default());
        assert_eq!(solid.vertices.len(), 4 + 2 * 16 + 4);

        let outlines = builder.build_all_outlines(&project, usize::MAX);
        assert_eq!(outlines.vertices.len(), 2 * 3 * 4);
    }

    #[test]
    fn gradient_scales_rgb_and_preserves_alpha() {
        let gradient = RadialGradient {
            center: Point::new(0.0, 0.0),
            max_radius: 10.0,
        };

        let at_center = gradient.apply(Point::new(0.0, 0.0), [0.5, 0.5, 0.5, 0.3]);
        assert_eq!(at_center, [0.6, 0.6, 0.6, 0.3]);

        let at_edge = gradient.apply(Point::new(10.0, 0.0), [0.5, 0.5, 0.5, 0.3]);
        assert!((at_edge[0] - 0.3).abs() < 1e-6);
        assert_eq!(at_edge[3], 0.3);

        assert_eq!(
            RadialGradient::none().apply(Point::new(3.0, 4.0), [0.5; 4]),
            [0.5; 4]
        );
    }

    #[test]
    fn outline_ribbons_per_segment() {
        let mut project = Project::default();
        project.layers.push(Layer {
            height: 0.0,
            regions: vec![Region::new(GeometryRegion::Contour, BlockType::PolyLine)
                .with_part(3)
                .with_polyline(vec![
                    Point::new(0.0, 0.0),
                    Point::new(10.0, 0.0),
                    Point::new(10.0, 10.0),
                ])],
        });

        let builder = LayerMeshBuilder::new();
        let geometry = builder.build_layer_outlines(&project, 0, 0.1);

        // Two open segments, one quad each.
        assert_eq!(geometry.vertices.len(), 8);
        assert_eq!(geometry.indices.len(), 12);
        for vertex in &geometry.vertices {
            assert_eq!(vertex.color[0], 1.0);
            assert!((vertex.color[3] - 3.0 / 255.0).abs() < 1e-6);
            assert_eq!(vertex.position[2], 0.1);
        }
    }

    #[test]
    fn all_outlines_stack_layers_at_their_heights() {
        let mut project = square_project(2);
        project.layers[1].height = 0.25;

        let builder = LayerMeshBuilder::new();
        let geometry = builder.build_all_outlines(&project, 1);

        // 4 closed-contour points make 3 open segments per layer.
        assert_eq!(geometry.vertices.len(), 2 * 3 * 4);
        let heights: Vec<f32> = geometry.vertices.iter().map(|v| v.position[2]).collect();
        assert!(heights[..12].iter().all(|&z| z == 0.0));
        assert!(heights[12..].iter().all(|&z| z == 0.25));
    }
}
