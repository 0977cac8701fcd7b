//! Triangle-stride decimation for distant geometry. Keeping every Nth
//! triangle and compacting the vertex set is crude but cheap, and at the
//! camera distances where it kicks in the dropouts are not visible.

use std::collections::BTreeMap;

use crate::LayerGeometry;

/// Stride over the triangle list for the LOD level: one of every `2^lod`
/// triangles is kept.
pub fn decimation_factor(lod_level: u8) -> usize {
    1 << lod_level
}

/// Keeps every `factor`th triangle and drops vertices no surviving triangle
/// references. Geometry with fewer than two triangles, or a factor of one,
/// passes through unchanged.
pub fn decimate(geometry: &LayerGeometry, factor: usize) -> LayerGeometry {
    if factor <= 1 || geometry.indices.len() < 6 {
        return geometry.clone();
    }

    let kept: Vec<u32> = geometry
        .indices
        .chunks_exact(3)
        .step_by(factor)
        .flatten()
        .copied()
        .collect();

    // Old index -> compacted index, in ascending order.
    let mut remap = BTreeMap::new();
    for &index in &kept {
        let next = remap.len() as u32;
        remap.entry(index).or_insert(next);
    }

    let mut vertices = vec![Default::default(); remap.len()];
    for (&old, &new) in &remap {
        vertices[new as usize] = geometry.vertices[old as usize];
    }

    LayerGeometry {
        vertices,
        indices: kept.iter().map(|index| remap[index]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::Vertex;

    fn strip(triangles: usize) -> LayerGeometry {
        let vertices = (0..triangles as u32 + 2)
            .map(|i| {
                Vertex::new(
                    Vector3::new(i as f32, (i % 2) as f32, 0.0),
                    Vector3::z(),
                    [0.0; 4],
                )
            })
            .collect();
        let indices = (0..triangles as u32)
            .flat_map(|i| [i, i + 1, i + 2])
            .collect();
        LayerGeometry { vertices, indices }
    }

    #[test]
    fn factor_per_level() {
        assert_eq!(decimation_factor(0), 1);
        assert_eq!(decimation_factor(1), 2);
        assert_eq!(decimation_factor(2), 4);
    }

    #[test]
    fn factor_one_is_identity() {
        let geometry = strip(8);
        let decimated = decimate(&geometry, 1);
        assert_eq!(decimated.indices, geometry.indices);
        assert_eq!(decimated.vertices.len(), geometry.vertices.len());
    }

    #[test]
    fn keeps_every_nth_triangle() {
        let geometry = strip(8);
        let decimated = decimate(&geometry, 2);
        assert_eq!(decimated.indices.len(), 4 * 3);

        // Triangles 0, 2, 4, 6 survive with their original positions.
        let first: Vec<f32> = decimated.indices[..3]
            .iter()
            .map(|&i| decimated.vertices[i as usize].position[0])
            .collect();
        assert_eq!(first, vec![0.0, 1.0, 2.0]);
        let second: Vec<f32> = decimated.indices[3..6]
            .iter()
            .map(|&i| decimated.vertices[i as usize].position[0])
            .collect();
        assert_eq!(second, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn compacts_to_exactly_the_referenced_vertices() {
        let geometry = strip(8);
        let decimated = decimate(&geometry, 4);

        // Triangles 0 and 4 reference vertices {0,1,2} and {4,5,6}.
        assert_eq!(decimated.vertices.len(), 6);
        assert!(decimated
            .indices
            .iter()
            .all(|&i| (i as usize) < decimated.vertices.len()));

        let xs: Vec<f32> = decimated.vertices.iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn tiny_geometry_passes_through() {
        let geometry = strip(1);
        let decimated = decimate(&geometry, 4);
        assert_eq!(decimated.indices, geometry.indices);
    }
}
