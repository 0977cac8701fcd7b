//! Memoized per-layer Z boundaries. Layer heights in the source files are
//! unreliable: valid files carry the absolute top height of every layer,
//! but many leave it at zero, in which case the boundary falls back to
//! `(index + 1) * layer thickness`.

use cli_format::Project;
use tracing::debug;

/// Heights below this are treated as "not present" in the file.
pub const MIN_VALID_HEIGHT: f32 = 0.001;

/// Caches the Z boundary above each layer. `boundaries[i]` is the top of
/// layer `i - 1` (and the bottom of layer `i`), with `boundaries[0] == 0`.
/// Owned by whoever drives the builds; keyed only on layer count, so it
/// must be invalidated by the caller when a different project is loaded
/// with the same number of layers.
#[derive(Debug, Default)]
pub struct LayerZCache {
    boundaries: Vec<f32>,
}

impl LayerZCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `(bottom, top)` Z range of a layer in millimeters, or `None`
    /// when the index is out of range.
    pub fn z_range(&mut self, project: &Project, layer_index: usize) -> Option<(f32, f32)> {
        if layer_index >= project.layer_count() {
            return None;
        }

        self.rebuild_if_needed(project);
        Some((self.boundaries[layer_index], self.boundaries[layer_index + 1]))
    }

    /// Drops the memoized boundaries. Call when the project changes in a
    /// way the layer count does not reflect.
    pub fn invalidate(&mut self) {
        self.boundaries.clear();
    }

    fn rebuild_if_needed(&mut self, project: &Project) {
        let count = project.layer_count();
        if self.boundaries.len() == count + 1 {
            return;
        }

        debug!(layers = count, "rebuilding layer z cache");
        let thickness = project.layer_thickness_mm();

        self.boundaries.clear();
        self.boundaries.reserve(count + 1);
        self.boundaries.push(0.0);
        for (index, layer) in project.layers.iter().enumerate() {
            let top = if layer.height >= MIN_VALID_HEIGHT {
                layer.height
            } else {
                (index + 1) as f32 * thickness
            };
            self.boundaries.push(top);
        }
    }
}

#[cfg(test)]
mod tests {
    use cli_format::{header::keys, Layer, Project};
    use serde_json::json;

    use super::*;

    fn project(layer_heights: &[f32], thickness_microns: f64) -> Project {
        let mut project = Project::default();
        project
            .header
            .configuration
            .insert(keys::SLICE_THICKNESS, json!(thickness_microns));
        project.layers = layer_heights
            .iter()
            .map(|&height| Layer {
                height,
                regions: Vec::new(),
            })
            .collect();
        project
    }

    #[test]
    fn falls_back_to_index_times_thickness() {
        let project = project(&[0.0, 0.0, 0.0], 50.0);
        let mut cache = LayerZCache::new();

        assert_eq!(cache.z_range(&project, 0), Some((0.0, 0.05)));
        assert_eq!(cache.z_range(&project, 1), Some((0.05, 0.1)));
        assert_eq!(cache.z_range(&project, 2), Some((0.1, 0.15)));
    }

    #[test]
    fn uses_heights_from_the_file_when_valid() {
        let project = project(&[0.03, 0.07, 0.12], 50.0);
        let mut cache = LayerZCache::new();

        assert_eq!(cache.z_range(&project, 0), Some((0.0, 0.03)));
        assert_eq!(cache.z_range(&project, 1), Some((0.03, 0.07)));
        assert_eq!(cache.z_range(&project, 2), Some((0.07, 0.12)));
    }

    #[test]
    fn rebuilds_when_the_layer_count_changes() {
        let mut cache = LayerZCache::new();
        let short = project(&[0.0], 50.0);
        assert_eq!(cache.z_range(&short, 0), Some((0.0, 0.05)));

        let long = project(&[0.0, 0.0], 100.0);
        assert_eq!(cache.z_range(&long, 1), Some((0.1, 0.2)));
    }

    #[test]
    fn out_of_range_index_is_none() {
        let project = project(&[0.0], 50.0);
        let mut cache = LayerZCache::new();
        assert_eq!(cache.z_range(&project, 1), None);
        assert_eq!(cache.z_range(&Project::default(), 0), None);
    }
}
