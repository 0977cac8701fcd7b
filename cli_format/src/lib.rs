//! Data model for parsed CLI/CNC slice files. A [`Project`] is an ordered
//! stack of [`Layer`]s, each holding classified [`Region`]s of 2D polylines.
//! The parsers that populate this model live in the host application; the
//! geometry pipeline only ever reads it.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub mod header;

pub use header::{Header, ParameterTable};

/// A single slice coordinate in millimeters. Parser output may contain NaN
/// or infinite coordinates; consumers must filter before use.
pub type Point = Vector2<f32>;

/// An ordered run of points. Closed contour when used for filled regions
/// (needs at least 3 points), open or closed path for line regions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyLine {
    pub points: Vec<Point>,
}

/// Classification of a region's geometry within its layer. The pipeline
/// never re-derives topology; this tag is the whole truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryRegion {
    Infill,
    SupportFill,
    Support,
    Contour,
    ContourUpskin,
    ContourDownskin,
    Upskin,
    Downskin,
    Edges,
    None,
    UpskinRegionPreview,
    DownskinRegionPreview,
    InfillRegionPreview,
}

/// Whether a region's polylines are outlines or scan-fill hatch lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockType {
    PolyLine,
    Hatch,
}

/// A logical solid body spanning many layers, identified by a stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    pub id: i32,
}

/// Laser scan parameters attached to a region by the slicer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanParameters {
    /// Beam diameter in microns.
    pub laser_beam_diameter: f64,
    /// Laser power in watts.
    pub laser_power: f64,
    /// Scan speed in mm/s.
    pub laser_speed: f64,
    /// Distance between hatch lines in microns.
    pub hatch_distance: f64,
    /// Hatch angle in degrees.
    pub hatch_angle: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub geometry_region: GeometryRegion,
    pub block_type: BlockType,
    pub part: Option<Part>,
    pub parameters: Option<ScanParameters>,
    /// Total exposed path length in millimeters, summed by the parser.
    pub expose_length: f64,
    pub polylines: Vec<PolyLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    /// Absolute Z position of the layer top in millimeters. Some files omit
    /// it, leaving a near-zero value; consumers fall back to
    /// `index * layer thickness` in that case.
    pub height: f32,
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub header: Header,
    pub layers: Vec<Layer>,
}

impl Region {
    pub fn new(geometry_region: GeometryRegion, block_type: BlockType) -> Self {
        Self {
            geometry_region,
            block_type,
            part: None,
            parameters: None,
            expose_length: 0.0,
            polylines: Vec::new(),
        }
    }

    pub fn with_part(mut self, id: i32) -> Self {
        self.part = Some(Part { id });
        self
    }

    pub fn with_polyline(mut self, points: Vec<Point>) -> Self {
        self.polylines.push(PolyLine { points });
        self
    }
}

impl Project {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Uniform layer thickness in millimeters. CLI files store the slice
    /// thickness in microns, CNC files store a `layer_height` in
    /// millimeters; 0.05 mm is the fallback when neither is present.
    pub fn layer_thickness_mm(&self) -> f32 {
        if let Some(microns) = self.header.configuration.get_f64(header::keys::SLICE_THICKNESS) {
            return microns as f32 / 1000.0;
        }
        if let Some(mm) = self.header.configuration.get_f64(header::keys::LAYER_HEIGHT) {
            return mm as f32;
        }
        0.05
    }

    pub fn layer_thickness_microns(&self) -> f32 {
        self.layer_thickness_mm() * 1000.0
    }

    /// Total build height in millimeters assuming uniform thickness.
    pub fn project_height(&self) -> f32 {
        self.layer_thickness_mm() * self.layers.len() as f32
    }

    pub fn material_name(&self) -> String {
        self.header
            .configuration
            .get_str(header::keys::MATERIAL_NAME)
            .or_else(|| self.header.configuration.get_str(header::keys::MATERIAL))
            .unwrap_or("Unknown")
            .to_owned()
    }

    /// Parts declared in the file header, if the format carries them.
    pub fn parts(&self) -> Vec<Part> {
        self.header
            .info
            .get(header::keys::PARTS)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Estimated print time in seconds: exposed path length over scan speed,
    /// summed across every region that carries a valid speed.
    pub fn print_time_seconds(&self) -> f64 {
        self.layers
            .iter()
            .flat_map(|layer| &layer.regions)
            .filter_map(|region| {
                let parameters = region.parameters?;
                (parameters.laser_speed > 0.0)
                    .then(|| region.expose_length / parameters.laser_speed)
            })
            .sum()
    }
}
