//! Untyped key/value tables parsed from CLI/CNC file headers. The set of
//! keys varies per format, so values stay as JSON until a typed accessor
//! pulls them out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known header keys shared by the CLI and CNC parsers.
pub mod keys {
    /// Slice thickness in microns (CLI).
    pub const SLICE_THICKNESS: &str = "SliceThickness";
    /// Layer height in millimeters (CNC).
    pub const LAYER_HEIGHT: &str = "layer_height";
    pub const MATERIAL_NAME: &str = "MaterialName";
    pub const MATERIAL: &str = "material";
    pub const PARTS: &str = "Parts";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    /// File-level metadata (part list, project name, ...).
    pub info: ParameterTable,
    /// Machine/process configuration (thickness, material, ...).
    pub configuration: ParameterTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterTable(HashMap<String, Value>);

impl ParameterTable {
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_f64()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn typed_accessors() {
        let mut table = ParameterTable::default();
        table.insert("thickness", json!(50));
        table.insert("material", json!("Ti64"));

        assert_eq!(table.get_f64("thickness"), Some(50.0));
        assert_eq!(table.get_i64("thickness"), Some(50));
        assert_eq!(table.get_str("material"), Some("Ti64"));
        assert_eq!(table.get_f64("missing"), None);
        assert!(table.contains_key("material"));
    }
}
