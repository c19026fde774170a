//! Geocode and parcel records produced by the first two stages.

use serde::Serialize;
use serde_json::{Map, Value};

/// One (longitude, latitude) vertex.
pub type Position = [f64; 2];

/// Closed ring of positions, first equal to last.
pub type Ring = Vec<Position>;

/// Opaque attribute bag as returned by the source service.
pub type Attributes = Map<String, Value>;

/// Sentinel used when an identifier attribute is absent.
pub const UNKNOWN: &str = "UNKNOWN";

/// Resolved coordinates for a free-text address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Cadastral land unit containing the geocoded point.
///
/// Only the outer ring of the boundary is kept; holes are dropped.
#[derive(Debug, Clone, Serialize)]
pub struct Parcel {
    /// Erf / parcel number, or [`UNKNOWN`]
    pub erf: String,
    /// Area in square metres as reported by the source, or 0
    pub area: f64,
    /// Street address label
    pub address: String,
    pub attributes: Attributes,
    /// Boundary rings; always exactly one outer ring
    pub rings: Vec<Ring>,
}

impl Parcel {
    pub fn outer_ring(&self) -> &[Position] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Boundary as an ArcGIS polygon geometry in WGS84.
    pub fn esri_geometry(&self) -> Value {
        serde_json::json!({
            "rings": self.rings,
            "spatialReference": { "wkid": 4326 }
        })
    }
}
