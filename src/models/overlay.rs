//! Results of the polygon-intersects stages.

use serde::Serialize;

use super::Attributes;

#[derive(Debug, Clone, Serialize)]
pub struct ZoningResult {
    /// Zoning code, "UNKNOWN" when nothing matched
    pub code: String,
    /// Attributes of the first intersecting zoning feature
    pub raw: Option<Attributes>,
}

/// A sewer/utility feature crossing the parcel.
#[derive(Debug, Clone, Serialize)]
pub struct UtilityFeature {
    pub diameter: Option<f64>,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub raw: Attributes,
}

/// Utility features in source order.
#[derive(Debug, Clone, Serialize)]
pub struct UtilitySummary {
    pub count: usize,
    pub features: Vec<UtilityFeature>,
}

impl UtilitySummary {
    pub fn new(features: Vec<UtilityFeature>) -> Self {
        Self {
            count: features.len(),
            features,
        }
    }
}

/// Count of features from an optional constraint layer touching the parcel.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintLayer {
    pub key: String,
    pub label: String,
    /// None when the overlay query failed
    pub feature_count: Option<u64>,
    pub layer_name: String,
    pub layer_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
