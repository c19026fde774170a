//! ArcGIS REST `query` requests and feature-set decoding.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::http::{fetch_json, redact_url, FetchError};
use crate::models::{Attributes, Position, Ring};

/// Geographic WGS84, used for both input and output geometry.
pub const WGS84_WKID: &str = "4326";

/// Spatial filter applied to a layer query.
#[derive(Debug, Clone, Copy)]
pub enum SpatialFilter<'a> {
    /// Features containing a point
    Point { lon: f64, lat: f64 },
    /// Features overlapping an esri polygon geometry
    Polygon(&'a Value),
}

/// What a layer query should return.
#[derive(Debug, Clone, Copy)]
pub struct LayerQuery<'a> {
    pub filter: SpatialFilter<'a>,
    pub return_geometry: bool,
    pub record_count: Option<u32>,
    pub count_only: bool,
}

impl<'a> LayerQuery<'a> {
    /// Attributes and geometry of the first feature containing the point.
    pub fn first_at_point(lon: f64, lat: f64) -> Self {
        Self {
            filter: SpatialFilter::Point { lon, lat },
            return_geometry: true,
            record_count: Some(1),
            count_only: false,
        }
    }

    /// Attributes, without geometry, of every feature touching the polygon.
    pub fn intersecting(geometry: &'a Value) -> Self {
        Self {
            filter: SpatialFilter::Polygon(geometry),
            return_geometry: false,
            record_count: None,
            count_only: false,
        }
    }

    /// Number of features touching the polygon.
    pub fn count_intersecting(geometry: &'a Value) -> Self {
        Self {
            count_only: true,
            ..Self::intersecting(geometry)
        }
    }

    /// Build the full query URL against a layer's `query` endpoint.
    pub fn to_url(&self, endpoint: &Url) -> Url {
        let (geometry, geometry_type) = match self.filter {
            SpatialFilter::Point { lon, lat } => (format!("{},{}", lon, lat), "esriGeometryPoint"),
            SpatialFilter::Polygon(polygon) => (polygon.to_string(), "esriGeometryPolygon"),
        };

        let mut url = endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("f", "json")
                .append_pair("where", "1=1")
                .append_pair("geometry", &geometry)
                .append_pair("geometryType", geometry_type)
                .append_pair("inSR", WGS84_WKID)
                .append_pair("spatialRel", "esriSpatialRelIntersects")
                .append_pair("outFields", "*")
                .append_pair(
                    "returnGeometry",
                    if self.return_geometry { "true" } else { "false" },
                );
            if self.return_geometry {
                pairs.append_pair("outSR", WGS84_WKID);
            }
            if let Some(n) = self.record_count {
                pairs.append_pair("resultRecordCount", &n.to_string());
            }
            if self.count_only {
                pairs.append_pair("returnCountOnly", "true");
            }
        }
        url
    }
}

/// Decoded `f=json` query response.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Present for `returnCountOnly` queries
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Option<Attributes>,
    #[serde(default)]
    pub geometry: Option<EsriGeometry>,
}

#[derive(Debug, Deserialize)]
pub struct EsriGeometry {
    /// Rings of `[x, y]` or `[x, y, z, m]` positions; z and m may be null
    #[serde(default)]
    pub rings: Option<Vec<Vec<Vec<Option<f64>>>>>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl Feature {
    /// First ring reduced to (x, y) positions, if it has any.
    pub fn outer_ring(&self) -> Option<Ring> {
        let ring: Ring = self
            .geometry
            .as_ref()?
            .rings
            .as_ref()?
            .first()?
            .iter()
            .filter_map(|p| -> Option<Position> {
                match p.as_slice() {
                    [Some(x), Some(y), ..] => Some([*x, *y]),
                    _ => None,
                }
            })
            .collect();
        (!ring.is_empty()).then_some(ring)
    }
}

/// Run one query against an ArcGIS layer.
///
/// An `{"error": ...}` body is reported as [`FetchError::Service`].
pub async fn query_layer(
    client: &Client,
    endpoint: &Url,
    query: &LayerQuery<'_>,
    timeout: Duration,
) -> Result<FeatureSet, FetchError> {
    let url = query.to_url(endpoint);
    let json = fetch_json(client, &url, timeout).await?;
    let set = decode_feature_set(json, &url)?;
    debug!(
        "{} returned {} features",
        endpoint.path(),
        set.count.unwrap_or(set.features.len() as u64)
    );
    Ok(set)
}

pub fn decode_feature_set(json: Value, url: &Url) -> Result<FeatureSet, FetchError> {
    if let Some(err) = json.get("error") {
        let err: ServiceError = serde_json::from_value(err.clone()).unwrap_or(ServiceError {
            code: 0,
            message: err.to_string(),
        });
        return Err(FetchError::Service {
            url: redact_url(url),
            code: err.code,
            message: err.message,
        });
    }

    serde_json::from_value(json).map_err(|e| FetchError::Shape {
        url: redact_url(url),
        detail: e.to_string(),
    })
}
