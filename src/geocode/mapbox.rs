use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::coordinate;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::http::fetch_json;
use crate::models::GeocodeResult;

/// Mapbox forward geocoding (requires an access token).
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    endpoint: Url,
    token: String,
    timeout: Duration,
}

impl MapboxGeocoder {
    pub fn new(endpoint: Url, token: &str, timeout: Duration) -> Self {
        Self {
            endpoint,
            token: token.to_string(),
            timeout,
        }
    }

    /// `.../mapbox.places/{address}.json?limit=1&access_token=...`
    pub fn search_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{}.json", address));
        }
        url.query_pairs_mut()
            .append_pair("limit", "1")
            .append_pair("access_token", &self.token);
        url
    }

    /// `Ok(None)` when Mapbox has no match.
    pub async fn geocode(&self, client: &Client, address: &str) -> PipelineResult<Option<GeocodeResult>> {
        let json = fetch_json(client, &self.search_url(address), self.timeout)
            .await
            .map_err(|e| PipelineError::upstream(Stage::Geocode, e))?;
        parse_mapbox(&json).map_err(|detail| PipelineError::Malformed {
            stage: Stage::Geocode,
            detail,
        })
    }
}

/// First feature of a Mapbox feature collection. `center` is `[lon, lat]`.
pub fn parse_mapbox(json: &Value) -> Result<Option<GeocodeResult>, String> {
    let Some(feature) = json.get("features").and_then(|f| f.get(0)) else {
        return Ok(None);
    };
    let Some(center) = feature.get("center").and_then(Value::as_array) else {
        return Ok(None);
    };
    if center.len() < 2 {
        return Ok(None);
    }

    Ok(Some(GeocodeResult {
        lon: coordinate(center.first(), "center[0]")?,
        lat: coordinate(center.get(1), "center[1]")?,
        display_name: feature
            .get("place_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }))
}
