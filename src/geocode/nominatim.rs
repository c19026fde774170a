use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::coordinate;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::http::fetch_json;
use crate::models::GeocodeResult;

/// OpenStreetMap Nominatim search. Keyless, but requires a user agent.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    endpoint: Url,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn search_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("q", address);
        url
    }

    /// `Ok(None)` when Nominatim has no match.
    pub async fn geocode(&self, client: &Client, address: &str) -> PipelineResult<Option<GeocodeResult>> {
        let json = fetch_json(client, &self.search_url(address), self.timeout)
            .await
            .map_err(|e| PipelineError::upstream(Stage::Geocode, e))?;
        parse_nominatim(&json).map_err(|detail| PipelineError::Malformed {
            stage: Stage::Geocode,
            detail,
        })
    }
}

/// First hit of a Nominatim `format=json` result array.
pub fn parse_nominatim(json: &Value) -> Result<Option<GeocodeResult>, String> {
    let hits = json
        .as_array()
        .ok_or_else(|| "expected a JSON array of results".to_string())?;
    let Some(hit) = hits.first() else {
        return Ok(None);
    };

    Ok(Some(GeocodeResult {
        lat: coordinate(hit.get("lat"), "lat")?,
        lon: coordinate(hit.get("lon"), "lon")?,
        display_name: hit
            .get("display_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_url() {
        let geocoder = NominatimGeocoder::new(
            Url::parse("https://nominatim.openstreetmap.org/search").unwrap(),
            Duration::from_secs(15),
        );
        let url = geocoder.search_url("716 Musgrave Road, Durban");
        assert_eq!(
            url.query(),
            Some("format=json&limit=1&q=716+Musgrave+Road%2C+Durban")
        );
    }

    #[test]
    fn test_parse_string_coordinates() {
        let json = json!([{ "lat": "-29.8200", "lon": "31.0000", "display_name": "Gainsborough Drive, Durban" }]);
        let hit = parse_nominatim(&json).unwrap().unwrap();
        assert_eq!(hit.lat, -29.82);
        assert_eq!(hit.lon, 31.0);
    }

    #[test]
    fn test_empty_results() {
        assert!(parse_nominatim(&json!([])).unwrap().is_none());
    }

    #[test]
    fn test_malformed_results() {
        assert!(parse_nominatim(&json!({ "error": "bad" })).is_err());
        assert!(parse_nominatim(&json!([{ "lat": "NaN", "lon": "31" }])).is_err());
        assert!(parse_nominatim(&json!([{ "lat": "-29.8" }])).is_err());
    }
}
