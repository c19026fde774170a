use reqwest::Client;
use tracing::{debug, info, warn};

use super::{MapboxGeocoder, NominatimGeocoder};
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::models::GeocodeResult;

/// Tries Mapbox when a token is configured, then Nominatim.
///
/// Any primary failure falls through to the secondary. There is no third
/// provider: a secondary failure ends the request.
#[derive(Debug, Clone)]
pub struct Geocoder {
    primary: Option<MapboxGeocoder>,
    secondary: NominatimGeocoder,
}

impl Geocoder {
    pub fn new(primary: Option<MapboxGeocoder>, secondary: NominatimGeocoder) -> Self {
        Self { primary, secondary }
    }

    pub fn from_config(config: &Config) -> Self {
        let timeout = config.timeouts.geocode();
        let primary = config
            .primary_geocoder_key()
            .map(|token| MapboxGeocoder::new(config.endpoints.mapbox.clone(), token, timeout));
        let secondary = NominatimGeocoder::new(config.endpoints.nominatim.clone(), timeout);
        Self::new(primary, secondary)
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn geocode(&self, client: &Client, address: &str) -> PipelineResult<GeocodeResult> {
        if let Some(primary) = &self.primary {
            match primary.geocode(client, address).await {
                Ok(Some(hit)) => {
                    info!("Geocoded via Mapbox: ({}, {})", hit.lat, hit.lon);
                    return Ok(hit);
                }
                Ok(None) => debug!("Mapbox returned no match; trying Nominatim"),
                Err(e) => warn!(
                    "Mapbox geocode failed, falling back to Nominatim: {}",
                    e.message()
                ),
            }
        }

        match self.secondary.geocode(client, address).await {
            Ok(Some(hit)) => {
                info!("Geocoded via Nominatim: ({}, {})", hit.lat, hit.lon);
                Ok(hit)
            }
            Ok(None) => Err(PipelineError::GeocodeFailure {
                reason: "no results from Nominatim.".to_string(),
                source: None,
            }),
            Err(PipelineError::Upstream { source, .. }) => Err(PipelineError::GeocodeFailure {
                reason: "Nominatim unavailable".to_string(),
                source: Some(source),
            }),
            Err(other) => Err(other),
        }
    }
}
