//! Parcel lookup by point.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use super::attributes::{PARCEL_ADDRESS, PARCEL_AREA, PARCEL_ERF};
use super::query::{query_layer, Feature, LayerQuery};
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::models::{GeocodeResult, Parcel, UNKNOWN};

/// Finds the cadastral parcel containing a coordinate.
#[derive(Debug, Clone)]
pub struct ParcelLocator {
    endpoint: Url,
    timeout: Duration,
}

impl ParcelLocator {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Ranking among several candidates is left to the parcel service; only
    /// the first feature is requested.
    pub async fn locate(&self, client: &Client, geocode: &GeocodeResult) -> PipelineResult<Parcel> {
        let query = LayerQuery::first_at_point(geocode.lon, geocode.lat);
        let set = query_layer(client, &self.endpoint, &query, self.timeout)
            .await
            .map_err(|e| PipelineError::upstream(Stage::LocateParcel, e))?;

        let feature = set
            .features
            .into_iter()
            .next()
            .ok_or(PipelineError::ParcelNotFound {
                lat: geocode.lat,
                lon: geocode.lon,
            })?;

        let parcel = parcel_from_feature(feature, &geocode.display_name)?;
        info!(
            "Parcel {} ({} m2) at ({}, {})",
            parcel.erf, parcel.area, geocode.lat, geocode.lon
        );
        Ok(parcel)
    }
}

/// Extract a parcel from a feature. Missing attributes fall back to
/// sentinels; a missing boundary is fatal.
pub fn parcel_from_feature(feature: Feature, display_name: &str) -> PipelineResult<Parcel> {
    let ring = feature.outer_ring();
    let attributes = feature.attributes.unwrap_or_default();

    let erf = PARCEL_ERF.text(&attributes).unwrap_or_else(|| {
        debug!("no {} attribute on parcel", PARCEL_ERF.name);
        UNKNOWN.to_string()
    });

    let ring = ring.ok_or_else(|| PipelineError::GeometryMissing { erf: erf.clone() })?;

    let area = PARCEL_AREA.number(&attributes).unwrap_or_else(|| {
        debug!("no {} attribute on parcel {}", PARCEL_AREA.name, erf);
        0.0
    });

    let address = PARCEL_ADDRESS
        .text(&attributes)
        .or_else(|| {
            let name = display_name.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(Parcel {
        erf,
        area,
        address,
        attributes,
        rings: vec![ring],
    })
}
