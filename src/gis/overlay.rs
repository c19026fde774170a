//! Polygon-intersects queries run against the parcel boundary.
//!
//! Zero features is a valid answer for every layer here: zoning resolves to
//! the sentinel code and utilities to an empty list.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::attributes::{UTILITY_ASSET_TYPE, UTILITY_DIAMETER, ZONING_CODE};
use super::query::{query_layer, FeatureSet, LayerQuery};
use crate::config::ConstraintLayerConfig;
use crate::error::{display_chain, PipelineError, PipelineResult, Stage};
use crate::models::{ConstraintLayer, UtilityFeature, UtilitySummary, ZoningResult, UNKNOWN};

#[derive(Debug, Clone)]
pub struct ZoningResolver {
    endpoint: Url,
    timeout: Duration,
}

impl ZoningResolver {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub async fn resolve(&self, client: &Client, boundary: &Value) -> PipelineResult<ZoningResult> {
        let set = query_layer(
            client,
            &self.endpoint,
            &LayerQuery::intersecting(boundary),
            self.timeout,
        )
        .await
        .map_err(|e| PipelineError::upstream(Stage::ResolveZoning, e))?;

        Ok(zoning_from_features(set))
    }
}

/// Zoning from the first intersecting feature.
pub fn zoning_from_features(set: FeatureSet) -> ZoningResult {
    let raw = set.features.into_iter().next().and_then(|f| f.attributes);
    let code = raw
        .as_ref()
        .and_then(|attrs| ZONING_CODE.text(attrs))
        .unwrap_or_else(|| UNKNOWN.to_string());
    debug!("Zoning resolved to {}", code);
    ZoningResult { code, raw }
}

#[derive(Debug, Clone)]
pub struct UtilityIntersector {
    endpoint: Url,
    timeout: Duration,
}

impl UtilityIntersector {
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub async fn intersect(&self, client: &Client, boundary: &Value) -> PipelineResult<UtilitySummary> {
        let set = query_layer(
            client,
            &self.endpoint,
            &LayerQuery::intersecting(boundary),
            self.timeout,
        )
        .await
        .map_err(|e| PipelineError::upstream(Stage::IntersectUtilities, e))?;

        Ok(utilities_from_features(set))
    }
}

/// Utility features in the order the service returned them.
pub fn utilities_from_features(set: FeatureSet) -> UtilitySummary {
    let features = set
        .features
        .into_iter()
        .map(|f| {
            let raw = f.attributes.unwrap_or_default();
            UtilityFeature {
                diameter: UTILITY_DIAMETER.number(&raw),
                asset_type: UTILITY_ASSET_TYPE.text(&raw),
                raw,
            }
        })
        .collect();
    UtilitySummary::new(features)
}

/// Best-effort feature counts for the optional constraint layers.
#[derive(Debug, Clone)]
pub struct ConstraintOverlay {
    layers: Vec<ConstraintLayerConfig>,
    timeout: Duration,
}

impl ConstraintOverlay {
    pub fn new(layers: Vec<ConstraintLayerConfig>, timeout: Duration) -> Self {
        Self { layers, timeout }
    }

    /// Count features per layer. A failed layer is reported on its entry and
    /// never fails the request. Entries keep configuration order.
    pub async fn count(&self, client: &Client, boundary: &Value) -> Vec<ConstraintLayer> {
        let timeout = self.timeout;
        let queries = self.layers.iter().map(move |layer| async move {
            let result = query_layer(
                client,
                &layer.url,
                &LayerQuery::count_intersecting(boundary),
                timeout,
            )
            .await;

            let (feature_count, error) = match result {
                Ok(set) => (Some(set.count.unwrap_or(set.features.len() as u64)), None),
                Err(e) => {
                    let message = display_chain(&e);
                    warn!("Constraint layer {} unavailable: {}", layer.key, message);
                    (None, Some(message))
                }
            };

            ConstraintLayer {
                key: layer.key.clone(),
                label: layer.label.clone(),
                feature_count,
                layer_name: layer.layer_name.clone(),
                layer_id: layer.layer_id,
                error,
            }
        });

        join_all(queries).await
    }
}
