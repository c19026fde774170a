//! Address resolution pipeline.
//!
//! `geocode -> locate parcel -> {zoning, utilities, constraints} -> assemble`.
//! Each stage needs the previous stage's output, except the overlay queries,
//! which run concurrently once the parcel boundary is known. The first fatal
//! error ends the run; nothing is retried.

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;
use xxhash_rust::xxh64::xxh64;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::feasibility::{compute_metrics, measure_ring, Envelope, FinanceAssumptions};
use crate::geocode::Geocoder;
use crate::gis::{ConstraintOverlay, ParcelLocator, UtilityIntersector, ZoningResolver};
use crate::http::build_client;
use crate::models::{
    Compliance, ConstraintLayer, GeocodeResult, Parcel, PreviewPack, UtilitySummary, ZoningResult,
    UNKNOWN,
};
use crate::sg::SgFetcher;

/// Stateless orchestrator; one instance serves every request.
#[derive(Debug, Clone)]
pub struct Pipeline {
    client: Client,
    geocoder: Geocoder,
    parcels: ParcelLocator,
    zoning: ZoningResolver,
    utilities: UtilityIntersector,
    constraints: ConstraintOverlay,
    envelope: Envelope,
    finance: FinanceAssumptions,
    sg: SgFetcher,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_client(&config.user_agent, config.system_proxy)
            .context("Failed to create HTTP client")?;
        let spatial = config.timeouts.spatial();

        Ok(Self {
            client,
            geocoder: Geocoder::from_config(config),
            parcels: ParcelLocator::new(config.endpoints.parcels.clone(), spatial),
            zoning: ZoningResolver::new(config.endpoints.zoning.clone(), spatial),
            utilities: UtilityIntersector::new(config.endpoints.sewer.clone(), spatial),
            constraints: ConstraintOverlay::new(config.constraint_layers.clone(), spatial),
            envelope: config.envelope,
            finance: config.finance,
            sg: SgFetcher::new(config.sg.clone()),
        })
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Run every stage for one address.
    pub async fn run(&self, address: Option<&str>) -> PipelineResult<PreviewPack> {
        let address = validate_address(address)?;
        info!("Processing address '{}'", address);

        let geocode = self.geocoder.geocode(&self.client, &address).await?;
        let parcel = self.parcels.locate(&self.client, &geocode).await?;

        let boundary = parcel.esri_geometry();
        let (zoning, sewer, constraints) = tokio::try_join!(
            self.zoning.resolve(&self.client, &boundary),
            self.utilities.intersect(&self.client, &boundary),
            async { Ok::<_, PipelineError>(self.constraints.count(&self.client, &boundary).await) },
        )?;

        info!(
            "Pack ready for '{}': erf {}, zoning {}, {} sewer features",
            address, parcel.erf, zoning.code, sewer.count
        );
        Ok(self.assemble(address, geocode, parcel, zoning, sewer, constraints))
    }

    fn assemble(
        &self,
        address: String,
        geocode: GeocodeResult,
        parcel: Parcel,
        zoning: ZoningResult,
        sewer: UtilitySummary,
        constraints: Vec<ConstraintLayer>,
    ) -> PreviewPack {
        let ring = measure_ring(parcel.outer_ring());
        let metrics = compute_metrics(parcel.area, ring, &self.envelope, &self.finance);

        let mut flags = Vec::new();
        let mut notes = Vec::new();
        if zoning.code == UNKNOWN {
            flags.push("zoning_unknown".to_string());
            notes.push("Zoning layer returned no recognised code; confirm zoning manually.".to_string());
        }
        if parcel.erf == UNKNOWN {
            flags.push("erf_unknown".to_string());
            notes.push("Parcel record carries no erf number.".to_string());
        }
        if parcel.area <= 0.0 {
            flags.push("area_from_geometry".to_string());
            notes.push("Parcel area attribute missing; site area measured from the boundary.".to_string());
        }
        if sewer.count > 0 {
            flags.push("sewer_intersects_site".to_string());
            notes.push(format!(
                "{} sewer feature(s) cross the site; servitudes may apply.",
                sewer.count
            ));
        }
        for layer in &constraints {
            match layer.feature_count {
                Some(0) => {}
                Some(_) => flags.push(format!("constraint:{}", layer.key)),
                None => flags.push(format!("constraint_unavailable:{}", layer.key)),
            }
        }

        PreviewPack {
            ok: true,
            job_id: job_id(&address),
            input_address: address,
            geocode,
            parcel,
            zoning,
            sewer,
            constraints,
            envelope: self.envelope,
            metrics,
            compliance: Compliance::from_flags(flags),
            sg: self.sg.not_requested(None),
            notes,
        }
    }
}

/// Trimmed, non-empty address or a validation error.
pub fn validate_address(raw: Option<&str>) -> PipelineResult<String> {
    match raw.map(str::trim) {
        Some(address) if !address.is_empty() => Ok(address.to_string()),
        _ => Err(PipelineError::Validation("missing_address")),
    }
}

/// Stable identifier for a pack: the same address always maps to the same id.
pub fn job_id(address: &str) -> String {
    format!("{:016x}", xxh64(address.as_bytes(), 0))
}
