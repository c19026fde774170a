//! Response envelope returned by one pipeline run.

use serde::Serialize;

use super::{ConstraintLayer, GeocodeResult, Parcel, UtilitySummary, ZoningResult};
use crate::feasibility::{Envelope, Metrics};
use crate::sg::SgArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Ok,
    Review,
}

#[derive(Debug, Clone, Serialize)]
pub struct Compliance {
    pub status: ComplianceStatus,
    pub flags: Vec<String>,
}

impl Compliance {
    pub fn from_flags(flags: Vec<String>) -> Self {
        let status = if flags.is_empty() {
            ComplianceStatus::Ok
        } else {
            ComplianceStatus::Review
        };
        Self { status, flags }
    }
}

/// Complete preview for one address. Built once, never mutated.
///
/// Field order is fixed so identical inputs serialise to identical bytes.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewPack {
    pub ok: bool,
    /// Deterministic identifier derived from the input address
    pub job_id: String,
    pub input_address: String,
    pub geocode: GeocodeResult,
    pub parcel: Parcel,
    pub zoning: ZoningResult,
    pub sewer: UtilitySummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintLayer>,
    pub envelope: Envelope,
    pub metrics: Metrics,
    pub compliance: Compliance,
    pub sg: SgArtifact,
    pub notes: Vec<String>,
}
