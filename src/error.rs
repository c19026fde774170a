//! Pipeline error taxonomy.

use serde::Serialize;
use thiserror::Error;

use crate::http::FetchError;

/// Pipeline stage, used to attribute a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Geocode,
    LocateParcel,
    ResolveZoning,
    IntersectUtilities,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Geocode => write!(f, "geocode"),
            Stage::LocateParcel => write!(f, "locate_parcel"),
            Stage::ResolveZoning => write!(f, "resolve_zoning"),
            Stage::IntersectUtilities => write!(f, "intersect_utilities"),
        }
    }
}

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    UpstreamTransport,
    UpstreamTimeout,
    MalformedResponse,
    UpstreamHttp,
    GeocodeFailure,
    ParcelNotFound,
    GeometryMissing,
}

impl From<&FetchError> for ErrorKind {
    fn from(err: &FetchError) -> Self {
        match err {
            FetchError::Timeout { .. } => ErrorKind::UpstreamTimeout,
            FetchError::Transport { .. } => ErrorKind::UpstreamTransport,
            FetchError::Malformed { .. } | FetchError::Shape { .. } => {
                ErrorKind::MalformedResponse
            }
            FetchError::Http { .. } | FetchError::Service { .. } => ErrorKind::UpstreamHttp,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{stage} failed")]
    Upstream {
        stage: Stage,
        #[source]
        source: FetchError,
    },

    /// Upstream replied with JSON whose shape or values are unusable.
    #[error("{stage} failed: malformed upstream response: {detail}")]
    Malformed { stage: Stage, detail: String },

    /// Every configured geocoder was tried and none produced coordinates.
    #[error("Geocode failed: {reason}")]
    GeocodeFailure {
        reason: String,
        #[source]
        source: Option<FetchError>,
    },

    #[error("No parcel found at this location ({lat}, {lon}); the parcel service returned no features.")]
    ParcelNotFound { lat: f64, lon: f64 },

    #[error("Parcel {erf} has no boundary rings.")]
    GeometryMissing { erf: String },
}

impl PipelineError {
    pub fn upstream(stage: Stage, source: FetchError) -> Self {
        PipelineError::Upstream { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Upstream { source, .. } => ErrorKind::from(source),
            PipelineError::Malformed { .. } => ErrorKind::MalformedResponse,
            PipelineError::GeocodeFailure { .. } => ErrorKind::GeocodeFailure,
            PipelineError::ParcelNotFound { .. } => ErrorKind::ParcelNotFound,
            PipelineError::GeometryMissing { .. } => ErrorKind::GeometryMissing,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Validate,
            PipelineError::Upstream { stage, .. } | PipelineError::Malformed { stage, .. } => *stage,
            PipelineError::GeocodeFailure { .. } => Stage::Geocode,
            PipelineError::ParcelNotFound { .. } | PipelineError::GeometryMissing { .. } => {
                Stage::LocateParcel
            }
        }
    }

    /// True when the failure, or its underlying cause, was a deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            PipelineError::Upstream { source, .. } => source.is_timeout(),
            PipelineError::GeocodeFailure {
                source: Some(source),
                ..
            } => source.is_timeout(),
            _ => false,
        }
    }

    /// The error and its causes on one line, `outer: inner: ...`.
    pub fn message(&self) -> String {
        display_chain(self)
    }

    /// Render the error and its source chain, one cause per line.
    pub fn diagnostic_chain(&self) -> String {
        let mut out = format!("{:?}: {}", self.kind(), self);
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str("\n  caused by: ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Join an error and each of its sources with `": "`.
pub fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(err) = cause {
        out.push_str(": ");
        out.push_str(&err.to_string());
        cause = err.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_upstream_kind_follows_fetch_error() {
        let err = PipelineError::upstream(
            Stage::ResolveZoning,
            FetchError::Timeout {
                url: "http://zoning".into(),
                timeout: Duration::from_secs(20),
            },
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamTimeout);
        assert_eq!(err.stage(), Stage::ResolveZoning);
        assert!(err.is_timeout());
    }

    #[test]
    fn test_geocode_failure_keeps_timeout_cause() {
        let err = PipelineError::GeocodeFailure {
            reason: "Nominatim unavailable".into(),
            source: Some(FetchError::Timeout {
                url: "http://nominatim".into(),
                timeout: Duration::from_secs(15),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::GeocodeFailure);
        assert!(err.is_timeout());
        assert!(err.diagnostic_chain().contains("caused by: request to http://nominatim"));
        assert_eq!(
            err.message(),
            "Geocode failed: Nominatim unavailable: request to http://nominatim timed out after 15000ms"
        );
    }

    #[test]
    fn test_each_cause_rendered_once() {
        let err = PipelineError::upstream(
            Stage::IntersectUtilities,
            FetchError::Http {
                url: "http://sewer".into(),
                status: 500,
                excerpt: "oops".into(),
            },
        );
        let chain = err.diagnostic_chain();
        assert_eq!(chain.matches("HTTP 500").count(), 1, "{chain}");
        assert_eq!(err.to_string(), "intersect_utilities failed");
        assert_eq!(
            err.message(),
            "intersect_utilities failed: HTTP 500 from http://sewer. Body starts: oops"
        );
    }

    #[test]
    fn test_service_error_is_http_kind() {
        let err = PipelineError::upstream(
            Stage::LocateParcel,
            FetchError::Service {
                url: "http://parcels".into(),
                code: 400,
                message: "Invalid query".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamHttp);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        let json = serde_json::to_string(&Stage::IntersectUtilities).unwrap();
        assert_eq!(json, "\"intersect_utilities\"");
        let json = serde_json::to_string(&ErrorKind::ParcelNotFound).unwrap();
        assert_eq!(json, "\"parcel_not_found\"");
    }
}
