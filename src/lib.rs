//! Parcelpack - property feasibility previews from a free-text address
//!
//! Geocodes the address, finds the cadastral parcel, and overlays zoning,
//! sewer and optional constraint layers into a single preview pack.

pub mod api;
pub mod config;
pub mod error;
pub mod feasibility;
pub mod geocode;
pub mod gis;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod sg;

pub use config::Config;
pub use error::{ErrorKind, PipelineError, Stage};
pub use models::PreviewPack;
pub use pipeline::Pipeline;
