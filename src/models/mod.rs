//! Request-scoped data models for the address pipeline.

pub mod overlay;
pub mod pack;
pub mod parcel;

pub use overlay::{ConstraintLayer, UtilityFeature, UtilitySummary, ZoningResult};
pub use pack::{Compliance, ComplianceStatus, PreviewPack};
pub use parcel::{Attributes, GeocodeResult, Parcel, Position, Ring, UNKNOWN};
