//! ArcGIS spatial-query stages: parcel lookup and polygon overlays.

pub mod attributes;
mod overlay;
mod parcel;
pub mod query;

pub use overlay::{
    utilities_from_features, zoning_from_features, ConstraintOverlay, UtilityIntersector,
    ZoningResolver,
};
pub use parcel::{parcel_from_feature, ParcelLocator};
pub use query::{query_layer, FeatureSet, LayerQuery, SpatialFilter};
