//! Address geocoding with a key-gated primary and a keyless fallback.

mod mapbox;
mod nominatim;
mod service;

pub use mapbox::{parse_mapbox, MapboxGeocoder};
pub use nominatim::{parse_nominatim, NominatimGeocoder};
pub use service::Geocoder;

use serde_json::Value;

/// Read a coordinate that upstreams send either as a number or a string.
pub(crate) fn coordinate(value: Option<&Value>, field: &str) -> Result<f64, String> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!("coordinate {} is not a finite number: {:?}", field, value)),
    }
}
