//! Development envelope and yield estimate for a parcel.

use geo::orient::{Direction, Orient};
use geo::{GeodesicArea, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::models::Position;

/// Planning envelope assumptions applied to every parcel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub setback_m: f64,
    /// Maximum site coverage, 0..1
    pub coverage: f64,
    /// Floor area ratio
    pub far: f64,
    pub height_floors: u32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            setback_m: 2.0,
            coverage: 0.6,
            far: 1.2,
            height_floors: 3,
        }
    }
}

/// Finance assumptions for the indicative yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceAssumptions {
    /// Sale rate per square metre of net lettable area
    pub rate_per_m2: f64,
    /// Net lettable area over gross floor area
    pub efficiency: f64,
}

impl Default for FinanceAssumptions {
    fn default() -> Self {
        Self {
            rate_per_m2: 25_000.0,
            efficiency: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub site_area_m2: f64,
    pub buildable_area_m2: f64,
    pub max_footprint_m2: f64,
    pub max_gfa_m2: f64,
    pub estimated_nla_m2: f64,
    pub indicative_gdv: f64,
}

/// Site area and perimeter measured on the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingMeasure {
    pub perimeter_m: f64,
    pub area_m2: f64,
}

/// Measure an outer ring of (lon, lat) positions. Rings with fewer than
/// three distinct vertices have no area.
pub fn measure_ring(ring: &[Position]) -> Option<RingMeasure> {
    let coords: Vec<(f64, f64)> = ring.iter().map(|p| (p[0], p[1])).collect();
    if coords.len() < 3 || coords.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return None;
    }

    // ArcGIS winds outer rings clockwise; the unsigned geodesic area expects
    // a counter-clockwise exterior.
    let polygon = Polygon::new(LineString::from(coords), vec![]).orient(Direction::Default);
    let (perimeter_m, area_m2) = polygon.geodesic_perimeter_area_unsigned();
    Some(RingMeasure {
        perimeter_m,
        area_m2,
    })
}

/// Compute the envelope metrics.
///
/// `reported_area` is the source's area attribute; when it is not positive the
/// geodesic area of the ring is used instead.
pub fn compute_metrics(
    reported_area: f64,
    ring: Option<RingMeasure>,
    envelope: &Envelope,
    finance: &FinanceAssumptions,
) -> Metrics {
    let site_area_m2 = if reported_area > 0.0 {
        reported_area
    } else {
        ring.map(|r| r.area_m2).unwrap_or(0.0)
    };

    // Setback strip approximated as perimeter x depth.
    let setback_loss = ring.map(|r| r.perimeter_m * envelope.setback_m).unwrap_or(0.0);
    let buildable_area_m2 = (site_area_m2 - setback_loss).max(0.0);
    let max_footprint_m2 = buildable_area_m2 * envelope.coverage;
    let max_gfa_m2 =
        (max_footprint_m2 * f64::from(envelope.height_floors)).min(site_area_m2 * envelope.far);
    let estimated_nla_m2 = max_gfa_m2 * finance.efficiency;
    let indicative_gdv = estimated_nla_m2 * finance.rate_per_m2;

    Metrics {
        site_area_m2,
        buildable_area_m2,
        max_footprint_m2,
        max_gfa_m2,
        estimated_nla_m2,
        indicative_gdv,
    }
}
