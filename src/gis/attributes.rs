//! Field-name alias tables for inconsistent ArcGIS schemas.
//!
//! Each logical field lists the attribute names it may appear under, in
//! priority order. The first alias holding a non-null value wins. New
//! aliases are added to the tables, not to the lookup code.

use serde_json::Value;

use crate::models::Attributes;

/// A logical attribute and the source field names that may carry it.
#[derive(Debug, Clone, Copy)]
pub struct AliasField {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub const PARCEL_ERF: AliasField = AliasField {
    name: "erf",
    aliases: &["ERF_NUMBER", "ERF", "ERFNO", "ERFNUM"],
};

pub const PARCEL_AREA: AliasField = AliasField {
    name: "area",
    aliases: &["SHAPE_Area", "SHAPE.AREA", "Shape_Area", "AREA"],
};

pub const PARCEL_ADDRESS: AliasField = AliasField {
    name: "address",
    aliases: &["STREET_ADDRESS", "ADDRESS"],
};

pub const ZONING_CODE: AliasField = AliasField {
    name: "zoning_code",
    aliases: &["ZONING_CODE", "ZONING"],
};

pub const UTILITY_DIAMETER: AliasField = AliasField {
    name: "diameter",
    aliases: &["DIAMETER"],
};

pub const UTILITY_ASSET_TYPE: AliasField = AliasField {
    name: "asset_type",
    aliases: &["ASSETTYPE", "ASSET_TYPE"],
};

impl AliasField {
    /// Value rendered as text. Numbers are formatted, empty strings skipped.
    pub fn text(&self, attrs: &Attributes) -> Option<String> {
        self.aliases
            .iter()
            .filter_map(|alias| attrs.get(*alias))
            .find_map(as_text)
    }

    /// Value as a finite number. Numeric strings are accepted.
    pub fn number(&self, attrs: &Attributes) -> Option<f64> {
        self.aliases
            .iter()
            .filter_map(|alias| attrs.get(*alias))
            .find_map(as_number)
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}
