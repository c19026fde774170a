//! Process-wide configuration, built once at start-up.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::feasibility::{Envelope, FinanceAssumptions};

const DEFAULT_USER_AGENT: &str = "UDG-PrePlan-Checker/1.0 (local-dev)";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Primary geocoder key; absent disables that provider
    pub mapbox_token: Option<String>,
    pub allowed_origins: Vec<String>,
    pub user_agent: String,
    /// Honour HTTP(S)_PROXY from the environment
    pub system_proxy: bool,
    /// Include the diagnostic chain in 500 responses
    pub expose_error_detail: bool,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    pub envelope: Envelope,
    pub finance: FinanceAssumptions,
    pub constraint_layers: Vec<ConstraintLayerConfig>,
    pub sg: SgConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Endpoints {
    pub mapbox: Url,
    pub nominatim: Url,
    pub parcels: Url,
    pub zoning: Url,
    pub sewer: Url,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Timeouts {
    pub geocode_ms: u64,
    pub spatial_ms: u64,
}

/// Optional overlay layer counted against the parcel.
#[derive(Debug, Deserialize, Clone)]
pub struct ConstraintLayerConfig {
    pub key: String,
    pub label: String,
    pub layer_name: String,
    pub layer_id: u32,
    /// ArcGIS `.../MapServer/<id>/query` endpoint
    pub url: Url,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SgConfig {
    pub portal_url: String,
    /// Program and leading arguments of the diagram download tool
    pub command: Vec<String>,
    pub download_dir: PathBuf,
    pub timeout_ms: u64,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Mapbox token, treating an empty value as unset.
    pub fn primary_geocoder_key(&self) -> Option<&str> {
        self.mapbox_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Timeouts {
    pub fn geocode(&self) -> Duration {
        Duration::from_millis(self.geocode_ms)
    }

    pub fn spatial(&self) -> Duration {
        Duration::from_millis(self.spatial_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5174,
            mapbox_token: None,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            system_proxy: true,
            expose_error_detail: true,
            endpoints: Endpoints::default(),
            timeouts: Timeouts::default(),
            envelope: Envelope::default(),
            finance: FinanceAssumptions::default(),
            constraint_layers: Vec::new(),
            sg: SgConfig::default(),
        }
    }
}

fn static_url(s: &str) -> Url {
    // Only called with the literal defaults below.
    Url::parse(s).unwrap_or_else(|e| panic!("invalid built-in URL {s}: {e}"))
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            mapbox: static_url("https://api.mapbox.com/geocoding/v5/mapbox.places/"),
            nominatim: static_url("https://nominatim.openstreetmap.org/search"),
            parcels: static_url(
                "https://gis.durban.gov.za/arcgis/rest/services/Public/Property_Query/MapServer/0/query",
            ),
            zoning: static_url(
                "https://gis.durban.gov.za/arcgis/rest/services/Public/Land_Use_Management/MapServer/0/query",
            ),
            sewer: static_url(
                "https://gis.durban.gov.za/arcgis/rest/services/Public/Water_Sanitation/MapServer/1/query",
            ),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            geocode_ms: 15_000,
            spatial_ms: 20_000,
        }
    }
}

impl Default for SgConfig {
    fn default() -> Self {
        Self {
            portal_url: "https://csg.drdlr.gov.za/".to_string(),
            command: Vec::new(),
            download_dir: PathBuf::from("downloads/sg"),
            timeout_ms: 120_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:5174");
        assert_eq!(config.timeouts.geocode(), Duration::from_secs(15));
        assert_eq!(config.timeouts.spatial(), Duration::from_secs(20));
        assert!(config.primary_geocoder_key().is_none());
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn test_blank_token_is_unset() {
        let config = Config {
            mapbox_token: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(config.primary_geocoder_key().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            port = 8080

            [timeouts]
            spatial_ms = 5000

            [[constraint_layers]]
            key = "flood"
            label = "Flood line"
            layer_name = "Floodlines_100yr"
            layer_id = 3
            url = "https://gis.example.org/arcgis/rest/services/Env/MapServer/3/query"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.timeouts.spatial_ms, 5000);
        assert_eq!(config.timeouts.geocode_ms, 15_000);
        assert_eq!(config.constraint_layers.len(), 1);
        assert_eq!(config.constraint_layers[0].layer_id, 3);
        assert_eq!(config.endpoints.nominatim.host_str(), Some("nominatim.openstreetmap.org"));
    }
}
