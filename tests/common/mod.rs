//! In-process stand-ins for the geocoders and ArcGIS layers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parcelpack::config::{ConstraintLayerConfig, Config};
use serde_json::{json, Value};
use url::Url;

pub const DURBAN_ADDRESS: &str = "27 Gainsborough Drive, Durban";

/// Canned response served for every request to a mock.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Never answers within any test timeout.
    pub fn hang() -> Self {
        Self {
            delay: Duration::from_secs(60),
            ..Self::json(json!({}))
        }
    }
}

#[derive(Clone)]
struct MockState {
    reply: Arc<Reply>,
    hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

/// One mock upstream listening on an ephemeral local port.
pub struct Mock {
    pub url: Url,
    hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Mock {
    pub async fn spawn(path: &str, reply: Reply) -> Self {
        let state = MockState {
            reply: Arc::new(reply),
            hits: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(Mutex::new(Vec::new())),
        };
        let hits = state.hits.clone();
        let queries = state.queries.clone();

        let app = Router::new().fallback(serve_reply).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://{}{}", addr, path)).unwrap(),
            hits,
            queries,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Decoded value of a query parameter on the most recent request.
    pub fn last_param(&self, key: &str) -> Option<String> {
        let queries = self.queries.lock().unwrap();
        let query = queries.last()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

async fn serve_reply(State(state): State<MockState>, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .queries
        .lock()
        .unwrap()
        .push(uri.query().unwrap_or_default().to_string());

    if !state.reply.delay.is_zero() {
        tokio::time::sleep(state.reply.delay).await;
    }

    (
        StatusCode::from_u16(state.reply.status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        state.reply.body.clone(),
    )
        .into_response()
}

pub fn durban_ring() -> Value {
    json!([[[31.00, -29.82], [31.001, -29.82], [31.001, -29.821], [31.00, -29.821], [31.00, -29.82]]])
}

/// Replies for every upstream; defaults to the Gainsborough Drive parcel.
pub struct Replies {
    pub mapbox: Reply,
    pub nominatim: Reply,
    pub parcels: Reply,
    pub zoning: Reply,
    pub sewer: Reply,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            mapbox: Reply::json(json!({
                "type": "FeatureCollection",
                "features": [{ "center": [31.00, -29.82], "place_name": "27 Gainsborough Drive, Durban North" }]
            })),
            nominatim: Reply::json(json!([{
                "lat": "-29.82",
                "lon": "31.00",
                "display_name": DURBAN_ADDRESS
            }])),
            parcels: Reply::json(json!({
                "features": [{
                    "attributes": { "ERF_NUMBER": "1234", "SHAPE_Area": 850 },
                    "geometry": { "rings": durban_ring() }
                }]
            })),
            zoning: Reply::json(json!({
                "features": [{ "attributes": { "ZONING_CODE": "GR2" } }]
            })),
            sewer: Reply::json(json!({
                "features": [{ "attributes": { "DIAMETER": 160, "ASSETTYPE": "GRAVITY MAIN" } }]
            })),
        }
    }
}

impl Replies {
    pub async fn spawn(self) -> Upstreams {
        Upstreams {
            mapbox: Mock::spawn("/geocoding/v5/mapbox.places/", self.mapbox).await,
            nominatim: Mock::spawn("/search", self.nominatim).await,
            parcels: Mock::spawn("/Property_Query/MapServer/0/query", self.parcels).await,
            zoning: Mock::spawn("/Land_Use_Management/MapServer/0/query", self.zoning).await,
            sewer: Mock::spawn("/Water_Sanitation/MapServer/1/query", self.sewer).await,
        }
    }
}

pub struct Upstreams {
    pub mapbox: Mock,
    pub nominatim: Mock,
    pub parcels: Mock,
    pub zoning: Mock,
    pub sewer: Mock,
}

impl Upstreams {
    /// Config pointing at the mocks, with no Mapbox token.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.endpoints.mapbox = self.mapbox.url.clone();
        config.endpoints.nominatim = self.nominatim.url.clone();
        config.endpoints.parcels = self.parcels.url.clone();
        config.endpoints.zoning = self.zoning.url.clone();
        config.endpoints.sewer = self.sewer.url.clone();
        config.timeouts.geocode_ms = 2_000;
        config.timeouts.spatial_ms = 2_000;
        config.system_proxy = false;
        config
    }

    pub fn config_with_token(&self, token: &str) -> Config {
        Config {
            mapbox_token: Some(token.to_string()),
            ..self.config()
        }
    }

    pub fn total_hits(&self) -> usize {
        self.mapbox.hits()
            + self.nominatim.hits()
            + self.parcels.hits()
            + self.zoning.hits()
            + self.sewer.hits()
    }
}

pub fn constraint_layer(key: &str, mock: &Mock) -> ConstraintLayerConfig {
    ConstraintLayerConfig {
        key: key.to_string(),
        label: format!("{} layer", key),
        layer_name: key.to_uppercase(),
        layer_id: 7,
        url: mock.url.clone(),
    }
}
