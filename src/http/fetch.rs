use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Number of body characters kept in error messages.
pub const BODY_EXCERPT_LEN: usize = 200;

/// Query parameters whose values never reach logs or error messages.
const SECRET_PARAMS: &[&str] = &["access_token", "token", "key"];

/// Failure of a single bounded upstream call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {}ms", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    #[error("transport failure contacting {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-JSON response from {url}. Status {status}. Body starts: {excerpt}")]
    Malformed {
        url: String,
        status: u16,
        excerpt: String,
    },

    #[error("HTTP {status} from {url}. Body starts: {excerpt}")]
    Http {
        url: String,
        status: u16,
        excerpt: String,
    },

    /// Body parsed as JSON but does not have the expected structure.
    #[error("unexpected response shape from {url}: {detail}")]
    Shape { url: String, detail: String },

    /// ArcGIS reports query errors inside a 200 response body.
    #[error("service error {code} from {url}: {message}")]
    Service {
        url: String,
        code: i64,
        message: String,
    },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Build the shared upstream client. Nominatim rejects requests without a
/// descriptive user agent, so one is always set.
pub fn build_client(user_agent: &str, system_proxy: bool) -> reqwest::Result<Client> {
    let builder = Client::builder().user_agent(user_agent.to_string());
    let builder = if system_proxy {
        builder
    } else {
        builder.no_proxy()
    };
    builder.build()
}

/// GET `url` and parse the body as JSON, giving up after `timeout`.
///
/// The body is read as text before parsing so that a non-JSON reply can be
/// reported with its status and an excerpt. A non-2xx status is an error even
/// when the body parses. No retries happen here.
pub async fn fetch_json(client: &Client, url: &Url, timeout: Duration) -> Result<Value, FetchError> {
    let shown = redact_url(url);
    debug!("GET {} (timeout {}ms)", shown, timeout.as_millis());

    let call = async {
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&shown, timeout, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&shown, timeout, e))?;
        Ok::<(StatusCode, String), FetchError>((status, text))
    };

    // Dropping the future on expiry aborts the in-flight request.
    let outcome = tokio::time::timeout(timeout, call).await;
    let (status, text) = match outcome {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::Timeout {
                url: shown,
                timeout,
            })
        }
    };

    let json: Value = serde_json::from_str(&text).map_err(|_| FetchError::Malformed {
        url: shown.clone(),
        status: status.as_u16(),
        excerpt: excerpt(&text),
    })?;

    if !status.is_success() {
        return Err(FetchError::Http {
            url: shown,
            status: status.as_u16(),
            excerpt: excerpt(&text),
        });
    }

    Ok(json)
}

fn transport_error(url: &str, timeout: Duration, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        // The request URL may carry an access token.
        FetchError::Transport {
            url: url.to_string(),
            source: source.without_url(),
        }
    }
}

/// First [`BODY_EXCERPT_LEN`] characters of a body.
pub fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_LEN).collect()
}

/// Render a URL with secret query values replaced.
pub fn redact_url(url: &Url) -> String {
    if !url
        .query_pairs()
        .any(|(k, _)| SECRET_PARAMS.contains(&k.as_ref()))
    {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if SECRET_PARAMS.contains(&k.as_ref()) {
                (k.into_owned(), "REDACTED".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
