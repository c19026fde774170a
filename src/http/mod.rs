//! Bounded HTTP fetch shared by every upstream stage.

mod fetch;

pub use fetch::{build_client, excerpt, fetch_json, redact_url, FetchError, BODY_EXCERPT_LEN};
