//! Surveyor-General diagram download, run out-of-band.
//!
//! The download tool is an external browser-automation script. It is never
//! part of the address pipeline; a pack only carries a `not_requested`
//! artifact pointing at the portal.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::SgConfig;
use crate::http::excerpt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SgStatus {
    NotRequested,
    Pending,
    Downloaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SgArtifact {
    pub status: SgStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub portal_url: String,
}

/// Runs the configured diagram tool with a deadline.
#[derive(Debug, Clone)]
pub struct SgFetcher {
    config: SgConfig,
}

impl SgFetcher {
    pub fn new(config: SgConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.command.is_empty()
    }

    pub fn not_requested(&self, docref: Option<String>) -> SgArtifact {
        self.artifact(SgStatus::NotRequested, docref, None, None)
    }

    /// Output location for a document reference.
    pub fn output_path(&self, docref: &str) -> PathBuf {
        self.config
            .download_dir
            .join(format!("{}.pdf", sanitize_docref(docref)))
    }

    /// Invoke the tool as `<command...> --docref <docref> --out <path>`.
    /// Never returns an error: every failure becomes a `failed` artifact.
    pub async fn fetch(&self, docref: &str) -> SgArtifact {
        let docref = docref.trim();
        let Some((program, args)) = self.config.command.split_first() else {
            return self.failed(docref, "survey diagram tool is not configured".to_string());
        };

        let out = self.output_path(docref);
        if let Err(e) = tokio::fs::create_dir_all(&self.config.download_dir).await {
            return self.failed(
                docref,
                format!("cannot create {}: {}", self.config.download_dir.display(), e),
            );
        }

        info!("Fetching survey diagram {} -> {}", docref, out.display());
        let mut command = Command::new(program);
        command
            .args(args)
            .arg("--docref")
            .arg(docref)
            .arg("--out")
            .arg(&out)
            .env("CSG_PORTAL_URL", &self.config.portal_url)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return self.failed(docref, format!("cannot run {}: {}", program, e)),
            Err(_) => {
                return self.failed(
                    docref,
                    format!("diagram tool timed out after {}ms", timeout.as_millis()),
                )
            }
        };

        if output.status.success() && file_exists(&out).await {
            info!("Survey diagram {} downloaded", docref);
            return self.artifact(SgStatus::Downloaded, Some(docref.to_string()), Some(out), None);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => format!("diagram tool exited with {}", output.status),
            text => excerpt(text),
        };
        self.failed(docref, message)
    }

    fn failed(&self, docref: &str, message: String) -> SgArtifact {
        warn!("Survey diagram {} failed: {}", docref, message);
        self.artifact(SgStatus::Failed, Some(docref.to_string()), None, Some(message))
    }

    fn artifact(
        &self,
        status: SgStatus,
        docref: Option<String>,
        path: Option<PathBuf>,
        message: Option<String>,
    ) -> SgArtifact {
        SgArtifact {
            status,
            docref,
            path,
            message,
            portal_url: self.config.portal_url.clone(),
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// File-name-safe form of a reference such as "SG 6814/1949".
pub fn sanitize_docref(docref: &str) -> String {
    let mut out = String::with_capacity(docref.len());
    for c in docref.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let out = out.trim_matches(|c| c == '_' || c == '.').to_string();
    if out.is_empty() {
        "diagram".to_string()
    } else {
        out
    }
}
