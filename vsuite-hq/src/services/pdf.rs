//! PDF rendering adapter.
//!
//! Converts rendered document text into a binary artifact through an
//! external render endpoint. Always invoked best-effort: a failure is
//! logged by the caller and never blocks the owning state transition.

use crate::config::PdfConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF renderer not enabled: {0}")]
    NotEnabled(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Render error: {0}")]
    RenderFailed(String),
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, title: &str, content: &str) -> Result<Vec<u8>, PdfError>;
    fn is_enabled(&self) -> bool;
}

/// Renderer backed by an external HTTP render service.
pub struct HttpPdfRenderer {
    config: PdfConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    title: &'a str,
    content: &'a str,
}

impl HttpPdfRenderer {
    pub fn new(config: PdfConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, title: &str, content: &str) -> Result<Vec<u8>, PdfError> {
        if !self.config.enabled {
            return Err(PdfError::NotEnabled(
                "PDF renderer is not enabled".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&RenderRequest { title, content })
            .send()
            .await
            .map_err(|e| {
                PdfError::Connection(format!("Failed to reach PDF renderer: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PdfError::RenderFailed(format!(
                "PDF renderer returned error status {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            PdfError::RenderFailed(format!("Failed to read PDF response: {}", e))
        })?;

        tracing::info!(title = %title, size = bytes.len(), "PDF rendered");

        Ok(bytes.to_vec())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock PDF renderer for testing
pub struct MockPdfRenderer {
    enabled: bool,
    render_count: AtomicU64,
}

impl MockPdfRenderer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            render_count: AtomicU64::new(0),
        }
    }

    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PdfRenderer for MockPdfRenderer {
    async fn render(&self, title: &str, _content: &str) -> Result<Vec<u8>, PdfError> {
        if !self.enabled {
            return Err(PdfError::NotEnabled(
                "Mock PDF renderer is not enabled".to_string(),
            ));
        }

        self.render_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(title = %title, "[MOCK] PDF would be rendered");

        Ok(format!("%PDF-1.4 mock: {}", title).into_bytes())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
