use super::{ProviderError, ProviderResponse, SmsMessage, SmsProvider};
use crate::config::SmsConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// SMS provider backed by a generic HTTP gateway.
pub struct HttpSmsProvider {
    config: SmsConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GatewayRequest {
    sender: String,
    to: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    message_id: Option<String>,
}

impl HttpSmsProvider {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SmsProvider for HttpSmsProvider {
    async fn send(&self, sms: &SmsMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "SMS provider is not enabled".to_string(),
            ));
        }

        // Normalize phone number (remove non-digits except leading +)
        let normalized_phone = sms
            .to
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect::<String>();

        if normalized_phone.is_empty() {
            return Err(ProviderError::InvalidRecipient(
                "Phone number is empty".to_string(),
            ));
        }

        let request = GatewayRequest {
            sender: self.config.sender_id.clone(),
            to: normalized_phone,
            message: sms.body.clone(),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to SMS gateway: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::SendFailed(format!(
                "SMS gateway returned error status {}: {}",
                status, body
            )));
        }

        let gateway_response: GatewayResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse SMS gateway response: {}", e))
        })?;

        tracing::info!(to = %sms.to, "SMS sent successfully");

        Ok(ProviderResponse::success(gateway_response.message_id))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock SMS provider for testing
pub struct MockSmsProvider {
    enabled: bool,
    send_count: AtomicU64,
}

impl MockSmsProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmsProvider for MockSmsProvider {
    async fn send(&self, sms: &SmsMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock SMS provider is not enabled".to_string(),
            ));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(to = %sms.to, "[MOCK] SMS would be sent");

        Ok(ProviderResponse::success(Some(format!(
            "mock-sms-{}",
            self.send_count.load(Ordering::SeqCst)
        ))))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
