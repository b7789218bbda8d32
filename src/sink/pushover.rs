//! Pushover delivery — POSTs the messages API form.
//!
//! One round-trip per notification, 5-second timeout, no retries. All wire
//! types are private to this module; callers only see the
//! [`NotificationSink`] contract.

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::{DeliveryFuture, Notification, NotificationSink, SinkError};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Pushover messages-API sink.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct PushoverSink {
    client: Client,
    /// Application token shared by all tenants — `None` when the operator
    /// never configured one. Checked per delivery so the failure is logged
    /// where it happens, matching the availability-first error contract.
    app_token: Option<String>,
    url: String,
}

impl PushoverSink {
    pub fn new(app_token: Option<String>) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SinkError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, app_token, url: PUSHOVER_URL.to_string() })
    }

    /// Same sink pointed at a different endpoint — test servers only.
    #[cfg(test)]
    pub fn with_url(app_token: Option<String>, url: &str) -> Result<Self, SinkError> {
        let mut sink = Self::new(app_token)?;
        sink.url = url.to_string();
        Ok(sink)
    }
}

impl NotificationSink for PushoverSink {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        let client = self.client.clone();
        let app_token = self.app_token.clone();
        let url = self.url.clone();

        Box::pin(async move {
            let Some(token) = app_token.filter(|t| !t.is_empty()) else {
                error!("pushover app token not set, cannot send notification");
                return Err(SinkError::NotConfigured);
            };

            let payload = MessagesRequest {
                token: &token,
                user: &notification.credential,
                message: &notification.body,
                title: &notification.title,
                priority: notification.priority,
            };

            let response = client
                .post(&url)
                .form(&payload)
                .send()
                .await
                .map_err(|e| SinkError::Unreachable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read error body>".to_string());
                error!(%status, body = %body, "pushover rejected the request");
                return Err(SinkError::Rejected(format!("HTTP {status}: {body}")));
            }

            info!(
                user = %key_prefix(&notification.credential),
                "pushover notification sent"
            );
            Ok(())
        })
    }
}

/// First 8 characters of a user key — enough to correlate logs without
/// leaking the credential.
fn key_prefix(key: &str) -> &str {
    let end = key.char_indices().nth(8).map_or(key.len(), |(i, _)| i);
    &key[..end]
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    token: &'a str,
    user: &'a str,
    message: &'a str,
    title: &'a str,
    priority: i32,
}
