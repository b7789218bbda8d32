//! Notification sink — the delivery contract to the external push endpoint.
//!
//! The dispatcher only sees [`NotificationSink`]; tests substitute a
//! recording implementation, production wires in [`pushover::PushoverSink`].

pub mod pushover;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// One outbound push notification, fully resolved per tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The owning tenant's sink credential.
    pub credential: String,
    pub title: String,
    pub body: String,
    pub priority: i32,
}

/// Why a delivery attempt failed. Never retried by this core.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink endpoint could not be reached (transport failure, timeout).
    #[error("sink unreachable: {0}")]
    Unreachable(String),

    /// The sink answered with a non-success response.
    #[error("sink rejected the request: {0}")]
    Rejected(String),

    /// The sink credentials were never configured.
    #[error("sink credentials not configured")]
    NotConfigured,
}

/// A boxed, owned future returned by [`NotificationSink::deliver`].
pub type DeliveryFuture = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'static>>;

/// External push-notification delivery endpoint.
///
/// Implementations capture their client state at construction; `deliver`
/// returns an owned future so callers can spawn it on the runtime without
/// borrowing the sink.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: Notification) -> DeliveryFuture;
}
