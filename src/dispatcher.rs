//! Notification dispatch — fans a triggered set out to owning tenants.
//!
//! One notification per matching tenant per event, delivered on independent
//! tasks so a slow or failing delivery never blocks the others. Outcomes are
//! logged only: the mentioned party is not the sender, so there is no one to
//! report a failure back to.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::event::ChatEvent;
use crate::registry::TenantRecord;
use crate::sink::{Notification, NotificationSink};

pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Build one notification per tenant whose watch nick is in `triggered`.
    ///
    /// Pure assembly: a tenant appears at most once regardless of how many
    /// substrings of the text matched their nick.
    pub fn build_notifications(
        triggered: &BTreeSet<String>,
        event: &ChatEvent,
        snapshot: &[TenantRecord],
    ) -> Vec<Notification> {
        snapshot
            .iter()
            .filter(|record| triggered.contains(&record.watch_nick.to_lowercase()))
            .map(|record| Notification {
                credential: record.notification_key.clone(),
                title: format!("IRC Mention in {}!", event.target),
                body: format!("<{}> {}", event.sender, event.text.trim()),
                priority: record.priority,
            })
            .collect()
    }

    /// Deliver to every owning tenant concurrently and await all outcomes.
    ///
    /// Callers that must not block on sink I/O spawn this future. Each
    /// delivery runs on its own task; one tenant's failure never prevents
    /// delivery attempts to the rest.
    pub async fn dispatch(
        &self,
        triggered: BTreeSet<String>,
        event: ChatEvent,
        snapshot: Vec<TenantRecord>,
    ) {
        let notifications = Self::build_notifications(&triggered, &event, &snapshot);
        if notifications.is_empty() {
            return;
        }

        let mut deliveries: JoinSet<Result<(), crate::sink::SinkError>> = JoinSet::new();
        for notification in notifications {
            info!(
                title = %notification.title,
                "sending notification for mention"
            );
            deliveries.spawn(self.sink.deliver(notification));
        }

        while let Some(res) = deliveries.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "notification delivery failed"),
                Err(e) => error!(error = %e, "delivery task panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::sink::{DeliveryFuture, SinkError};

    /// Records every delivery; fails those whose credential is on the
    /// poison list.
    struct RecordingSink {
        delivered: Mutex<Vec<Notification>>,
        fail_credentials: Vec<String>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self { delivered: Mutex::new(Vec::new()), fail_credentials: Vec::new() })
        }

        fn failing_for(credential: &str) -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail_credentials: vec![credential.to_string()],
            })
        }

        fn delivered(&self) -> Vec<Notification> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notification: Notification) -> DeliveryFuture {
            let fail = self.fail_credentials.contains(&notification.credential);
            if !fail {
                self.delivered.lock().unwrap().push(notification);
            }
            Box::pin(async move {
                if fail {
                    Err(SinkError::Rejected("poisoned".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn tenant(key: &str, watch_nick: &str, priority: i32) -> TenantRecord {
        TenantRecord {
            notification_key: key.to_string(),
            watch_nick: watch_nick.to_string(),
            priority,
        }
    }

    fn triggered(nicks: &[&str]) -> BTreeSet<String> {
        nicks.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn one_delivery_per_matching_tenant() {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone());
        let snapshot = vec![tenant("key-carol", "bob", 0), tenant("key-dave", "alice", 0)];
        let event = ChatEvent::new("carol", "#channel", "hey bob check this");

        dispatcher
            .dispatch(triggered(&["bob"]), event, snapshot)
            .await;

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].credential, "key-carol");
    }

    #[tokio::test]
    async fn notification_content_matches_contract() {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone());
        let snapshot = vec![tenant("operator-key", "bob", 2)];
        let event = ChatEvent::new("carol", "#channel", "  hey bob check this  ");

        dispatcher
            .dispatch(triggered(&["bob"]), event, snapshot)
            .await;

        let delivered = sink.delivered();
        assert_eq!(delivered[0].title, "IRC Mention in #channel!");
        assert_eq!(delivered[0].body, "<carol> hey bob check this");
        assert_eq!(delivered[0].priority, 2);
    }

    #[tokio::test]
    async fn shared_watch_nick_fans_out_to_all_owners() {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone());
        let snapshot = vec![tenant("key-a", "bob", 0), tenant("key-b", "Bob", 0)];
        let event = ChatEvent::new("carol", "#channel", "bob!");

        dispatcher
            .dispatch(triggered(&["bob"]), event, snapshot)
            .await;

        assert_eq!(sink.delivered().len(), 2);
    }

    #[tokio::test]
    async fn failure_does_not_block_other_tenants() {
        let sink = RecordingSink::failing_for("key-bad");
        let dispatcher = Dispatcher::new(sink.clone());
        let snapshot = vec![tenant("key-bad", "bob", 0), tenant("key-good", "bob", 0)];
        let event = ChatEvent::new("carol", "#channel", "bob?");

        dispatcher
            .dispatch(triggered(&["bob"]), event, snapshot)
            .await;

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].credential, "key-good");
    }

    #[tokio::test]
    async fn empty_triggered_set_sends_nothing() {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone());
        let snapshot = vec![tenant("key", "bob", 0)];
        let event = ChatEvent::new("carol", "#channel", "quiet");

        dispatcher.dispatch(BTreeSet::new(), event, snapshot).await;
        assert!(sink.delivered().is_empty());
    }
}
