//! End-to-end registration → classification → dispatch scenarios, run
//! against the public API with a recording sink and tempdir storage.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use nickwatch_bot::classifier::classify;
use nickwatch_bot::commands::CommandHandler;
use nickwatch_bot::dispatcher::Dispatcher;
use nickwatch_bot::event::ChatEvent;
use nickwatch_bot::registry::Registry;
use nickwatch_bot::sink::{DeliveryFuture, Notification, NotificationSink};

const BOT: &str = "nickwatchz0r";
const KEY_32: &str = "abcdefghijklmnopqrstuvwxyz012345"; // 32 chars

struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self { delivered: Mutex::new(Vec::new()) })
    }

    fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: Notification) -> DeliveryFuture {
        self.delivered.lock().unwrap().push(notification);
        Box::pin(async { Ok(()) })
    }
}

/// Classify a channel event and dispatch whatever triggered.
async fn classify_and_dispatch(registry: &Registry, dispatcher: &Dispatcher, event: ChatEvent) {
    let snapshot = registry.snapshot();
    let triggered = classify(&event, &snapshot, BOT);
    dispatcher.dispatch(triggered, event, snapshot).await;
}

#[tokio::test]
async fn register_then_mention_delivers_to_the_tenant() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::load(&dir.path().join("users.json"));
    let handler = CommandHandler::new(BOT, "mynick");

    // Private registration: 32-char key, nick "alice".
    let register = ChatEvent::new("carol", BOT, format!("register {KEY_32} alice"));
    let reply = handler.handle_direct(&mut registry, &register).unwrap();
    assert!(reply.text.contains("'alice'"));
    assert_eq!(registry.len(), 1);

    // A channel mention of "alice" now notifies carol's key.
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());
    let mention = ChatEvent::new("dave", "#channel", "alice: ping");
    classify_and_dispatch(&registry, &dispatcher, mention).await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].credential, KEY_32);
}

#[tokio::test]
async fn single_tenant_mention_carries_operator_credential() {
    let registry = Registry::single_tenant(BOT, Some(KEY_32), "bob", 0);
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());

    let mention = ChatEvent::new("carol", "#channel", "hey bob check this");
    classify_and_dispatch(&registry, &dispatcher, mention).await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].credential, KEY_32);
    assert_eq!(delivered[0].title, "IRC Mention in #channel!");
    assert_eq!(delivered[0].body, "<carol> hey bob check this");
}

#[tokio::test]
async fn distinct_tenants_each_get_exactly_one_delivery() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::load(&dir.path().join("users.json"));
    let key_a = "a".repeat(30);
    let key_b = "b".repeat(30);
    registry.register("carol", &key_a, "alice").unwrap();
    registry.register("dave", &key_b, "bob").unwrap();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());
    let mention = ChatEvent::new("erin", "#channel", "alice, bob: lunch?");
    classify_and_dispatch(&registry, &dispatcher, mention).await;

    let mut credentials: Vec<String> =
        sink.delivered().into_iter().map(|n| n.credential).collect();
    credentials.sort();
    assert_eq!(credentials, vec![key_a, key_b]);
}

#[tokio::test]
async fn self_mention_delivers_nothing() {
    let registry = Registry::single_tenant(BOT, Some(KEY_32), "bob", 0);
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());

    // Sender equals the watched nick (case-insensitive) — no delivery.
    let mention = ChatEvent::new("Bob", "#channel", "bob here, back later");
    classify_and_dispatch(&registry, &dispatcher, mention).await;

    assert!(sink.delivered().is_empty());
}

#[tokio::test]
async fn reregistration_retires_the_old_watch_nick() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::load(&dir.path().join("users.json"));
    let handler = CommandHandler::new(BOT, "mynick");

    let first = ChatEvent::new("carol", BOT, format!("register {KEY_32} alice"));
    handler.handle_direct(&mut registry, &first).unwrap();
    let second = ChatEvent::new("carol", BOT, format!("register {KEY_32} alicia"));
    handler.handle_direct(&mut registry, &second).unwrap();

    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());

    // Old nick no longer triggers for carol: the watch nick must appear in
    // the text, and "alicia" does not appear in "hi alice".
    let old = ChatEvent::new("dave", "#channel", "hi alice");
    classify_and_dispatch(&registry, &dispatcher, old).await;
    assert!(sink.delivered().is_empty());

    let new = ChatEvent::new("dave", "#channel", "hi alicia");
    classify_and_dispatch(&registry, &dispatcher, new).await;
    assert_eq!(sink.delivered().len(), 1);
}

#[tokio::test]
async fn registry_persists_across_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.json");
    let key = "k".repeat(30);

    {
        let mut registry = Registry::load(&path);
        registry.register("carol", &key, "alice").unwrap();
    }

    // Fresh process: the tenant is still there and still triggers.
    let registry = Registry::load(&path);
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::new(sink.clone());
    let mention = ChatEvent::new("dave", "#channel", "alice?");
    classify_and_dispatch(&registry, &dispatcher, mention).await;

    assert_eq!(sink.delivered().len(), 1);
    assert_eq!(sink.delivered()[0].credential, key);
}
