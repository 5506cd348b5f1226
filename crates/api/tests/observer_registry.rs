//! Unit tests for `ObserverRegistry`.
//!
//! These exercise the registry directly, without HTTP upgrades: register
//! and unregister semantics, broadcast delivery, stalled-observer removal
//! and shutdown.

use axum::extract::ws::Message;
use cipherq_api::ws::registry::OBSERVER_BUFFER;
use cipherq_api::ws::ObserverRegistry;

// ---------------------------------------------------------------------------
// Test: register and unregister adjust the count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_and_unregister_adjust_count() {
    let registry = ObserverRegistry::new();
    assert_eq!(registry.connection_count().await, 0);

    let _rx = registry.register("conn-1".to_string()).await;
    assert_eq!(registry.connection_count().await, 1);

    registry.unregister("nonexistent").await;
    assert_eq!(registry.connection_count().await, 1);

    registry.unregister("conn-1").await;
    assert_eq!(registry.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast delivers the text to every observer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_all_observers() {
    let registry = ObserverRegistry::new();
    let mut rx1 = registry.register("conn-1".to_string()).await;
    let mut rx2 = registry.register("conn-2".to_string()).await;

    let delivered = registry.broadcast(r#"{"jobId":"1"}"#).await;
    assert_eq!(delivered, 2);

    for rx in [&mut rx1, &mut rx2] {
        match rx.recv().await {
            Some(Message::Text(text)) => assert_eq!(text.as_str(), r#"{"jobId":"1"}"#),
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Test: a closed observer is dropped without affecting the rest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_observer_is_removed_on_broadcast() {
    let registry = ObserverRegistry::new();
    let rx1 = registry.register("gone".to_string()).await;
    let mut rx2 = registry.register("alive".to_string()).await;
    drop(rx1);

    let delivered = registry.broadcast("hello").await;

    assert_eq!(delivered, 1);
    assert_eq!(registry.connection_count().await, 1);
    assert!(matches!(rx2.recv().await, Some(Message::Text(_))));
}

// ---------------------------------------------------------------------------
// Test: an observer that stops draining is disconnected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stalled_observer_is_removed_when_buffer_fills() {
    let registry = ObserverRegistry::new();
    let _stalled = registry.register("stalled".to_string()).await;
    let mut healthy = registry.register("healthy".to_string()).await;

    for i in 0..=OBSERVER_BUFFER {
        registry.broadcast(&format!("msg-{i}")).await;
        // Keep the healthy observer drained.
        assert!(healthy.recv().await.is_some());
    }

    assert_eq!(registry.connection_count().await, 1);
    assert_eq!(registry.broadcast("after").await, 1);
}

// ---------------------------------------------------------------------------
// Test: ping_all sends a Ping frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_all_sends_ping_frames() {
    let registry = ObserverRegistry::new();
    let mut rx = registry.register("conn-1".to_string()).await;

    assert_eq!(registry.ping_all().await, 1);
    assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() sends Close and clears all connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let registry = ObserverRegistry::new();
    let mut rx1 = registry.register("conn-1".to_string()).await;
    let mut rx2 = registry.register("conn-2".to_string()).await;

    registry.shutdown_all().await;

    assert_eq!(registry.connection_count().await, 0);
    assert!(matches!(rx1.recv().await, Some(Message::Close(None))));
    assert!(matches!(rx2.recv().await, Some(Message::Close(None))));
    // Senders were dropped with the registry entries.
    assert!(rx1.recv().await.is_none());
}
