//! Integration tests for the status fan-out loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use cipherq_api::fanout::StatusFanout;
use cipherq_api::ws::ObserverRegistry;
use cipherq_core::topics::RESULT_TOPIC;
use cipherq_events::{LocalBus, MessageBus};

const RESULT: &str =
    r#"{"jobId":"7","fileName":"a.txt","operation":"encrypt","status":"success"}"#;

async fn expect_text(rx: &mut tokio::sync::mpsc::Receiver<Message>) -> String {
    match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Some(Message::Text(text))) => text.as_str().to_owned(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: every remaining observer gets the result text verbatim
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relays_results_verbatim_to_remaining_observers() {
    let bus = Arc::new(LocalBus::new(16));
    let observers = Arc::new(ObserverRegistry::new());
    let mut rx1 = observers.register("a".to_string()).await;
    let dropped = observers.register("b".to_string()).await;
    let mut rx3 = observers.register("c".to_string()).await;
    drop(dropped);

    let subscription = bus.subscribe(RESULT_TOPIC).await.unwrap();
    let handle = tokio::spawn(StatusFanout::new(observers.clone()).run(subscription));

    bus.publish(RESULT_TOPIC, RESULT.to_string()).await.unwrap();

    assert_eq!(expect_text(&mut rx1).await, RESULT);
    assert_eq!(expect_text(&mut rx3).await, RESULT);
    assert_eq!(observers.connection_count().await, 2);

    bus.close().await;
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("fan-out ends when the bus closes")
        .unwrap();
}

// ---------------------------------------------------------------------------
// Test: undecodable payloads are still relayed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relays_payloads_that_do_not_decode() {
    let bus = Arc::new(LocalBus::new(16));
    let observers = Arc::new(ObserverRegistry::new());
    let mut rx = observers.register("a".to_string()).await;

    let subscription = bus.subscribe(RESULT_TOPIC).await.unwrap();
    tokio::spawn(StatusFanout::new(observers.clone()).run(subscription));

    bus.publish(RESULT_TOPIC, "not a result".to_string())
        .await
        .unwrap();

    assert_eq!(expect_text(&mut rx).await, "not a result");
}

// ---------------------------------------------------------------------------
// Test: results published with no observers are simply discarded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn results_without_observers_are_discarded() {
    let bus = Arc::new(LocalBus::new(16));
    let observers = Arc::new(ObserverRegistry::new());

    let subscription = bus.subscribe(RESULT_TOPIC).await.unwrap();
    let handle = tokio::spawn(StatusFanout::new(observers.clone()).run(subscription));

    bus.publish(RESULT_TOPIC, RESULT.to_string()).await.unwrap();

    // A late observer does not see earlier results.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut late = observers.register("late".to_string()).await;
    bus.close().await;
    handle.await.unwrap();

    assert!(late.try_recv().is_err());
}
