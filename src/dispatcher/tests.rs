use super::*;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::adapter::MemoryConfigStore;
use crate::error::{ConfigError, Error};
use crate::testkit;
use crate::testkit::transport::ScriptedTransport;

// -- Helpers --------------------------------------------------------------

fn dispatcher(transport: Arc<ScriptedTransport>, pool: PoolConfig) -> Dispatcher {
    Dispatcher::new(Arc::new(MemoryConfigStore::new()), transport, pool)
}

async fn ready(transport: Arc<ScriptedTransport>, pool: PoolConfig) -> Arc<Dispatcher> {
    let d = dispatcher(transport, pool);
    d.update_config(testkit::config::smtp()).await.unwrap();
    Arc::new(d)
}

/// Poll `cond` until it holds, sleeping briefly between checks.
async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached");
}

fn spawn_send(
    d: &Arc<Dispatcher>,
    contact: &str,
) -> tokio::task::JoinHandle<std::result::Result<(), DeliveryError>> {
    let d = Arc::clone(d);
    let msg = testkit::domain::message(contact);
    tokio::spawn(async move { d.send(msg).await })
}

// -- Readiness ------------------------------------------------------------

#[tokio::test]
async fn not_ready_before_configuration() {
    let d = dispatcher(Arc::new(ScriptedTransport::new()), testkit::config::pool(4, 2));
    assert!(!d.is_ready());
    assert!(d.status().is_none());
    assert_eq!(
        d.send(testkit::domain::message("a@b")).await,
        Err(DeliveryError::NotReady)
    );
    assert!(matches!(
        d.batch_send(&testkit::domain::params(2)).await,
        Err(Error::Delivery(DeliveryError::NotReady))
    ));
}

#[tokio::test]
async fn update_config_makes_ready() {
    let d = ready(Arc::new(ScriptedTransport::new()), testkit::config::pool(4, 3)).await;
    assert!(d.is_ready());

    let status = d.status().unwrap();
    assert_eq!(status.generation, 1);
    assert_eq!(status.address, "smtp.example.com:587");
    assert_eq!(status.queued, 0);
}

#[tokio::test]
async fn missing_key_stops_pool_and_reports_it() {
    let d = ready(Arc::new(ScriptedTransport::new()), testkit::config::pool(4, 2)).await;

    let err = d
        .update_config(testkit::config::smtp_without(keys::PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::Missing { ref key }) if key == "password"
    ));
    assert!(!d.is_ready());

    // A corrected update brings it back.
    d.update_config(testkit::config::smtp()).await.unwrap();
    assert!(d.is_ready());
    assert_eq!(d.status().unwrap().generation, 2);
}

#[tokio::test]
async fn start_uses_prefilled_store() {
    let store = Arc::new(MemoryConfigStore::with_values(testkit::config::smtp()));
    let d = Dispatcher::new(
        store,
        Arc::new(ScriptedTransport::new()),
        testkit::config::pool(4, 1),
    );
    d.start().await.unwrap();
    assert!(d.is_ready());
}

// -- Delivery -------------------------------------------------------------

#[tokio::test]
async fn send_reaches_transport() {
    let transport = Arc::new(ScriptedTransport::new());
    let d = ready(transport.clone(), testkit::config::pool(4, 2)).await;

    d.send(testkit::domain::message("ops@example.com"))
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ops@example.com");
}

#[tokio::test]
async fn sender_address_falls_back_to_username() {
    let transport = Arc::new(ScriptedTransport::new());
    let d = ready(transport.clone(), testkit::config::pool(4, 1)).await;
    d.notify(&testkit::domain::param("x@y")).await.unwrap();
    assert_eq!(transport.sent()[0].from, "u");

    let mut cfg = testkit::config::smtp();
    cfg.insert(keys::SENDER_ADDRESS.into(), "noreply@example.com".into());
    d.update_config(cfg).await.unwrap();
    d.notify(&testkit::domain::param("x@y")).await.unwrap();
    assert_eq!(transport.sent()[1].from, "noreply@example.com");
}

#[tokio::test]
async fn batch_send_with_healthy_transport_has_no_failures() {
    let transport = Arc::new(ScriptedTransport::new());
    let d = ready(transport.clone(), testkit::config::pool(8, 3)).await;

    let params = testkit::domain::params(10);
    let failed = d.batch_send(&params).await.unwrap();
    assert!(failed.is_empty());

    let mut delivered: Vec<String> = transport.sent().into_iter().map(|m| m.to).collect();
    delivered.sort();
    let mut expected: Vec<String> = params.into_iter().map(|p| p.contact).collect();
    expected.sort();
    assert_eq!(delivered, expected);
    // Connections are reused: never more dials than workers.
    assert!(transport.counters().dials() <= 3);
}

#[tokio::test(start_paused = true)]
async fn slow_batch_longer_than_send_timeout_has_no_failures() {
    let transport =
        Arc::new(ScriptedTransport::new().with_send_delay(Duration::from_secs(1)));
    let d = ready(transport.clone(), testkit::config::pool(100, 1)).await;

    // 120 one-second sends take twice SEND_TIMEOUT end to end.
    let failed = d.batch_send(&testkit::domain::params(120)).await.unwrap();

    assert!(
        failed.is_empty(),
        "{} failed, first: {:?}",
        failed.len(),
        failed.first()
    );
    assert_eq!(transport.sent().len(), 120);
}

#[tokio::test]
async fn failing_dial_never_reports_success() {
    let transport = Arc::new(ScriptedTransport::new().failing_dial("connection refused"));
    let d = ready(transport.clone(), testkit::config::pool(8, 2)).await;

    for i in 0..3 {
        let result = d.send(testkit::domain::message(&format!("u{i}@x"))).await;
        assert_eq!(
            result,
            Err(DeliveryError::Dial("connection refused".into()))
        );
    }

    let failed = d.batch_send(&testkit::domain::params(4)).await.unwrap();
    assert_eq!(failed.len(), 4);
    assert!(failed.iter().all(|f| f.reason.contains("connection refused")));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn batch_send_isolates_failures() {
    let transport = Arc::new(ScriptedTransport::new().with_send_results(vec![
        Ok(()),
        Err(crate::error::TransportError::new("550 mailbox unavailable")),
    ]));
    // Single worker keeps the send order deterministic.
    let d = ready(transport.clone(), testkit::config::pool(8, 1)).await;

    let failed = d.batch_send(&testkit::domain::params(4)).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].reason.contains("550"));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn send_times_out_within_bound() {
    let transport =
        Arc::new(ScriptedTransport::new().with_dial_delay(SEND_TIMEOUT * 2));
    let d = ready(transport, testkit::config::pool(4, 1)).await;

    let started = tokio::time::Instant::now();
    let result = d.send(testkit::domain::message("slow@x")).await;
    assert_eq!(result, Err(DeliveryError::Timeout));
    let elapsed = started.elapsed();
    assert!(elapsed >= SEND_TIMEOUT && elapsed < SEND_TIMEOUT + Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn idle_connection_is_redialed_after_window() {
    let transport = Arc::new(ScriptedTransport::new());
    let d = ready(transport.clone(), testkit::config::pool(4, 1)).await;

    d.send(testkit::domain::message("a@x")).await.unwrap();
    d.send(testkit::domain::message("b@x")).await.unwrap();
    assert_eq!(transport.counters().dials(), 1);

    tokio::time::sleep(IDLE_TIMEOUT + Duration::from_secs(1)).await;
    assert_eq!(transport.counters().closes(), 1);

    d.send(testkit::domain::message("c@x")).await.unwrap();
    assert_eq!(transport.counters().dials(), 2);
}

// -- Backpressure and restarts --------------------------------------------

#[tokio::test]
async fn full_queue_blocks_send_until_worker_frees_slot() {
    let gate = Arc::new(Semaphore::new(0));
    let transport = Arc::new(ScriptedTransport::new().with_send_gate(gate.clone()));
    let d = ready(transport.clone(), testkit::config::pool(1, 1)).await;

    // First message occupies the only worker.
    let first = spawn_send(&d, "first@x");
    let counters = transport.counters();
    wait_for(|| counters.sends() == 1).await;

    // Second fills the queue.
    let second = spawn_send(&d, "second@x");
    wait_for(|| d.status().map(|s| s.queued) == Some(1)).await;

    // Third has nowhere to go.
    let third = spawn_send(&d, "third@x");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!third.is_finished());
    assert_eq!(counters.sends(), 1);
    assert_eq!(d.status().unwrap().queued, 1);

    gate.add_permits(3);
    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(second.await.unwrap(), Ok(()));
    assert_eq!(third.await.unwrap(), Ok(()));
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn send_blocked_on_full_queue_times_out() {
    let gate = Arc::new(Semaphore::new(0));
    let transport = Arc::new(ScriptedTransport::new().with_send_gate(gate.clone()));
    let d = ready(transport.clone(), testkit::config::pool(1, 1)).await;
    let counters = transport.counters();

    let _first = spawn_send(&d, "first@x");
    wait_for(|| counters.sends() == 1).await;
    let _second = spawn_send(&d, "second@x");
    wait_for(|| d.status().map(|s| s.queued) == Some(1)).await;

    let third = {
        let d = Arc::clone(&d);
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let result = d.send(testkit::domain::message("third@x")).await;
            (result, started.elapsed())
        })
    };

    let (result, elapsed) = third.await.unwrap();
    assert_eq!(result, Err(DeliveryError::Timeout));
    assert!(elapsed >= SEND_TIMEOUT && elapsed < SEND_TIMEOUT + Duration::from_secs(1));

    // The third message never got a queue slot, so nothing delivers it later.
    gate.add_permits(3);
    wait_for(|| d.status().map(|s| s.queued) == Some(0)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let delivered: Vec<String> = transport.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(delivered, vec!["first@x".to_string()]);
}

#[tokio::test]
async fn restart_fails_queued_units_and_applies_new_settings() {
    let gate = Arc::new(Semaphore::new(0));
    let transport = Arc::new(ScriptedTransport::new().with_send_gate(gate.clone()));
    let d = ready(transport.clone(), testkit::config::pool(4, 1)).await;

    let in_flight = spawn_send(&d, "inflight@x");
    let counters = transport.counters();
    wait_for(|| counters.sends() == 1).await;
    let queued = spawn_send(&d, "queued@x");
    wait_for(|| d.status().map(|s| s.queued) == Some(1)).await;

    let mut cfg = testkit::config::smtp();
    cfg.insert(keys::HOSTNAME.into(), "smtp2.example.com".into());
    let update = {
        let d = Arc::clone(&d);
        tokio::spawn(async move { d.update_config(cfg).await })
    };

    // Queued unit is failed explicitly, never orphaned.
    assert_eq!(queued.await.unwrap(), Err(DeliveryError::Restarted));

    // The in-flight unit completes against the old generation.
    gate.add_permits(2);
    assert_eq!(in_flight.await.unwrap(), Ok(()));
    update.await.unwrap().unwrap();

    d.send(testkit::domain::message("after@x")).await.unwrap();
    assert_eq!(d.status().unwrap().generation, 2);
    let last = transport.dialed_with().pop().unwrap();
    assert_eq!(last.host, "smtp2.example.com");
}

#[tokio::test]
async fn shutdown_makes_not_ready() {
    let d = ready(Arc::new(ScriptedTransport::new()), testkit::config::pool(4, 2)).await;
    d.shutdown().await;
    assert!(!d.is_ready());
    assert_eq!(
        d.send(testkit::domain::message("a@b")).await,
        Err(DeliveryError::NotReady)
    );
}

// -- Validation -----------------------------------------------------------

#[tokio::test]
async fn validate_requires_password() {
    let d = dispatcher(Arc::new(ScriptedTransport::new()), testkit::config::pool(4, 1));
    let err = d
        .validate_config(&testkit::config::smtp_without(keys::PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "require password");
}

#[tokio::test]
async fn validate_classifies_auth_failure() {
    let transport = Arc::new(
        ScriptedTransport::new().failing_dial("535 Error: authentication failed"),
    );
    let d = dispatcher(transport, testkit::config::pool(4, 1));

    let validation = d.validate_config(&testkit::config::smtp()).await.unwrap();
    assert!(!validation.valid);
    assert_eq!(validation.message, "Authentication failed");
}

#[tokio::test]
async fn validate_accepts_reachable_server_without_touching_pool() {
    let transport = Arc::new(ScriptedTransport::new());
    let d = dispatcher(transport.clone(), testkit::config::pool(4, 1));

    let validation = d.validate_config(&testkit::config::smtp()).await.unwrap();
    assert!(validation.valid);
    assert!(validation.message.is_empty());
    assert_eq!(transport.counters().dials(), 1);
    assert_eq!(transport.counters().closes(), 1);
    assert!(!d.is_ready());
    assert_eq!(d.sender_address(), "");
}

#[tokio::test(start_paused = true)]
async fn validate_times_out_slow_server() {
    let transport =
        Arc::new(ScriptedTransport::new().with_dial_delay(VALIDATION_TIMEOUT * 3));
    let d = dispatcher(transport, testkit::config::pool(4, 1));

    let started = tokio::time::Instant::now();
    let validation = d.validate_config(&testkit::config::smtp()).await.unwrap();
    assert_eq!(validation.message, "Connect timeout");
    let elapsed = started.elapsed();
    assert!(elapsed >= VALIDATION_TIMEOUT && elapsed < VALIDATION_TIMEOUT + Duration::from_secs(1));
}
