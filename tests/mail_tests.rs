//! End-to-end delivery through the SMTP transport against the in-process
//! fake server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier::adapter::{MailTransport, MemoryConfigStore};
use courier::dispatcher::{validate_config, Dispatcher};
use courier::domain::keys;
use courier::testkit;
use courier::testkit::smtp::{spawn_server, FakeServer};

fn smtp_at(port: u16) -> HashMap<String, String> {
    let mut configs = testkit::config::smtp();
    configs.insert(keys::HOSTNAME.into(), "127.0.0.1".into());
    configs.insert(keys::HOSTPORT.into(), port.to_string());
    configs.insert(keys::USERNAME.into(), "alerts@example.com".into());
    configs
}

#[tokio::test]
async fn batch_reaches_the_server_authenticated() {
    let server = spawn_server(FakeServer::default()).await;
    let d = Dispatcher::new(
        Arc::new(MemoryConfigStore::new()),
        Arc::new(MailTransport::new()),
        testkit::config::pool(8, 2),
    );
    d.update_config(smtp_at(server.port)).await.unwrap();

    let failed = d.batch_send(&testkit::domain::params(5)).await.unwrap();
    d.shutdown().await;

    assert!(failed.is_empty(), "unexpected failures: {failed:?}");
    let mut seen = server.recipients();
    seen.sort();
    let mut expected: Vec<String> = (0..5).map(|i| format!("user{i}@example.com")).collect();
    expected.sort();
    assert_eq!(seen, expected);
    assert!(server.commands().iter().any(|c| c.starts_with("AUTH ")));
    assert!(server
        .commands()
        .iter()
        .any(|c| c == "MAIL FROM:<alerts@example.com>"));
}

#[tokio::test]
async fn wrong_password_is_reported_as_authentication_failure() {
    let server = spawn_server(FakeServer {
        reject_auth: true,
        ..FakeServer::default()
    })
    .await;
    let mut configs = smtp_at(server.port);
    configs.insert(keys::PASSWORD.into(), "WRONG".into());

    let validation = validate_config(Arc::new(MailTransport::new()), &configs)
        .await
        .unwrap();

    assert!(!validation.valid);
    assert_eq!(validation.message, "Authentication failed");
    assert!(server.recipients().is_empty());
}

#[tokio::test]
async fn validation_accepts_a_healthy_server() {
    let server = spawn_server(FakeServer::default()).await;

    let validation = validate_config(Arc::new(MailTransport::new()), &smtp_at(server.port))
        .await
        .unwrap();

    assert!(validation.valid, "{}", validation.message);
}

#[tokio::test]
async fn server_that_never_greets_is_a_connect_timeout() {
    let server = spawn_server(FakeServer {
        silent: true,
        ..FakeServer::default()
    })
    .await;

    let transport = MailTransport::new().with_io_timeout(Duration::from_millis(200));
    let validation = validate_config(Arc::new(transport), &smtp_at(server.port))
        .await
        .unwrap();

    assert!(!validation.valid);
    assert_eq!(validation.message, "Connect timeout");
}
