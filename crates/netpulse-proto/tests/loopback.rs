// End-to-end agent/collector tests over real loopback TCP sockets.
#![allow(clippy::unwrap_used, clippy::as_conversions, clippy::cast_precision_loss)]

use std::net::SocketAddr;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use netpulse_proto::{ClientRegistry, CollectorServer, Sample, SessionConfig, TransportSession};

// ── Helpers ─────────────────────────────────────────────────────────

/// Bind a collector on an ephemeral port and run it in the background.
async fn spawn_collector() -> (SocketAddr, CancellationToken, ClientRegistry) {
    let server = CollectorServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let clients = server.clients();

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        server.run(run_cancel).await;
    });

    (addr, cancel, clients)
}

async fn connected_session(addr: SocketAddr) -> TransportSession {
    let mut session = TransportSession::new(addr.to_string(), SessionConfig::default());
    session.connect().await.unwrap();
    session
}

/// Poll until the registry holds exactly `n` agents.
async fn wait_for_clients(clients: &ClientRegistry, n: usize) {
    for _ in 0..100 {
        if clients.len() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {n} entries (currently {})", clients.len());
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_echoes_sample_unchanged() {
    let (addr, cancel, _clients) = spawn_collector().await;
    let mut session = connected_session(addr).await;

    let sample = Sample::new(12.5, 3.2, 1000, 500, 45, 1);
    let ack = session.exchange(sample).await.unwrap();

    assert_eq!(ack, sample);
    assert!(session.is_connected());

    session.close().await;
    cancel.cancel();
}

#[tokio::test]
async fn test_session_survives_many_exchanges() {
    let (addr, cancel, _clients) = spawn_collector().await;
    let mut session = connected_session(addr).await;

    for i in 0..20u64 {
        let sample = Sample::new(i as f64, (i * 2) as f64, i, i * 2, 30, 0);
        let ack = session.exchange(sample).await.unwrap();
        assert_eq!(ack, sample);
    }

    session.close().await;
    cancel.cancel();
}

// ── Registry bookkeeping ────────────────────────────────────────────

#[tokio::test]
async fn test_registry_tracks_connect_and_disconnect() {
    let (addr, cancel, clients) = spawn_collector().await;

    let mut session = connected_session(addr).await;
    session
        .exchange(Sample::new(1.0, 1.0, 1, 1, 20, 0))
        .await
        .unwrap();
    wait_for_clients(&clients, 1).await;

    let entry = clients.get("127.0.0.1").unwrap();
    assert!(entry.samples_received >= 1);
    drop(entry);

    session.close().await;
    wait_for_clients(&clients, 0).await;

    cancel.cancel();
}

// ── Failure isolation ───────────────────────────────────────────────

#[tokio::test]
async fn test_one_agent_dying_leaves_others_connected() {
    let (addr, cancel, _clients) = spawn_collector().await;

    let mut doomed = connected_session(addr).await;
    let mut survivor = connected_session(addr).await;

    let sample = Sample::new(2.0, 1.0, 10, 5, 25, 0);
    assert_eq!(doomed.exchange(sample).await.unwrap(), sample);
    assert_eq!(survivor.exchange(sample).await.unwrap(), sample);

    doomed.close().await;

    // The surviving connection keeps exchanging after its sibling is gone.
    for _ in 0..3 {
        assert_eq!(survivor.exchange(sample).await.unwrap(), sample);
    }

    survivor.close().await;
    cancel.cancel();
}

// ── Reconnection ────────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_after_collector_restart() {
    let (addr, cancel, _clients) = spawn_collector().await;
    let mut session = connected_session(addr).await;

    let sample = Sample::new(5.5, 2.5, 100, 50, 35, 2);
    assert_eq!(session.exchange(sample).await.unwrap(), sample);

    // Kill the collector mid-session.
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The next exchange fails and drops the session to disconnected;
    // the sample is lost by design.
    let err = session.exchange(sample).await.unwrap_err();
    assert!(err.is_transient(), "expected a transient error, got {err}");
    assert!(!session.is_connected());

    // Restart a collector on the same port (tokio sets SO_REUSEADDR).
    let server = CollectorServer::bind(&addr.to_string()).await.unwrap();
    let cancel2 = CancellationToken::new();
    let run_cancel = cancel2.clone();
    tokio::spawn(async move {
        server.run(run_cancel).await;
    });

    // Same session object reconnects and resumes exchanging.
    session.connect().await.unwrap();
    let fresh = Sample::new(7.0, 3.0, 110, 55, 40, 1);
    assert_eq!(session.exchange(fresh).await.unwrap(), fresh);

    session.close().await;
    cancel2.cancel();
}

#[tokio::test]
async fn test_connect_refused_leaves_session_disconnected() {
    // Bind then immediately drop a listener to get a dead port.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = dead.local_addr().unwrap();
    drop(dead);

    let mut session = TransportSession::new(
        addr.to_string(),
        SessionConfig {
            connect_timeout: Duration::from_millis(500),
            exchange_timeout: Duration::from_millis(500),
        },
    );

    assert!(session.connect().await.is_err());
    assert!(!session.is_connected());

    // A later connect on the same session still works once something listens.
    let server = CollectorServer::bind(&addr.to_string()).await.unwrap();
    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        server.run(run_cancel).await;
    });

    session.connect().await.unwrap();
    assert!(session.is_connected());

    session.close().await;
    cancel.cancel();
}
