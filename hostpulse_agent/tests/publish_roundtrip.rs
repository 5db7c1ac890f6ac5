//! End-to-end publisher tick against a local capture server: the posted
//! body must parse as the documented wire shape.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use hostpulse_agent::config::AgentConfig;
use hostpulse_agent::probes::FsSource;
use hostpulse_agent::publish::run_publisher;
use hostpulse_agent::state::AgentState;
use hostpulse_agent::types::Snapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

type Captured = (HeaderMap, Bytes);

async fn capture(
    State(tx): State<mpsc::Sender<Captured>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let _ = tx.send((headers, body)).await;
    StatusCode::OK
}

#[tokio::test(flavor = "multi_thread")]
async fn one_tick_posts_a_parsable_snapshot() {
    let (tx, mut rx) = mpsc::channel::<Captured>(8);
    let app = Router::new().route("/push", post(capture)).with_state(tx);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let cfg = AgentConfig {
        url: format!("http://{addr}/push"),
        // Unroutable echo endpoint so the throttled ip lookup fails fast
        // instead of leaving the test machine's address in the snapshot.
        ip_echo_url: "http://127.0.0.1:1".into(),
        ..AgentConfig::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AgentState::new(&cfg, Arc::new(FsSource), shutdown_rx.clone());

    let publisher = tokio::spawn(run_publisher(state, cfg.clone(), shutdown_rx));

    let (headers, body) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no POST within 10s")
        .expect("capture channel closed");

    // Stop the loop before it sleeps out a full publish interval.
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), publisher)
        .await
        .expect("publisher did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/json; charset=utf-8"
    );

    let snap: Snapshot = serde_json::from_slice(&body).expect("wire shape");
    assert!(snap.post_unix_time > 0);
    assert!((snap.time_ns as u128) < cfg.publish_interval.as_nanos());
    assert_eq!(snap.disk_read.len(), cfg.window_capacity);
    assert_eq!(snap.disk_write.len(), cfg.window_capacity);
    assert_eq!(snap.net_read.len(), cfg.window_capacity);
    assert_eq!(snap.net_write.len(), cfg.window_capacity);
    assert_eq!(snap.net_read_num.len(), cfg.window_capacity);
    assert_eq!(snap.net_write_num.len(), cfg.window_capacity);
    assert_eq!(snap.cpus.len(), cfg.window_capacity);
}
