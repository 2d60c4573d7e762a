use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use wws_connector::{http, hub};

/// Starts a full Connector router on an ephemeral port and returns its
/// address. Mirrors the pattern `microsoft-dev-tunnels` uses to test its
/// WebSocket byte-stream wrapper against a real socket rather than mocks.
async fn spawn_connector() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let handle = hub::spawn();
    let app = http::router(handle, std::path::Path::new("./nonexistent-public-dir"));

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

async fn create_channel(addr: SocketAddr, kind: &str) -> String {
    let url = format!("http://{addr}/create?type={kind}");
    reqwest::get(url)
        .await
        .expect("create request")
        .text()
        .await
        .expect("create body")
}

#[tokio::test]
async fn relay_forwards_frames_both_ways() {
    let addr = spawn_connector().await;
    let id = create_channel(addr, "tunnel").await;

    let (mut proxy, _) = connect_async(format!("ws://{addr}/ws/proxy/{id}"))
        .await
        .expect("proxy connects");
    let (mut tunnel, _) = connect_async(format!("ws://{addr}/ws/tunnel/{id}"))
        .await
        .expect("tunnel connects");

    proxy
        .send(Message::Binary(b"hello from proxy".to_vec().into()))
        .await
        .expect("proxy send");
    let reply = tokio::time::timeout(Duration::from_secs(2), tunnel.next())
        .await
        .expect("no timeout")
        .expect("frame present")
        .expect("no ws error");
    assert_eq!(reply.into_data().as_ref(), b"hello from proxy");

    tunnel
        .send(Message::Binary(b"hello from tunnel".to_vec().into()))
        .await
        .expect("tunnel send");
    let reply = tokio::time::timeout(Duration::from_secs(2), proxy.next())
        .await
        .expect("no timeout")
        .expect("frame present")
        .expect("no ws error");
    assert_eq!(reply.into_data().as_ref(), b"hello from tunnel");
}

#[tokio::test]
async fn disconnecting_one_side_closes_the_other() {
    let addr = spawn_connector().await;
    let id = create_channel(addr, "tunnel").await;

    let (proxy, _) = connect_async(format!("ws://{addr}/ws/proxy/{id}"))
        .await
        .expect("proxy connects");
    let (mut tunnel, _) = connect_async(format!("ws://{addr}/ws/tunnel/{id}"))
        .await
        .expect("tunnel connects");

    drop(proxy);

    let next = tokio::time::timeout(Duration::from_secs(2), tunnel.next())
        .await
        .expect("no timeout");
    assert!(
        matches!(next, Some(Ok(Message::Close(_))) | None),
        "expected tunnel side to observe a close after its peer vanished, got {next:?}"
    );
}

#[tokio::test]
async fn unknown_channel_registration_is_accepted_but_unattached() {
    let addr = spawn_connector().await;
    let bogus_id = uuid::Uuid::new_v4();

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws/proxy/{bogus_id}"))
        .await
        .expect("upgrade still succeeds for an unknown channel id");

    // No peer is ever going to show up, so nothing should arrive — but the
    // tar-trap delay means the socket also shouldn't be closed immediately.
    let result = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    assert!(result.is_err(), "socket should still be open, got {result:?}");
}

#[tokio::test]
async fn re_registering_a_role_evicts_the_previous_occupant() {
    let addr = spawn_connector().await;
    let id = create_channel(addr, "tunnel").await;

    let (mut first_tunnel, _) = connect_async(format!("ws://{addr}/ws/tunnel/{id}"))
        .await
        .expect("first tunnel connects");
    let (mut proxy, _) = connect_async(format!("ws://{addr}/ws/proxy/{id}"))
        .await
        .expect("proxy connects");

    // first_tunnel is now attached to proxy; registering a second tunnel
    // against the same channel id should evict it.
    let (mut second_tunnel, _) = connect_async(format!("ws://{addr}/ws/tunnel/{id}"))
        .await
        .expect("second tunnel connects");

    let evicted = tokio::time::timeout(Duration::from_secs(2), first_tunnel.next()).await;
    assert!(
        matches!(evicted, Ok(Some(Ok(Message::Close(_)))) | Ok(None)),
        "expected the first tunnel to be closed, got {evicted:?}"
    );

    proxy
        .send(Message::Binary(b"to the new tunnel".to_vec().into()))
        .await
        .expect("proxy send");
    let reply = tokio::time::timeout(Duration::from_secs(2), second_tunnel.next())
        .await
        .expect("no timeout")
        .expect("frame present")
        .expect("no ws error");
    assert_eq!(reply.into_data().as_ref(), b"to the new tunnel");
}
