//! Exchange deadlines and inbound overflow against a peer that never
//! answers correctly.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use hlx_client::{
    ApplicationController, ClientEvent, ClientOptions, ConnectionEvent, ConnectionState, HlxClient,
};
use hlx_proto::Error;

/// A peer that accepts one connection, swallows everything it reads, and
/// writes whatever the test feeds it.
async fn mute_peer() -> (SocketAddr, mpsc::Sender<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(8);
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 1024];
        loop {
            tokio::select! {
                chunk = rx.recv() => match chunk {
                    Some(bytes) => {
                        if stream.write_all(&bytes).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                n = stream.read(&mut buf) => {
                    if n.unwrap_or(0) == 0 {
                        break;
                    }
                }
            }
        }
    });
    (addr, tx)
}

async fn client_for(
    addr: SocketAddr,
) -> (HlxClient, mpsc::UnboundedReceiver<ClientEvent>) {
    let (engine, client, events) = ApplicationController::new(ClientOptions {
        exchange_timeout: Duration::from_millis(200),
        ..ClientOptions::default()
    });
    tokio::spawn(engine.run());
    client
        .connect(
            &format!("127.0.0.1:{}", addr.port()),
            Duration::from_secs(2),
        )
        .await
        .expect("connect");
    (client, events)
}

#[tokio::test]
async fn exchange_timeout_frees_the_slot_without_dropping_the_connection() {
    let (addr, _feed) = mute_peer().await;
    let (client, _events) = client_for(addr).await;

    let err = client.set_zone_volume(3, -20).await.unwrap_err();
    assert_eq!(err, Error::Timeout);
    assert_eq!(err.errno(), -110);

    // The connection survives the timeout and the next exchange runs.
    assert_eq!(
        client.connection_state().await.unwrap(),
        ConnectionState::Connected
    );
    let err = client.set_zone_volume(3, -20).await.unwrap_err();
    assert_eq!(err, Error::Timeout);

    client.disconnect().await.expect("disconnect");
    assert_eq!(
        client.connection_state().await.unwrap(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn queued_exchanges_time_out_in_order() {
    let (addr, _feed) = mute_peer().await;
    let (client, _events) = client_for(addr).await;

    let a = client.clone();
    let b = client.clone();
    let first = tokio::spawn(async move { a.set_zone_volume(1, -10).await });
    let second = tokio::spawn(async move { b.set_zone_mute(2).await });
    assert_eq!(first.await.unwrap().unwrap_err(), Error::Timeout);
    assert_eq!(second.await.unwrap().unwrap_err(), Error::Timeout);
}

#[tokio::test]
async fn short_unmatched_input_is_buffered_not_fatal() {
    let (addr, feed) = mute_peer().await;
    let (client, _events) = client_for(addr).await;

    feed.send(vec![b'x'; 1024]).await.expect("feed");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        client.connection_state().await.unwrap(),
        ConnectionState::Connected
    );
}

#[tokio::test]
async fn unmatched_input_past_the_ceiling_fails_the_connection() {
    let (addr, feed) = mute_peer().await;
    let (client, mut events) = client_for(addr).await;

    feed.send(vec![b'x'; 9 * 1024]).await.expect("feed");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let state = client.connection_state().await.unwrap();
        if state == ConnectionState::Disconnected {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "connection should fail on overflow"
        );
        sleep(Duration::from_millis(20)).await;
    }

    let mut saw_overflow = false;
    while let Ok(Some(event)) = timeout(Duration::from_millis(100), events.recv()).await {
        if let ClientEvent::Connection(ConnectionEvent::Error {
            error: Error::FrameOverflow(_),
        }) = event
        {
            saw_overflow = true;
        }
    }
    assert!(saw_overflow, "the protocol error is surfaced as an event");
}
