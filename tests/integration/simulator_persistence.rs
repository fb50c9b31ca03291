//! Mutations persist to the configuration store and survive a simulator
//! restart.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use hlx_client::{ApplicationController, ClientOptions, HlxClient};
use hlx_model::AmplifierModel;
use hlx_server::{Dispatcher, Listener, Store};

async fn start_simulator(model: AmplifierModel, store_path: &Path) -> SocketAddr {
    let (dispatcher, bus) = Dispatcher::new(model, Some(Store::new(store_path)));
    let listener = Listener::bind_ephemeral().await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(listener.begin(bus));
    tokio::spawn(dispatcher.begin());
    addr
}

async fn connected_client(addr: SocketAddr) -> HlxClient {
    let (engine, client, _events) = ApplicationController::new(ClientOptions::default());
    tokio::spawn(engine.run());
    client
        .connect(
            &format!("127.0.0.1:{}", addr.port()),
            Duration::from_secs(2),
        )
        .await
        .expect("connect");
    client
}

#[tokio::test]
async fn mutations_are_written_to_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hlxsimd.json");
    let addr = start_simulator(AmplifierModel::default(), &path).await;
    let client = connected_client(addr).await;

    client.set_zone_volume(3, -20).await.expect("volume");
    client.set_zone_name(3, "Den").await.expect("name");
    client.set_infrared_disabled(true).await.expect("infrared");

    let persisted = Store::new(&path).load().expect("load");
    let zone = &persisted.zones[2];
    assert_eq!(zone.volume(), -20);
    assert_eq!(zone.name(), "Den");
    assert!(persisted.infrared.disabled());
}

#[tokio::test]
async fn a_restarted_simulator_serves_the_persisted_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hlxsimd.json");

    let addr = start_simulator(AmplifierModel::default(), &path).await;
    let client = connected_client(addr).await;
    client.set_zone_volume(7, -42).await.expect("volume");
    client.disconnect().await.expect("disconnect");

    // Second life: load what the first simulator wrote.
    let model = Store::new(&path).load().expect("load");
    let addr = start_simulator(model, &path).await;
    let client = connected_client(addr).await;
    client.refresh(Duration::from_secs(5)).await.expect("refresh");

    let snapshot = client.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.zones[6].volume(), -42);
}
