//! End-to-end suites: a real client engine against a real simulator over
//! loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::timeout;

use hlx_client::{ApplicationController, ClientEvent, ClientOptions, HlxClient, StateChange};
use hlx_model::AmplifierModel;
use hlx_server::{Dispatcher, Listener};

type Events = tokio::sync::mpsc::UnboundedReceiver<ClientEvent>;

async fn start_simulator(model: AmplifierModel) -> SocketAddr {
    let (dispatcher, bus) = Dispatcher::new(model, None);
    let listener = Listener::bind_ephemeral().await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(listener.begin(bus));
    tokio::spawn(dispatcher.begin());
    addr
}

async fn connected_client_to(addr: SocketAddr) -> (HlxClient, Events) {
    let (engine, client, events) = ApplicationController::new(ClientOptions {
        exchange_timeout: Duration::from_secs(2),
        ..ClientOptions::default()
    });
    tokio::spawn(engine.run());
    client
        .connect(
            &format!("telnet://127.0.0.1:{}", addr.port()),
            Duration::from_secs(2),
        )
        .await
        .expect("connect");
    (client, events)
}

async fn connected_client() -> (HlxClient, Events) {
    let addr = start_simulator(AmplifierModel::default()).await;
    connected_client_to(addr).await
}

/// Collect queued events until `gap` elapses with nothing new.
async fn drain(events: &mut Events, gap: Duration) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(Some(event)) = timeout(gap, events.recv()).await {
        out.push(event);
    }
    out
}

fn zone_volume_events(events: &[ClientEvent], zone: u8) -> Vec<i8> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::State(StateChange::ZoneVolume { zone: z, level }) if z.get() == zone => {
                Some(*level)
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn refresh_reconstructs_the_model_and_reports_progress() {
    let (client, mut events) = connected_client().await;
    client.refresh(Duration::from_secs(5)).await.expect("refresh");

    let snapshot = client.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.zones.len(), 24);
    assert_eq!(snapshot.zones[0].name(), "Zone 1");
    assert_eq!(snapshot.sources[7].name(), "Source 8");
    assert_eq!(snapshot.presets[0].name(), "Preset 1");
    assert!(!snapshot.infrared.disabled());

    let seen = drain(&mut events, Duration::from_millis(200)).await;
    let will = seen
        .iter()
        .filter(|e| matches!(e, ClientEvent::WillRefresh))
        .count();
    let did = seen
        .iter()
        .filter(|e| matches!(e, ClientEvent::DidRefresh))
        .count();
    assert_eq!(will, 1);
    assert_eq!(did, 1, "exactly one DidRefresh per refresh call");

    let percents: Vec<u8> = seen
        .iter()
        .filter_map(|e| match e {
            ClientEvent::IsRefreshing { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    let mut sorted = percents.clone();
    sorted.sort_unstable();
    assert_eq!(percents, sorted, "progress must be monotonically non-decreasing");
    assert_eq!(*percents.last().unwrap(), 100);

    // DidRefresh comes after every IsRefreshing it subsumes.
    let last_progress = seen
        .iter()
        .rposition(|e| matches!(e, ClientEvent::IsRefreshing { .. }))
        .unwrap();
    let did_at = seen
        .iter()
        .position(|e| matches!(e, ClientEvent::DidRefresh))
        .unwrap();
    assert!(did_at > last_progress);
}

#[tokio::test]
async fn volume_set_updates_model_and_emits_exactly_one_event() {
    let (client, mut events) = connected_client().await;
    client.refresh(Duration::from_secs(5)).await.expect("refresh");
    drain(&mut events, Duration::from_millis(200)).await;

    client.set_zone_volume(3, -25).await.expect("set -25");
    client.set_zone_volume(3, -20).await.expect("set -20");

    let seen = drain(&mut events, Duration::from_millis(200)).await;
    assert_eq!(zone_volume_events(&seen, 3), vec![-25, -20]);

    let snapshot = client.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.zones[2].volume(), -20);
}

#[tokio::test]
async fn mute_toggle_flips_twice_with_distinct_events() {
    let (client, mut events) = connected_client().await;
    client.set_zone_mute(1).await.expect("mute");
    drain(&mut events, Duration::from_millis(200)).await;

    let first = client.toggle_zone_mute(1).await.expect("toggle");
    assert!(!first, "toggling a muted zone unmutes it");
    let second = client.toggle_zone_mute(1).await.expect("toggle");
    assert!(second);

    let seen = drain(&mut events, Duration::from_millis(200)).await;
    let mutes: Vec<bool> = seen
        .iter()
        .filter_map(|event| match event {
            ClientEvent::State(StateChange::ZoneMute { zone, muted }) if zone.get() == 1 => {
                Some(*muted)
            }
            _ => None,
        })
        .collect();
    assert_eq!(mutes, vec![false, true]);
}

#[tokio::test]
async fn writing_the_present_value_emits_no_event() {
    let (client, mut events) = connected_client().await;
    client.set_zone_volume(3, -20).await.expect("set");
    drain(&mut events, Duration::from_millis(200)).await;

    // The peer answers with the resulting state, but nothing changed.
    client.set_zone_volume(3, -20).await.expect("set again");
    let seen = drain(&mut events, Duration::from_millis(200)).await;
    assert!(
        zone_volume_events(&seen, 3).is_empty(),
        "an already-set write must not emit a state change"
    );
}

#[tokio::test]
async fn mutations_notify_other_connected_clients() {
    let addr = start_simulator(AmplifierModel::default()).await;
    let (_watcher, mut watcher_events) = connected_client_to(addr).await;
    let (actor, mut actor_events) = connected_client_to(addr).await;
    drain(&mut watcher_events, Duration::from_millis(100)).await;

    actor.set_zone_volume(5, -30).await.expect("set");

    let seen = drain(&mut watcher_events, Duration::from_millis(300)).await;
    assert_eq!(
        zone_volume_events(&seen, 5),
        vec![-30],
        "the other client hears the unsolicited notification"
    );
    drain(&mut actor_events, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn group_aggregates_derive_from_member_zones() {
    let (client, mut events) = connected_client().await;
    for zone in [3u8, 5, 7] {
        client.add_zone_to_group(2, zone).await.expect("add member");
    }
    client.set_zone_volume(3, -10).await.expect("volume");
    client.set_zone_volume(5, -20).await.expect("volume");
    client.set_zone_volume(7, -30).await.expect("volume");
    client.set_zone_source(3, 1).await.expect("source");
    client.set_zone_source(5, 2).await.expect("source");
    client.set_zone_source(7, 2).await.expect("source");
    client.set_zone_mute(7).await.expect("mute");

    let seen = drain(&mut events, Duration::from_millis(200)).await;
    let last_volume = seen.iter().rev().find_map(|event| match event {
        ClientEvent::State(StateChange::GroupVolume { group, level }) if group.get() == 2 => {
            Some(*level)
        }
        _ => None,
    });
    assert_eq!(last_volume, Some(-20), "mean of -10/-20/-30, rounded");

    let last_sources = seen.iter().rev().find_map(|event| match event {
        ClientEvent::State(StateChange::GroupSources { group, sources }) if group.get() == 2 => {
            Some(sources.iter().map(|s| s.get()).collect::<Vec<_>>())
        }
        _ => None,
    });
    assert_eq!(last_sources, Some(vec![1, 2]));

    let muted: Vec<bool> = seen
        .iter()
        .filter_map(|event| match event {
            ClientEvent::State(StateChange::GroupMute { group, muted }) if group.get() == 2 => {
                Some(*muted)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        muted.last(),
        Some(&false),
        "one member muted of three: the AND is false"
    );
}
