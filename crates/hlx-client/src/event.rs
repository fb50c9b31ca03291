//! Events published by the client engine.
//!
//! Where the amplifier's native control surface hands out delegate
//! callbacks, this client publishes typed events onto a channel the caller
//! drains. Ownership of the receiver bounds the consumer's lifetime to the
//! emitter's without any convention-based pointer discipline.

use std::collections::BTreeSet;
use std::net::IpAddr;

use tokio::sync::mpsc;

use hlx_proto::{ControlUrl, Error, Identifier};

/// Connection lifecycle events, in the order a successful session sees
/// them: resolve, connect, traffic, disconnect.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    WillResolve { host: String },
    IsResolving { host: String },
    DidResolve { host: String, addr: IpAddr },
    DidNotResolve { host: String, error: Error },
    WillConnect { url: ControlUrl },
    IsConnecting { url: ControlUrl },
    DidConnect { url: ControlUrl },
    DidNotConnect { url: ControlUrl, error: Error },
    WillDisconnect { url: ControlUrl },
    DidDisconnect { url: ControlUrl, error: Option<Error> },
    Error { error: Error },
}

/// One observed change to the local data model, tagged with the aspect,
/// property, and affected identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    ZoneName { zone: Identifier, name: String },
    ZoneVolume { zone: Identifier, level: i8 },
    ZoneMute { zone: Identifier, muted: bool },
    ZoneSource { zone: Identifier, source: Identifier },
    ZoneBalance { zone: Identifier, balance: i8 },
    ZoneTone { zone: Identifier, bass: i8, treble: i8 },
    ZoneHighpass { zone: Identifier, frequency: u16 },
    ZoneLowpass { zone: Identifier, frequency: u16 },
    SourceName { source: Identifier, name: String },
    GroupName { group: Identifier, name: String },
    GroupZoneAdded { group: Identifier, zone: Identifier },
    GroupZoneRemoved { group: Identifier, zone: Identifier },
    GroupMute { group: Identifier, muted: bool },
    GroupVolume { group: Identifier, level: i8 },
    GroupSources { group: Identifier, sources: BTreeSet<Identifier> },
    FavoriteName { favorite: Identifier, name: String },
    PresetName { preset: Identifier, name: String },
    PresetBand { preset: Identifier, band: Identifier, level: i8 },
    InfraredDisabled { disabled: bool },
    NetworkDhcp { enabled: bool },
    NetworkSddp { enabled: bool },
    FrontPanelBrightness { brightness: u8 },
    FrontPanelLocked { locked: bool },
}

/// Everything the application controller publishes.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connection(ConnectionEvent),
    WillRefresh,
    IsRefreshing { percent: u8 },
    DidRefresh,
    State(StateChange),
}

/// Shared sender half for engine internals. Send failures mean the caller
/// dropped the receiver, which is not an error the engine acts on.
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink {
    pub(crate) fn new() -> (EventSink, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink { tx }, rx)
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn connection(&self, event: ConnectionEvent) {
        self.emit(ClientEvent::Connection(event));
    }
}
