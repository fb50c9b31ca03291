//! The request dispatcher: the single task owning the amplifier state.
//!
//! Sessions feed typed requests onto the bus; the dispatcher mutates or
//! reads the model and answers with resulting-state frames. A mutation
//! that changed something is echoed to the requester and broadcast as a
//! notification to every other connected client, then persisted. A write
//! of the already-present value answers the requester only — it is a
//! status, not a change, and nothing may be notified.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedSender};
use tracing::{info, warn};

use hlx_model::{
    AmplifierModel, ModelError, SetOutcome, BAND_LEVEL_MAX, BAND_LEVEL_MIN, TONE_LEVEL_MAX,
    TONE_LEVEL_MIN, VOLUME_MAX, VOLUME_MIN,
};
use hlx_proto::{Identifier, Request, Response};

use crate::session;
use crate::store::Store;

pub type ClientId = u64;

pub enum DispatcherMsg {
    Accepted {
        stream: TcpStream,
        addr: SocketAddr,
    },
    Request {
        client: ClientId,
        request: Request,
    },
    Closed {
        client: ClientId,
    },
}

/// What a request produced.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Frames for the requester only: query results, or the echo of a
    /// value that was already set.
    Reply(Vec<Response>),
    /// The model changed: frames for the requester, broadcast to everyone
    /// else, and the store is rewritten.
    Applied(Vec<Response>),
    /// The request was structurally valid but unacceptable; nothing is
    /// sent and the reason is logged.
    Rejected(ModelError),
}

pub struct Dispatcher {
    model: AmplifierModel,
    store: Option<Store>,
    clients: HashMap<ClientId, UnboundedSender<String>>,
    next_client: ClientId,
    rx: Receiver<DispatcherMsg>,
    bus: Sender<DispatcherMsg>,
}

impl Dispatcher {
    pub fn new(model: AmplifierModel, store: Option<Store>) -> (Dispatcher, Sender<DispatcherMsg>) {
        let (bus, rx) = mpsc::channel(256);
        let dispatcher = Dispatcher {
            model,
            store,
            clients: HashMap::new(),
            next_client: 1,
            rx,
            bus: bus.clone(),
        };
        (dispatcher, bus)
    }

    pub fn model(&self) -> &AmplifierModel {
        &self.model
    }

    /// Serve the bus until every sender is gone.
    pub async fn begin(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                DispatcherMsg::Accepted { stream, addr } => self.accept(stream, addr),
                DispatcherMsg::Request { client, request } => self.handle_request(client, &request),
                DispatcherMsg::Closed { client } => {
                    self.clients.remove(&client);
                    info!(client, "client disconnected");
                }
            }
        }
    }

    fn accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        let client = self.next_client;
        self.next_client += 1;
        let (tx, outbound) = mpsc::unbounded_channel();
        self.clients.insert(client, tx);
        info!(client, %addr, "client connected");
        tokio::spawn(session::run_session(
            client,
            stream,
            addr,
            self.bus.clone(),
            outbound,
        ));
    }

    fn handle_request(&mut self, client: ClientId, request: &Request) {
        match self.apply(request) {
            Outcome::Reply(frames) => self.reply(client, &frames),
            Outcome::Applied(frames) => {
                self.reply(client, &frames);
                for frame in &frames {
                    self.broadcast_except(client, frame);
                }
                self.persist();
            }
            Outcome::Rejected(error) => {
                warn!(client, %request, %error, "rejected request");
            }
        }
    }

    fn reply(&self, client: ClientId, frames: &[Response]) {
        let Some(tx) = self.clients.get(&client) else {
            return;
        };
        for frame in frames {
            let _ = tx.send(frame.encode());
        }
    }

    fn broadcast_except(&self, client: ClientId, frame: &Response) {
        for (id, tx) in &self.clients {
            if *id != client {
                let _ = tx.send(frame.encode());
            }
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(error) = store.save(&self.model) {
                warn!(%error, "failed to persist configuration");
            }
        }
    }

    // ------------------------------------------------------------------
    // Request handling proper
    // ------------------------------------------------------------------

    pub(crate) fn apply(&mut self, request: &Request) -> Outcome {
        match *request {
            // Queries.
            Request::QueryZone { zone } => Outcome::Reply(self.query_zone(zone)),
            Request::QueryAllZones => {
                let mut frames: Vec<Response> = Vec::new();
                for index in 0..self.model.zones.len() {
                    let zone = index_id(hlx_proto::Kind::Zone, index);
                    frames.extend(self.zone_frames(zone));
                }
                frames.push(Response::AllZonesQueryDone);
                Outcome::Reply(frames)
            }
            Request::QuerySources => {
                let mut frames: Vec<Response> = self
                    .model
                    .sources
                    .iter()
                    .enumerate()
                    .map(|(index, source)| Response::SourceName {
                        source: index_id(hlx_proto::Kind::Source, index),
                        name: source.name().to_owned(),
                    })
                    .collect();
                frames.push(Response::SourcesQueryDone);
                Outcome::Reply(frames)
            }
            Request::QueryGroup { group } => Outcome::Reply(self.query_group(group)),
            Request::QueryFavorite { favorite } => {
                let mut frames = Vec::new();
                if let Some(model) = self.model.favorite(favorite) {
                    frames.push(Response::FavoriteName {
                        favorite,
                        name: model.name().to_owned(),
                    });
                }
                frames.push(Response::FavoriteQueryDone { favorite });
                Outcome::Reply(frames)
            }
            Request::QueryPreset { preset } => Outcome::Reply(self.query_preset(preset)),
            // Peer quirk preserved from the hardware: the infrared query
            // is answered by the bare disabled frame, identical to the
            // unsolicited notification, with no completion marker.
            Request::QueryInfrared => Outcome::Reply(vec![Response::InfraredDisabled {
                disabled: self.model.infrared.disabled(),
            }]),
            Request::QueryNetwork => Outcome::Reply(vec![
                Response::NetworkDhcp {
                    enabled: self.model.network.dhcp_enabled(),
                },
                Response::NetworkSddp {
                    enabled: self.model.network.sddp_enabled(),
                },
                Response::NetworkQueryDone,
            ]),
            Request::QueryFrontPanel => Outcome::Reply(vec![
                Response::FrontPanelBrightness {
                    brightness: self.model.front_panel.brightness(),
                },
                Response::FrontPanelLocked {
                    locked: self.model.front_panel.locked(),
                },
                Response::FrontPanelQueryDone,
            ]),

            // Zone mutations.
            Request::SetZoneVolume { zone, level } => self.write_zone_volume(zone, level),
            Request::ZoneVolumeUp { zone } => {
                let Some(model) = self.model.zone(zone) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                let level = model.volume().saturating_add(1).min(VOLUME_MAX);
                self.write_zone_volume(zone, level)
            }
            Request::ZoneVolumeDown { zone } => {
                let Some(model) = self.model.zone(zone) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                let level = model.volume().saturating_sub(1).max(VOLUME_MIN);
                self.write_zone_volume(zone, level)
            }
            Request::SetZoneMute { zone } => self.write_zone_mute(zone, true),
            Request::ClearZoneMute { zone } => self.write_zone_mute(zone, false),
            Request::ToggleZoneMute { zone } => {
                let Some(model) = self.model.zone(zone) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                let muted = !model.muted();
                self.write_zone_mute(zone, muted)
            }
            Request::SetZoneBalance { zone, balance } => {
                self.write_zone(zone, |model| model.set_balance(balance), move |_| {
                    Response::ZoneBalance { zone, balance }
                })
            }
            Request::SetZoneBass { zone, level } => self.write_zone_tone(zone, Some(level), None),
            Request::ZoneBassUp { zone } => self.step_zone_bass(zone, 1),
            Request::ZoneBassDown { zone } => self.step_zone_bass(zone, -1),
            Request::SetZoneTreble { zone, level } => self.write_zone_tone(zone, None, Some(level)),
            Request::ZoneTrebleUp { zone } => self.step_zone_treble(zone, 1),
            Request::ZoneTrebleDown { zone } => self.step_zone_treble(zone, -1),
            Request::SetZoneSource { zone, source } => {
                if self.model.source(source).is_none() {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                }
                self.write_zone(zone, |model| model.set_source(source), move |_| {
                    Response::ZoneSource { zone, source }
                })
            }
            Request::SetZoneName { zone, ref name } => {
                let name = name.clone();
                let frame_name = name.clone();
                self.write_zone(zone, move |model| model.set_name(&name), move |_| {
                    Response::ZoneName {
                        zone,
                        name: frame_name.clone(),
                    }
                })
            }
            Request::SetZoneHighpass { zone, frequency } => {
                self.write_zone(zone, |model| model.set_highpass(frequency), move |_| {
                    Response::ZoneHighpass { zone, frequency }
                })
            }
            Request::SetZoneLowpass { zone, frequency } => {
                self.write_zone(zone, |model| model.set_lowpass(frequency), move |_| {
                    Response::ZoneLowpass { zone, frequency }
                })
            }

            // Source, group, favorite, preset mutations.
            Request::SetSourceName { source, ref name } => {
                let Some(model) = self.model.source_mut(source) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.set_name(name) {
                    Ok(outcome) => wrap(outcome, vec![Response::SourceName {
                        source,
                        name: name.clone(),
                    }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetGroupName { group, ref name } => {
                let Some(model) = self.model.group_mut(group) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.set_name(name) {
                    Ok(outcome) => wrap(outcome, vec![Response::GroupName {
                        group,
                        name: name.clone(),
                    }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::AddGroupZone { group, zone } => {
                if self.model.zone(zone).is_none() {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                }
                let Some(model) = self.model.group_mut(group) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.add_zone(zone) {
                    Ok(outcome) => wrap(outcome, vec![Response::GroupZoneAdded { group, zone }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::RemoveGroupZone { group, zone } => {
                let Some(model) = self.model.group_mut(group) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.remove_zone(zone) {
                    Ok(outcome) => wrap(outcome, vec![Response::GroupZoneRemoved { group, zone }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetFavoriteName { favorite, ref name } => {
                let Some(model) = self.model.favorite_mut(favorite) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.set_name(name) {
                    Ok(outcome) => wrap(outcome, vec![Response::FavoriteName {
                        favorite,
                        name: name.clone(),
                    }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetPresetName { preset, ref name } => {
                let Some(model) = self.model.preset_mut(preset) else {
                    return Outcome::Rejected(ModelError::InvalidIdentifier);
                };
                match model.set_name(name) {
                    Ok(outcome) => wrap(outcome, vec![Response::PresetName {
                        preset,
                        name: name.clone(),
                    }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetPresetBand {
                preset,
                band,
                level,
            } => self.write_preset_band(preset, band, level),
            Request::PresetBandUp { preset, band } => self.step_preset_band(preset, band, 1),
            Request::PresetBandDown { preset, band } => self.step_preset_band(preset, band, -1),

            // Infrared and front panel mutations.
            Request::SetInfraredDisabled { disabled } => {
                match self.model.infrared.set_disabled(disabled) {
                    Ok(outcome) => wrap(outcome, vec![Response::InfraredDisabled { disabled }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetFrontPanelBrightness { brightness } => {
                match self.model.front_panel.set_brightness(brightness) {
                    Ok(outcome) => {
                        wrap(outcome, vec![Response::FrontPanelBrightness { brightness }])
                    }
                    Err(error) => Outcome::Rejected(error),
                }
            }
            Request::SetFrontPanelLocked { locked } => {
                match self.model.front_panel.set_locked(locked) {
                    Ok(outcome) => wrap(outcome, vec![Response::FrontPanelLocked { locked }]),
                    Err(error) => Outcome::Rejected(error),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Query frame builders
    // ------------------------------------------------------------------

    fn zone_frames(&self, zone: Identifier) -> Vec<Response> {
        let Some(model) = self.model.zone(zone) else {
            return Vec::new();
        };
        let mut frames = vec![Response::ZoneName {
            zone,
            name: model.name().to_owned(),
        }];
        if model.source().is_valid() {
            frames.push(Response::ZoneSource {
                zone,
                source: model.source(),
            });
        }
        let (bass, treble) = model.tone();
        frames.push(Response::ZoneVolume {
            zone,
            level: model.volume(),
        });
        frames.push(Response::ZoneMute {
            zone,
            muted: model.muted(),
        });
        frames.push(Response::ZoneBalance {
            zone,
            balance: model.balance(),
        });
        frames.push(Response::ZoneTone { zone, bass, treble });
        frames.push(Response::ZoneHighpass {
            zone,
            frequency: model.highpass(),
        });
        frames.push(Response::ZoneLowpass {
            zone,
            frequency: model.lowpass(),
        });
        frames
    }

    fn query_zone(&self, zone: Identifier) -> Vec<Response> {
        let mut frames = self.zone_frames(zone);
        frames.push(Response::ZoneQueryDone { zone });
        frames
    }

    fn query_group(&self, group: Identifier) -> Vec<Response> {
        let mut frames = Vec::new();
        if let Some(model) = self.model.group(group) {
            frames.push(Response::GroupName {
                group,
                name: model.name().to_owned(),
            });
            for zone in model.zones() {
                frames.push(Response::GroupZoneAdded { group, zone });
            }
        }
        frames.push(Response::GroupQueryDone { group });
        frames
    }

    fn query_preset(&self, preset: Identifier) -> Vec<Response> {
        let mut frames = Vec::new();
        if let Some(model) = self.model.preset(preset) {
            frames.push(Response::PresetName {
                preset,
                name: model.name().to_owned(),
            });
            for (index, level) in model.bands().iter().enumerate() {
                frames.push(Response::PresetBand {
                    preset,
                    band: index_id(hlx_proto::Kind::EqualizerBand, index),
                    level: *level,
                });
            }
        }
        frames.push(Response::PresetQueryDone { preset });
        frames
    }

    // ------------------------------------------------------------------
    // Mutation helpers
    // ------------------------------------------------------------------

    fn write_zone(
        &mut self,
        zone: Identifier,
        write: impl FnOnce(&mut hlx_model::ZoneModel) -> Result<SetOutcome, ModelError>,
        frame: impl FnOnce(&hlx_model::ZoneModel) -> Response,
    ) -> Outcome {
        let Some(model) = self.model.zone_mut(zone) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        match write(model) {
            Ok(outcome) => wrap(outcome, vec![frame(model)]),
            Err(error) => Outcome::Rejected(error),
        }
    }

    fn write_zone_volume(&mut self, zone: Identifier, level: i8) -> Outcome {
        self.write_zone(zone, |model| model.set_volume(level), move |_| {
            Response::ZoneVolume { zone, level }
        })
    }

    fn write_zone_mute(&mut self, zone: Identifier, muted: bool) -> Outcome {
        self.write_zone(zone, |model| model.set_muted(muted), move |_| {
            Response::ZoneMute { zone, muted }
        })
    }

    /// Write one or both tone controls; the resulting frame always carries
    /// the full tone pair, the way the device reports it.
    fn write_zone_tone(
        &mut self,
        zone: Identifier,
        bass: Option<i8>,
        treble: Option<i8>,
    ) -> Outcome {
        let Some(model) = self.model.zone_mut(zone) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        let (current_bass, current_treble) = model.tone();
        let bass = bass.unwrap_or(current_bass);
        let treble = treble.unwrap_or(current_treble);
        match model.set_tone(bass, treble) {
            Ok(outcome) => wrap(outcome, vec![Response::ZoneTone { zone, bass, treble }]),
            Err(error) => Outcome::Rejected(error),
        }
    }

    fn step_zone_bass(&mut self, zone: Identifier, step: i8) -> Outcome {
        let Some(model) = self.model.zone(zone) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        let (bass, _) = model.tone();
        let next = bass
            .saturating_add(step)
            .clamp(TONE_LEVEL_MIN, TONE_LEVEL_MAX);
        self.write_zone_tone(zone, Some(next), None)
    }

    fn step_zone_treble(&mut self, zone: Identifier, step: i8) -> Outcome {
        let Some(model) = self.model.zone(zone) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        let (_, treble) = model.tone();
        let next = treble
            .saturating_add(step)
            .clamp(TONE_LEVEL_MIN, TONE_LEVEL_MAX);
        self.write_zone_tone(zone, None, Some(next))
    }

    fn write_preset_band(&mut self, preset: Identifier, band: Identifier, level: i8) -> Outcome {
        let Some(model) = self.model.preset_mut(preset) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        match model.set_band(band, level) {
            Ok(outcome) => wrap(outcome, vec![Response::PresetBand {
                preset,
                band,
                level,
            }]),
            Err(error) => Outcome::Rejected(error),
        }
    }

    fn step_preset_band(&mut self, preset: Identifier, band: Identifier, step: i8) -> Outcome {
        let Some(model) = self.model.preset(preset) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        let Some(level) = model.band(band) else {
            return Outcome::Rejected(ModelError::InvalidIdentifier);
        };
        let next = level
            .saturating_add(step)
            .clamp(BAND_LEVEL_MIN, BAND_LEVEL_MAX);
        self.write_preset_band(preset, band, next)
    }
}

fn wrap(outcome: SetOutcome, frames: Vec<Response>) -> Outcome {
    match outcome {
        SetOutcome::Applied => Outcome::Applied(frames),
        SetOutcome::AlreadySet => Outcome::Reply(frames),
    }
}

/// Identifier for a zero-based collection index. Collections are sized to
/// their kind's maximum, so the shift cannot leave range.
fn index_id(kind: hlx_proto::Kind, index: usize) -> Identifier {
    kind.checked((index + 1) as u32)
        .unwrap_or(Identifier::INVALID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlx_proto::Kind;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(AmplifierModel::default(), None).0
    }

    fn zone(n: u32) -> Identifier {
        Kind::Zone.checked(n).unwrap()
    }

    #[test]
    fn volume_set_applies_then_reports_already_set() {
        let mut d = dispatcher();
        let request = Request::SetZoneVolume {
            zone: zone(3),
            level: -20,
        };
        let first = d.apply(&request);
        assert_eq!(
            first,
            Outcome::Applied(vec![Response::ZoneVolume {
                zone: zone(3),
                level: -20
            }])
        );
        // Writing the same value answers the requester without notifying.
        let second = d.apply(&request);
        assert_eq!(
            second,
            Outcome::Reply(vec![Response::ZoneVolume {
                zone: zone(3),
                level: -20
            }])
        );
    }

    #[test]
    fn mute_toggle_flips_and_reports_resulting_state() {
        let mut d = dispatcher();
        let toggle = Request::ToggleZoneMute { zone: zone(1) };
        assert_eq!(
            d.apply(&toggle),
            Outcome::Applied(vec![Response::ZoneMute {
                zone: zone(1),
                muted: true
            }])
        );
        assert_eq!(
            d.apply(&toggle),
            Outcome::Applied(vec![Response::ZoneMute {
                zone: zone(1),
                muted: false
            }])
        );
    }

    #[test]
    fn volume_up_clamps_at_the_ceiling() {
        let mut d = dispatcher();
        d.apply(&Request::SetZoneVolume {
            zone: zone(2),
            level: VOLUME_MAX,
        });
        let outcome = d.apply(&Request::ZoneVolumeUp { zone: zone(2) });
        // Already at the ceiling: resulting state is echoed, not notified.
        assert_eq!(
            outcome,
            Outcome::Reply(vec![Response::ZoneVolume {
                zone: zone(2),
                level: VOLUME_MAX
            }])
        );
    }

    #[test]
    fn zone_query_ends_with_completion_marker() {
        let mut d = dispatcher();
        let Outcome::Reply(frames) = d.apply(&Request::QueryZone { zone: zone(3) }) else {
            panic!("query must reply");
        };
        assert!(frames.len() > 2);
        assert_eq!(*frames.last().unwrap(), Response::ZoneQueryDone { zone: zone(3) });
        assert!(frames
            .iter()
            .any(|f| matches!(f, Response::ZoneName { .. })));
    }

    #[test]
    fn infrared_query_is_the_bare_notification_shape() {
        let mut d = dispatcher();
        let Outcome::Reply(frames) = d.apply(&Request::QueryInfrared) else {
            panic!("query must reply");
        };
        assert_eq!(frames, vec![Response::InfraredDisabled { disabled: false }]);
    }

    #[test]
    fn bass_write_reports_the_full_tone_pair() {
        let mut d = dispatcher();
        d.apply(&Request::SetZoneTreble {
            zone: zone(4),
            level: 3,
        });
        let outcome = d.apply(&Request::SetZoneBass {
            zone: zone(4),
            level: -2,
        });
        assert_eq!(
            outcome,
            Outcome::Applied(vec![Response::ZoneTone {
                zone: zone(4),
                bass: -2,
                treble: 3
            }])
        );
    }

    #[test]
    fn group_membership_round_trip() {
        let mut d = dispatcher();
        let g2 = Kind::Group.checked(2).unwrap();
        let add = Request::AddGroupZone {
            group: g2,
            zone: zone(5),
        };
        assert!(matches!(d.apply(&add), Outcome::Applied(_)));
        assert!(matches!(d.apply(&add), Outcome::Reply(_)));
        let Outcome::Reply(frames) = d.apply(&Request::QueryGroup { group: g2 }) else {
            panic!("query must reply");
        };
        assert!(frames.contains(&Response::GroupZoneAdded {
            group: g2,
            zone: zone(5)
        }));
    }

    #[test]
    fn preset_band_steps_saturate() {
        let mut d = dispatcher();
        let p1 = Kind::EqualizerPreset.checked(1).unwrap();
        let b1 = Kind::EqualizerBand.checked(1).unwrap();
        d.apply(&Request::SetPresetBand {
            preset: p1,
            band: b1,
            level: BAND_LEVEL_MAX,
        });
        let outcome = d.apply(&Request::PresetBandUp {
            preset: p1,
            band: b1,
        });
        assert_eq!(
            outcome,
            Outcome::Reply(vec![Response::PresetBand {
                preset: p1,
                band: b1,
                level: BAND_LEVEL_MAX
            }])
        );
    }

    #[test]
    fn oversized_values_are_rejected_without_frames() {
        let mut d = dispatcher();
        let outcome = d.apply(&Request::SetZoneVolume {
            zone: zone(1),
            level: -99,
        });
        assert!(matches!(outcome, Outcome::Rejected(_)));
    }
}
