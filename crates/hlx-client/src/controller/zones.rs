//! Zones controller: the largest aspect, covering name, source, volume,
//! mute, balance, tone, and crossover per zone.

use tracing::warn;

use hlx_model::{SetOutcome, ZoneModel};
use hlx_proto::{Identifier, Kind, Request, Response};

use crate::event::StateChange;

pub(crate) struct ZonesController {
    zones: Vec<ZoneModel>,
}

impl ZonesController {
    pub(crate) fn new() -> ZonesController {
        ZonesController {
            zones: Kind::Zone.all().map(|_| ZoneModel::default()).collect(),
        }
    }

    pub(crate) fn zone(&self, id: Identifier) -> Option<&ZoneModel> {
        self.zones.get(id.get().checked_sub(1)? as usize)
    }

    fn zone_mut(&mut self, id: Identifier) -> Option<&mut ZoneModel> {
        self.zones.get_mut(id.get().checked_sub(1)? as usize)
    }

    pub(crate) fn models(&self) -> &[ZoneModel] {
        &self.zones
    }

    /// One query per zone, preceded by the one-shot source-configuration
    /// query. The peer exposes no per-source query, so the source aspect
    /// rides along with the zone dump and the sources controller consumes
    /// its frames as they arrive.
    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        let mut queries = Vec::with_capacity(Kind::Zone.max() as usize + 1);
        queries.push(Request::QuerySources);
        queries.extend(Kind::Zone.all().map(|zone| Request::QueryZone { zone }));
        queries
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let (zone, outcome, change) = match response {
            Response::ZoneName { zone, name } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_name(name),
                    StateChange::ZoneName {
                        zone: *zone,
                        name: name.clone(),
                    },
                )
            }
            Response::ZoneVolume { zone, level } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_volume(*level),
                    StateChange::ZoneVolume {
                        zone: *zone,
                        level: *level,
                    },
                )
            }
            Response::ZoneMute { zone, muted } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_muted(*muted),
                    StateChange::ZoneMute {
                        zone: *zone,
                        muted: *muted,
                    },
                )
            }
            Response::ZoneSource { zone, source } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_source(*source),
                    StateChange::ZoneSource {
                        zone: *zone,
                        source: *source,
                    },
                )
            }
            Response::ZoneBalance { zone, balance } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_balance(*balance),
                    StateChange::ZoneBalance {
                        zone: *zone,
                        balance: *balance,
                    },
                )
            }
            Response::ZoneTone { zone, bass, treble } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_tone(*bass, *treble),
                    StateChange::ZoneTone {
                        zone: *zone,
                        bass: *bass,
                        treble: *treble,
                    },
                )
            }
            Response::ZoneHighpass { zone, frequency } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_highpass(*frequency),
                    StateChange::ZoneHighpass {
                        zone: *zone,
                        frequency: *frequency,
                    },
                )
            }
            Response::ZoneLowpass { zone, frequency } => {
                let model = self.zone_mut(*zone)?;
                (
                    *zone,
                    model.set_lowpass(*frequency),
                    StateChange::ZoneLowpass {
                        zone: *zone,
                        frequency: *frequency,
                    },
                )
            }
            _ => return None,
        };
        match outcome {
            Ok(SetOutcome::Applied) => Some(change),
            Ok(SetOutcome::AlreadySet) => None,
            Err(error) => {
                warn!(%zone, %error, "rejected zone notification");
                None
            }
        }
    }
}
