//! Groups controller: membership, names, and the cached derived state the
//! application controller recomputes from member zones.

use std::collections::BTreeSet;

use tracing::warn;

use hlx_model::{GroupModel, SetOutcome};
use hlx_proto::{Identifier, Kind, Request, Response};

use crate::event::StateChange;

/// Aggregate state computed from a group's member zones. Never persisted
/// and never carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DerivedGroupState {
    pub muted: bool,
    pub volume: i8,
    pub sources: BTreeSet<Identifier>,
}

pub(crate) struct GroupsController {
    groups: Vec<GroupModel>,
    derived: Vec<Option<DerivedGroupState>>,
}

impl GroupsController {
    pub(crate) fn new() -> GroupsController {
        GroupsController {
            groups: Kind::Group.all().map(|_| GroupModel::default()).collect(),
            derived: Kind::Group.all().map(|_| None).collect(),
        }
    }

    pub(crate) fn group(&self, id: Identifier) -> Option<&GroupModel> {
        self.groups.get(id.get().checked_sub(1)? as usize)
    }

    fn group_mut(&mut self, id: Identifier) -> Option<&mut GroupModel> {
        self.groups.get_mut(id.get().checked_sub(1)? as usize)
    }

    pub(crate) fn models(&self) -> &[GroupModel] {
        &self.groups
    }

    pub(crate) fn groups_containing(&self, zone: Identifier) -> Vec<Identifier> {
        Kind::Group
            .all()
            .filter(|g| self.group(*g).is_some_and(|m| m.contains(zone)))
            .collect()
    }

    pub(crate) fn derived(&self, id: Identifier) -> Option<&DerivedGroupState> {
        self.derived
            .get(id.get().checked_sub(1)? as usize)?
            .as_ref()
    }

    /// Replace the cached derived state for `group`, returning change
    /// events for exactly the aggregate properties that differ.
    pub(crate) fn store_derived(
        &mut self,
        group: Identifier,
        state: Option<DerivedGroupState>,
    ) -> Vec<StateChange> {
        let Some(slot) = self.derived.get_mut(group.get().wrapping_sub(1) as usize) else {
            return Vec::new();
        };
        let mut changes = Vec::new();
        if let Some(state) = &state {
            let previous = slot.as_ref();
            if previous.map(|p| p.muted) != Some(state.muted) {
                changes.push(StateChange::GroupMute {
                    group,
                    muted: state.muted,
                });
            }
            if previous.map(|p| p.volume) != Some(state.volume) {
                changes.push(StateChange::GroupVolume {
                    group,
                    level: state.volume,
                });
            }
            if previous.map(|p| &p.sources) != Some(&state.sources) {
                changes.push(StateChange::GroupSources {
                    group,
                    sources: state.sources.clone(),
                });
            }
        }
        *slot = state;
        changes
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        Kind::Group
            .all()
            .map(|group| Request::QueryGroup { group })
            .collect()
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let (group, outcome, change) = match response {
            Response::GroupName { group, name } => {
                let model = self.group_mut(*group)?;
                (
                    *group,
                    model.set_name(name),
                    StateChange::GroupName {
                        group: *group,
                        name: name.clone(),
                    },
                )
            }
            Response::GroupZoneAdded { group, zone } => {
                let model = self.group_mut(*group)?;
                (
                    *group,
                    model.add_zone(*zone),
                    StateChange::GroupZoneAdded {
                        group: *group,
                        zone: *zone,
                    },
                )
            }
            Response::GroupZoneRemoved { group, zone } => {
                let model = self.group_mut(*group)?;
                (
                    *group,
                    model.remove_zone(*zone),
                    StateChange::GroupZoneRemoved {
                        group: *group,
                        zone: *zone,
                    },
                )
            }
            _ => return None,
        };
        match outcome {
            Ok(SetOutcome::Applied) => Some(change),
            Ok(SetOutcome::AlreadySet) => None,
            Err(error) => {
                warn!(%group, %error, "rejected group notification");
                None
            }
        }
    }
}
