//! Group state: a name and a set of member zones.
//!
//! A group's aggregate mute, volume, and source set are never stored here;
//! they are derived from the member zones by the application controller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use hlx_proto::Identifier;

use crate::{checked_name, write_slot, ModelError, SetOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupModel {
    name: String,
    zones: BTreeSet<Identifier>,
}

impl GroupModel {
    pub(crate) fn numbered(n: u8) -> GroupModel {
        GroupModel {
            name: format!("Group {n}"),
            zones: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zones(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.zones.iter().copied()
    }

    pub fn contains(&self, zone: Identifier) -> bool {
        self.zones.contains(&zone)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn set_name(&mut self, name: &str) -> Result<SetOutcome, ModelError> {
        let name = checked_name(name)?;
        Ok(write_slot(&mut self.name, name))
    }

    /// Adding a zone that is already a member leaves the intent already
    /// true, so it reports `AlreadySet`.
    pub fn add_zone(&mut self, zone: Identifier) -> Result<SetOutcome, ModelError> {
        if !zone.is_valid() {
            return Err(ModelError::InvalidIdentifier);
        }
        if self.zones.insert(zone) {
            Ok(SetOutcome::Applied)
        } else {
            Ok(SetOutcome::AlreadySet)
        }
    }

    pub fn remove_zone(&mut self, zone: Identifier) -> Result<SetOutcome, ModelError> {
        if !zone.is_valid() {
            return Err(ModelError::InvalidIdentifier);
        }
        if self.zones.remove(&zone) {
            Ok(SetOutcome::Applied)
        } else {
            Ok(SetOutcome::AlreadySet)
        }
    }
}
