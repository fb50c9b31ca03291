//! Favorite state. Like sources, favorites carry only a name.

use serde::{Deserialize, Serialize};

use crate::{checked_name, write_slot, ModelError, SetOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FavoriteModel {
    name: String,
}

impl FavoriteModel {
    pub(crate) fn numbered(n: u8) -> FavoriteModel {
        FavoriteModel {
            name: format!("Favorite {n}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<SetOutcome, ModelError> {
        let name = checked_name(name)?;
        Ok(write_slot(&mut self.name, name))
    }
}
