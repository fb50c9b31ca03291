//! Source (input) state. Sources carry only a name; their assignment to
//! zones lives on the zones themselves.

use serde::{Deserialize, Serialize};

use crate::{checked_name, write_slot, ModelError, SetOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceModel {
    name: String,
}

impl SourceModel {
    pub(crate) fn numbered(n: u8) -> SourceModel {
        SourceModel {
            name: format!("Source {n}"),
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
