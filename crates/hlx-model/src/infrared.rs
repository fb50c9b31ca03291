//! Infrared remote receiver state: a single disabled flag.

use serde::{Deserialize, Serialize};

use crate::{write_slot, ModelError, SetOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InfraredModel {
    disabled: bool,
}

impl InfraredModel {
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) -> Result<SetOutcome, ModelError> {
        Ok(write_slot(&mut self.disabled, disabled))
    }
}
