//! Front panel state: display brightness and the lockout flag.

use serde::{Deserialize, Serialize};

use crate::{check_range, write_slot, ModelError, SetOutcome};

pub const BRIGHTNESS_MAX: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontPanelModel {
    brightness: u8,
    locked: bool,
}

impl Default for FrontPanelModel {
    fn default() -> Self {
        FrontPanelModel {
            brightness: 2,
            locked: false,
        }
    }
}

impl FrontPanelModel {
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn set_brightness(&mut self, brightness: u8) -> Result<SetOutcome, ModelError> {
        check_range("brightness", brightness.into(), 0, BRIGHTNESS_MAX.into())?;
        Ok(write_slot(&mut self.brightness, brightness))
    }

    pub fn set_locked(&mut self, locked: bool) -> Result<SetOutcome, ModelError> {
        Ok(write_slot(&mut self.locked, locked))
    }
}
