//! Network aspect of the amplifier: the DHCP and SDDP flags surfaced over
//! the control protocol. Query-only from the client's point of view.

use serde::{Deserialize, Serialize};

use crate::{write_slot, ModelError, SetOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkModel {
    dhcp_enabled: bool,
    sddp_enabled: bool,
}

impl Default for NetworkModel {
    fn default() -> Self {
        NetworkModel {
            dhcp_enabled: true,
            sddp_enabled: false,
        }
    }
}

impl NetworkModel {
    pub fn dhcp_enabled(&self) -> bool {
        self.dhcp_enabled
    }

    pub fn sddp_enabled(&self) -> bool {
        self.sddp_enabled
    }

    pub fn set_dhcp_enabled(&mut self, enabled: bool) -> Result<SetOutcome, ModelError> {
        Ok(write_slot(&mut self.dhcp_enabled, enabled))
    }

    pub fn set_sddp_enabled(&mut self, enabled: bool) -> Result<SetOutcome, ModelError> {
        Ok(write_slot(&mut self.sddp_enabled, enabled))
    }
}
