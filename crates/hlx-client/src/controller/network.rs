//! Network controller. Query-only: the DHCP and SDDP flags are observed,
//! never set, from this side.

use hlx_model::{NetworkModel, SetOutcome};
use hlx_proto::{Request, Response};

use crate::event::StateChange;

pub(crate) struct NetworkController {
    model: NetworkModel,
}

impl NetworkController {
    pub(crate) fn new() -> NetworkController {
        NetworkController {
            model: NetworkModel::default(),
        }
    }

    pub(crate) fn model(&self) -> &NetworkModel {
        &self.model
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        vec![Request::QueryNetwork]
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        match response {
            Response::NetworkDhcp { enabled } => {
                match self.model.set_dhcp_enabled(*enabled) {
                    Ok(SetOutcome::Applied) => {
                        Some(StateChange::NetworkDhcp { enabled: *enabled })
                    }
                    _ => None,
                }
            }
            Response::NetworkSddp { enabled } => {
                match self.model.set_sddp_enabled(*enabled) {
                    Ok(SetOutcome::Applied) => {
                        Some(StateChange::NetworkSddp { enabled: *enabled })
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
