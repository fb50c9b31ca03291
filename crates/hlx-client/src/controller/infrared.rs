//! Infrared controller.
//!
//! Peer quirk: the amplifier answers the infrared disabled query with a
//! frame shaped exactly like the unsolicited disabled-changed
//! notification — there is no distinct query-response form. This handler
//! therefore serves both arrivals interchangeably, and the refresh
//! exchange for `QIR` waits on the notification shape itself.

use hlx_model::{InfraredModel, SetOutcome};
use hlx_proto::{Request, Response};

use crate::event::StateChange;

pub(crate) struct InfraredController {
    model: InfraredModel,
}

impl InfraredController {
    pub(crate) fn new() -> InfraredController {
        InfraredController {
            model: InfraredModel::default(),
        }
    }

    pub(crate) fn model(&self) -> &InfraredModel {
        &self.model
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        vec![Request::QueryInfrared]
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let Response::InfraredDisabled { disabled } = response else {
            return None;
        };
        match self.model.set_disabled(*disabled) {
            Ok(SetOutcome::Applied) => Some(StateChange::InfraredDisabled {
                disabled: *disabled,
            }),
            _ => None,
        }
    }
}
