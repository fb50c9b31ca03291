//! Front panel controller: display brightness and lockout.

use tracing::warn;

use hlx_model::{FrontPanelModel, SetOutcome};
use hlx_proto::{Request, Response};

use crate::event::StateChange;

pub(crate) struct FrontPanelController {
    model: FrontPanelModel,
}

impl FrontPanelController {
    pub(crate) fn new() -> FrontPanelController {
        FrontPanelController {
            model: FrontPanelModel::default(),
        }
    }

    pub(crate) fn model(&self) -> &FrontPanelModel {
        &self.model
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        vec![Request::QueryFrontPanel]
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        match response {
            Response::FrontPanelBrightness { brightness } => {
                match self.model.set_brightness(*brightness) {
                    Ok(SetOutcome::Applied) => Some(StateChange::FrontPanelBrightness {
                        brightness: *brightness,
                    }),
                    Ok(SetOutcome::AlreadySet) => None,
                    Err(error) => {
                        warn!(%error, "rejected front panel notification");
                        None
                    }
                }
            }
            Response::FrontPanelLocked { locked } => match self.model.set_locked(*locked) {
                Ok(SetOutcome::Applied) => Some(StateChange::FrontPanelLocked { locked: *locked }),
                _ => None,
            },
            _ => None,
        }
    }
}
