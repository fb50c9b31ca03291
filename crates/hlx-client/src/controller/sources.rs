//! Sources controller.
//!
//! The peer exposes no per-source query, so this controller issues no
//! refresh queries of its own: source names arrive inside the one-shot
//! configuration dump the zones controller requests, and its refresh
//! completes immediately.

use tracing::warn;

use hlx_model::{SetOutcome, SourceModel};
use hlx_proto::{Kind, Request, Response};

use crate::event::StateChange;

pub(crate) struct SourcesController {
    sources: Vec<SourceModel>,
}

impl SourcesController {
    pub(crate) fn new() -> SourcesController {
        SourcesController {
            sources: Kind::Source.all().map(|_| SourceModel::default()).collect(),
        }
    }

    pub(crate) fn models(&self) -> &[SourceModel] {
        &self.sources
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        Vec::new()
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let Response::SourceName { source, name } = response else {
            return None;
        };
        let model = self
            .sources
            .get_mut(source.get().checked_sub(1)? as usize)?;
        match model.set_name(name) {
            Ok(SetOutcome::Applied) => Some(StateChange::SourceName {
                source: *source,
                name: name.clone(),
            }),
            Ok(SetOutcome::AlreadySet) => None,
            Err(error) => {
                warn!(source = %source, %error, "rejected source notification");
                None
            }
        }
    }
}
