//! Equalizer presets controller: preset names and per-band levels.

use tracing::warn;

use hlx_model::{EqualizerPresetModel, SetOutcome};
use hlx_proto::{Kind, Request, Response};

use crate::event::StateChange;

pub(crate) struct EqualizerPresetsController {
    presets: Vec<EqualizerPresetModel>,
}

impl EqualizerPresetsController {
    pub(crate) fn new() -> EqualizerPresetsController {
        EqualizerPresetsController {
            presets: Kind::EqualizerPreset
                .all()
                .map(|_| EqualizerPresetModel::default())
                .collect(),
        }
    }

    pub(crate) fn models(&self) -> &[EqualizerPresetModel] {
        &self.presets
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        Kind::EqualizerPreset
            .all()
            .map(|preset| Request::QueryPreset { preset })
            .collect()
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let (preset, outcome, change) = match response {
            Response::PresetName { preset, name } => {
                let model = self
                    .presets
                    .get_mut(preset.get().checked_sub(1)? as usize)?;
                (
                    *preset,
                    model.set_name(name),
                    StateChange::PresetName {
                        preset: *preset,
                        name: name.clone(),
                    },
                )
            }
            Response::PresetBand {
                preset,
                band,
                level,
            } => {
                let model = self
                    .presets
                    .get_mut(preset.get().checked_sub(1)? as usize)?;
                (
                    *preset,
                    model.set_band(*band, *level),
                    StateChange::PresetBand {
                        preset: *preset,
                        band: *band,
                        level: *level,
                    },
                )
            }
            _ => return None,
        };
        match outcome {
            Ok(SetOutcome::Applied) => Some(change),
            Ok(SetOutcome::AlreadySet) => None,
            Err(error) => {
                warn!(%preset, %error, "rejected preset notification");
                None
            }
        }
    }
}
