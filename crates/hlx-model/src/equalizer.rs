//! Equalizer preset state: a name and ten band levels.

use serde::{Deserialize, Serialize};

use hlx_proto::{Identifier, Kind};

use crate::{check_range, checked_name, write_slot, ModelError, SetOutcome};

/// Band boost/cut range, in dB.
pub const BAND_LEVEL_MIN: i8 = -10;
pub const BAND_LEVEL_MAX: i8 = 10;
pub const BAND_LEVEL_FLAT: i8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualizerPresetModel {
    name: String,
    bands: Vec<i8>,
}

impl Default for EqualizerPresetModel {
    fn default() -> Self {
        EqualizerPresetModel {
            name: String::new(),
            bands: vec![BAND_LEVEL_FLAT; Kind::EqualizerBand.max() as usize],
        }
    }
}

impl EqualizerPresetModel {
    pub(crate) fn numbered(n: u8) -> EqualizerPresetModel {
        EqualizerPresetModel {
            name: format!("Preset {n}"),
            ..EqualizerPresetModel::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn band(&self, band: Identifier) -> Option<i8> {
        self.bands.get(band.get().checked_sub(1)? as usize).copied()
    }

    pub fn bands(&self) -> &[i8] {
        &self.bands
    }

    pub fn set_name(&mut self, name: &str) -> Result<SetOutcome, ModelError> {
        let name = checked_name(name)?;
        Ok(write_slot(&mut self.name, name))
    }

    pub fn set_band(&mut self, band: Identifier, level: i8) -> Result<SetOutcome, ModelError> {
        check_range(
            "band level",
            level.into(),
            BAND_LEVEL_MIN.into(),
            BAND_LEVEL_MAX.into(),
        )?;
        let slot = band
            .get()
            .checked_sub(1)
            .and_then(|i| self.bands.get_mut(i as usize))
            .ok_or(ModelError::InvalidIdentifier)?;
        Ok(write_slot(slot, level))
    }

    pub(crate) fn normalize(&mut self) {
        self.bands.resize(Kind::EqualizerBand.max() as usize, BAND_LEVEL_FLAT);
        for level in &mut self.bands {
            *level = (*level).clamp(BAND_LEVEL_MIN, BAND_LEVEL_MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_levels_are_bounded_and_idempotent() {
        let mut preset = EqualizerPresetModel::default();
        let b5 = Kind::EqualizerBand.checked(5).unwrap();
        assert_eq!(preset.set_band(b5, 3).unwrap(), SetOutcome::Applied);
        assert_eq!(preset.set_band(b5, 3).unwrap(), SetOutcome::AlreadySet);
        assert!(preset.set_band(b5, 11).is_err());
        assert_eq!(preset.band(b5), Some(3));
        assert!(preset.set_band(Identifier::INVALID, 0).is_err());
    }
}
