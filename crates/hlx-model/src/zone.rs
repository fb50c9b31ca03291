//! Zone state: name, input source, volume, mute, balance, tone, and the
//! crossover filter pair.

use serde::{Deserialize, Serialize};

use hlx_proto::Identifier;

use crate::{check_range, checked_name, write_slot, ModelError, SetOutcome};

/// Volume attenuation range, in dB. 0 is full output.
pub const VOLUME_MIN: i8 = -80;
pub const VOLUME_MAX: i8 = 0;

/// Balance range; negative is toward the left channel.
pub const BALANCE_MIN: i8 = -80;
pub const BALANCE_MAX: i8 = 80;
pub const BALANCE_CENTER: i8 = 0;

/// Bass and treble boost/cut range, in dB.
pub const TONE_LEVEL_MIN: i8 = -10;
pub const TONE_LEVEL_MAX: i8 = 10;
pub const TONE_LEVEL_FLAT: i8 = 0;

/// Crossover filter frequency range, in Hz.
pub const FREQUENCY_MIN: u16 = 1;
pub const FREQUENCY_MAX: u16 = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneModel {
    name: String,
    source: Identifier,
    volume: i8,
    muted: bool,
    balance: i8,
    bass: i8,
    treble: i8,
    highpass: u16,
    lowpass: u16,
}

impl Default for ZoneModel {
    fn default() -> Self {
        ZoneModel {
            name: String::new(),
            source: Identifier::INVALID,
            volume: VOLUME_MIN,
            muted: false,
            balance: BALANCE_CENTER,
            bass: TONE_LEVEL_FLAT,
            treble: TONE_LEVEL_FLAT,
            highpass: 100,
            lowpass: FREQUENCY_MAX,
        }
    }
}

impl ZoneModel {
    pub(crate) fn numbered(n: u8) -> ZoneModel {
        ZoneModel {
            name: format!("Zone {n}"),
            ..ZoneModel::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Identifier {
        self.source
    }

    pub fn volume(&self) -> i8 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn balance(&self) -> i8 {
        self.balance
    }

    pub fn tone(&self) -> (i8, i8) {
        (self.bass, self.treble)
    }

    pub fn highpass(&self) -> u16 {
        self.highpass
    }

    pub fn lowpass(&self) -> u16 {
        self.lowpass
    }

    pub fn set_name(&mut self, name: &str) -> Result<SetOutcome, ModelError> {
        let name = checked_name(name)?;
        Ok(write_slot(&mut self.name, name))
    }

    pub fn set_source(&mut self, source: Identifier) -> Result<SetOutcome, ModelError> {
        if !source.is_valid() {
            return Err(ModelError::InvalidIdentifier);
        }
        Ok(write_slot(&mut self.source, source))
    }

    pub fn set_volume(&mut self, level: i8) -> Result<SetOutcome, ModelError> {
        check_range("volume", level.into(), VOLUME_MIN.into(), VOLUME_MAX.into())?;
        Ok(write_slot(&mut self.volume, level))
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<SetOutcome, ModelError> {
        Ok(write_slot(&mut self.muted, muted))
    }

    pub fn set_balance(&mut self, balance: i8) -> Result<SetOutcome, ModelError> {
        check_range(
            "balance",
            balance.into(),
            BALANCE_MIN.into(),
            BALANCE_MAX.into(),
        )?;
        Ok(write_slot(&mut self.balance, balance))
    }

    pub fn set_bass(&mut self, level: i8) -> Result<SetOutcome, ModelError> {
        check_range(
            "bass",
            level.into(),
            TONE_LEVEL_MIN.into(),
            TONE_LEVEL_MAX.into(),
        )?;
        Ok(write_slot(&mut self.bass, level))
    }

    pub fn set_treble(&mut self, level: i8) -> Result<SetOutcome, ModelError> {
        check_range(
            "treble",
            level.into(),
            TONE_LEVEL_MIN.into(),
            TONE_LEVEL_MAX.into(),
        )?;
        Ok(write_slot(&mut self.treble, level))
    }

    /// Set both tone controls at once, reporting `Applied` if either moved.
    pub fn set_tone(&mut self, bass: i8, treble: i8) -> Result<SetOutcome, ModelError> {
        check_range(
            "bass",
            bass.into(),
            TONE_LEVEL_MIN.into(),
            TONE_LEVEL_MAX.into(),
        )?;
        check_range(
            "treble",
            treble.into(),
            TONE_LEVEL_MIN.into(),
            TONE_LEVEL_MAX.into(),
        )?;
        let bass_outcome = write_slot(&mut self.bass, bass);
        let treble_outcome = write_slot(&mut self.treble, treble);
        if bass_outcome == SetOutcome::Applied || treble_outcome == SetOutcome::Applied {
            Ok(SetOutcome::Applied)
        } else {
            Ok(SetOutcome::AlreadySet)
        }
    }

    pub fn set_highpass(&mut self, frequency: u16) -> Result<SetOutcome, ModelError> {
        check_range(
            "highpass",
            frequency.into(),
            FREQUENCY_MIN.into(),
            FREQUENCY_MAX.into(),
        )?;
        Ok(write_slot(&mut self.highpass, frequency))
    }

    pub fn set_lowpass(&mut self, frequency: u16) -> Result<SetOutcome, ModelError> {
        check_range(
            "lowpass",
            frequency.into(),
            FREQUENCY_MIN.into(),
            FREQUENCY_MAX.into(),
        )?;
        Ok(write_slot(&mut self.lowpass, frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_the_present_value_is_already_set() {
        let mut zone = ZoneModel::default();
        assert_eq!(zone.set_volume(-20).unwrap(), SetOutcome::Applied);
        assert_eq!(zone.set_volume(-20).unwrap(), SetOutcome::AlreadySet);
        assert_eq!(zone.volume(), -20);

        assert_eq!(zone.set_muted(true).unwrap(), SetOutcome::Applied);
        assert_eq!(zone.set_muted(true).unwrap(), SetOutcome::AlreadySet);
    }

    #[test]
    fn out_of_range_writes_are_rejected_without_mutating() {
        let mut zone = ZoneModel::default();
        zone.set_volume(-20).unwrap();
        assert!(zone.set_volume(1).is_err());
        assert!(zone.set_volume(-81).is_err());
        assert_eq!(zone.volume(), -20);
        assert!(zone.set_balance(81).is_err());
        assert!(zone.set_bass(11).is_err());
        assert!(zone.set_highpass(0).is_err());
        assert!(zone.set_lowpass(20_001).is_err());
    }

    #[test]
    fn tone_applies_when_either_control_moves() {
        let mut zone = ZoneModel::default();
        assert_eq!(zone.set_tone(2, 0).unwrap(), SetOutcome::Applied);
        assert_eq!(zone.set_tone(2, 0).unwrap(), SetOutcome::AlreadySet);
        assert_eq!(zone.set_tone(2, -1).unwrap(), SetOutcome::Applied);
        assert_eq!(zone.tone(), (2, -1));
    }

    #[test]
    fn names_are_validated() {
        let mut zone = ZoneModel::default();
        assert!(zone.set_name("Living Room").is_ok());
        assert!(zone.set_name("").is_err());
        assert!(zone.set_name("seventeen bytes!!").is_err());
    }

    #[test]
    fn source_must_be_a_valid_identifier() {
        let mut zone = ZoneModel::default();
        assert!(zone.set_source(Identifier::INVALID).is_err());
    }
}
