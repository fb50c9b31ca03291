//! Local data model of the amplifier.
//!
//! One model instance mirrors the full state of the device: 24 zones, 8
//! sources, groups, favorites, equalizer presets, and the singleton
//! infrared/network/front-panel aspects. The client reconstructs it from
//! the peer during refresh; the simulator owns it authoritatively and
//! serializes it as the configuration backing store.
//!
//! Setters validate ranges and report [`SetOutcome::AlreadySet`] when asked
//! to write the value already present. That outcome is a status, not an
//! error: the caller's intent is already true, and no state-change event
//! may be derived from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hlx_proto::{Identifier, Kind};

mod equalizer;
mod favorite;
mod front_panel;
mod group;
mod infrared;
mod network;
mod source;
mod zone;

pub use equalizer::{EqualizerPresetModel, BAND_LEVEL_FLAT, BAND_LEVEL_MAX, BAND_LEVEL_MIN};
pub use favorite::FavoriteModel;
pub use front_panel::{FrontPanelModel, BRIGHTNESS_MAX};
pub use group::GroupModel;
pub use infrared::InfraredModel;
pub use network::NetworkModel;
pub use source::SourceModel;
pub use zone::{
    ZoneModel, BALANCE_CENTER, BALANCE_MAX, BALANCE_MIN, FREQUENCY_MAX, FREQUENCY_MIN,
    TONE_LEVEL_FLAT, TONE_LEVEL_MAX, TONE_LEVEL_MIN, VOLUME_MAX, VOLUME_MIN,
};

/// Outcome of a successful property write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value changed; exactly one state-change notification follows.
    Applied,
    /// The value was already present; no notification may be emitted.
    AlreadySet,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{property} {value} out of range [{min}, {max}]")]
    OutOfRange {
        property: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("invalid name")]
    InvalidName,
    #[error("invalid identifier")]
    InvalidIdentifier,
}

pub(crate) fn check_range(
    property: &'static str,
    value: i32,
    min: i32,
    max: i32,
) -> Result<(), ModelError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::OutOfRange {
            property,
            value,
            min,
            max,
        })
    }
}

pub(crate) fn checked_name(name: &str) -> Result<String, ModelError> {
    hlx_proto::validate_name(name).map_err(|_| ModelError::InvalidName)?;
    Ok(name.to_owned())
}

/// Write a value through a mutable slot, reporting whether anything changed.
pub(crate) fn write_slot<T: PartialEq>(slot: &mut T, value: T) -> SetOutcome {
    if *slot == value {
        SetOutcome::AlreadySet
    } else {
        *slot = value;
        SetOutcome::Applied
    }
}

/// The whole-amplifier state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmplifierModel {
    pub zones: Vec<ZoneModel>,
    pub sources: Vec<SourceModel>,
    pub groups: Vec<GroupModel>,
    pub favorites: Vec<FavoriteModel>,
    pub presets: Vec<EqualizerPresetModel>,
    pub infrared: InfraredModel,
    pub network: NetworkModel,
    pub front_panel: FrontPanelModel,
}

impl Default for AmplifierModel {
    fn default() -> Self {
        AmplifierModel {
            zones: (1..=Kind::Zone.max())
                .map(|n| ZoneModel::numbered(n))
                .collect(),
            sources: (1..=Kind::Source.max())
                .map(|n| SourceModel::numbered(n))
                .collect(),
            groups: (1..=Kind::Group.max())
                .map(|n| GroupModel::numbered(n))
                .collect(),
            favorites: (1..=Kind::Favorite.max())
                .map(|n| FavoriteModel::numbered(n))
                .collect(),
            presets: (1..=Kind::EqualizerPreset.max())
                .map(|n| EqualizerPresetModel::numbered(n))
                .collect(),
            infrared: InfraredModel::default(),
            network: NetworkModel::default(),
            front_panel: FrontPanelModel::default(),
        }
    }
}

macro_rules! accessors {
    ($get:ident, $get_mut:ident, $field:ident, $ty:ty) => {
        pub fn $get(&self, id: Identifier) -> Option<&$ty> {
            self.$field.get(id.get().checked_sub(1)? as usize)
        }

        pub fn $get_mut(&mut self, id: Identifier) -> Option<&mut $ty> {
            self.$field.get_mut(id.get().checked_sub(1)? as usize)
        }
    };
}

impl AmplifierModel {
    accessors!(zone, zone_mut, zones, ZoneModel);
    accessors!(source, source_mut, sources, SourceModel);
    accessors!(group, group_mut, groups, GroupModel);
    accessors!(favorite, favorite_mut, favorites, FavoriteModel);
    accessors!(preset, preset_mut, presets, EqualizerPresetModel);

    /// Restore the hardware shape after deserializing a foreign document:
    /// pad or truncate every collection to its kind's size.
    pub fn normalize(&mut self) {
        fix_len(&mut self.zones, Kind::Zone.max(), ZoneModel::numbered);
        fix_len(&mut self.sources, Kind::Source.max(), SourceModel::numbered);
        fix_len(&mut self.groups, Kind::Group.max(), GroupModel::numbered);
        fix_len(
            &mut self.favorites,
            Kind::Favorite.max(),
            FavoriteModel::numbered,
        );
        fix_len(
            &mut self.presets,
            Kind::EqualizerPreset.max(),
            EqualizerPresetModel::numbered,
        );
        for preset in &mut self.presets {
            preset.normalize();
        }
    }
}

fn fix_len<T>(items: &mut Vec<T>, max: u8, numbered: impl Fn(u8) -> T) {
    items.truncate(max as usize);
    for n in (items.len() as u8 + 1)..=max {
        items.push(numbered(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_has_hardware_shape() {
        let model = AmplifierModel::default();
        assert_eq!(model.zones.len(), 24);
        assert_eq!(model.sources.len(), 8);
        assert_eq!(model.groups.len(), 10);
        assert_eq!(model.favorites.len(), 10);
        assert_eq!(model.presets.len(), 10);
        let z1 = Kind::Zone.checked(1).unwrap();
        assert_eq!(model.zone(z1).unwrap().name(), "Zone 1");
        assert!(model.zone(Identifier::INVALID).is_none());
    }

    #[test]
    fn serde_round_trip_preserves_state() {
        let mut model = AmplifierModel::default();
        let z3 = Kind::Zone.checked(3).unwrap();
        model.zone_mut(z3).unwrap().set_volume(-20).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: AmplifierModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn normalize_repairs_truncated_collections() {
        let mut model = AmplifierModel::default();
        model.zones.truncate(3);
        model.sources.clear();
        model.normalize();
        assert_eq!(model.zones.len(), 24);
        assert_eq!(model.sources.len(), 8);
        assert_eq!(model.sources[7].name(), "Source 8");
    }
}
