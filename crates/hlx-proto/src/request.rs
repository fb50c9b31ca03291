//! Typed request frames.
//!
//! A request body is the concatenation of a property code, an object code,
//! an identifier, and an operation or value suffix: `VO3-20` sets zone 3's
//! volume, `VO3U` nudges it up, `VMTO1` toggles zone 1's mute. Queries are
//! `Q` plus the object (`QO3`, `QOA`). Requests travel bare, without the
//! parentheses that mark responses.

use std::fmt;
use std::sync::OnceLock;

use crate::error::Error;
use crate::fields;
use crate::ident::{Identifier, Kind};
use crate::pattern::{FrameMatch, Matcher};
use crate::response::ResponsePattern;

/// Pattern identifiers for every request shape the server recognizes, in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPattern {
    QueryAllZones,
    QueryZone,
    QuerySources,
    QueryInfrared,
    QueryGroup,
    QueryFrontPanel,
    QueryFavorite,
    QueryPreset,
    QueryNetwork,
    ToggleZoneMute,
    ClearZoneMute,
    SetZoneMute,
    ZoneVolumeUp,
    ZoneVolumeDown,
    SetZoneVolume,
    ZoneBalanceLeft,
    ZoneBalanceRight,
    ZoneBalanceCenter,
    ZoneBassUp,
    ZoneBassDown,
    SetZoneBass,
    ZoneTrebleUp,
    ZoneTrebleDown,
    SetZoneTreble,
    SetZoneSource,
    SetPresetName,
    SetZoneName,
    SetSourceName,
    SetGroupName,
    SetFavoriteName,
    PresetBandUp,
    PresetBandDown,
    SetPresetBand,
    SetZoneHighpass,
    SetZoneLowpass,
    AddGroupZone,
    RemoveGroupZone,
    SetInfraredDisabled,
    SetFrontPanelBrightness,
    SetFrontPanelLocked,
}

#[rustfmt::skip]
const REQUEST_TABLE: &[(RequestPattern, &str, usize)] = &[
    (RequestPattern::QueryAllZones,           r"^QOA", 0),
    (RequestPattern::QueryZone,               r"^QO([1-9][0-9]?)", 1),
    (RequestPattern::QuerySources,            r"^QIA", 0),
    (RequestPattern::QueryInfrared,           r"^QIR", 0),
    (RequestPattern::QueryGroup,              r"^QG([1-9][0-9]?)", 1),
    (RequestPattern::QueryFrontPanel,         r"^QFP", 0),
    (RequestPattern::QueryFavorite,           r"^QF([1-9][0-9]?)", 1),
    (RequestPattern::QueryPreset,             r"^QEP([1-9][0-9]?)", 1),
    (RequestPattern::QueryNetwork,            r"^QN", 0),
    (RequestPattern::ToggleZoneMute,          r"^VMTO([1-9][0-9]?)", 1),
    (RequestPattern::ClearZoneMute,           r"^VMUO([1-9][0-9]?)", 1),
    (RequestPattern::SetZoneMute,             r"^VMO([1-9][0-9]?)", 1),
    (RequestPattern::ZoneVolumeUp,            r"^VO([1-9][0-9]?)U", 1),
    (RequestPattern::ZoneVolumeDown,          r"^VO([1-9][0-9]?)D", 1),
    (RequestPattern::SetZoneVolume,           r"^VO([1-9][0-9]?)(0|-[1-9][0-9]?)", 2),
    (RequestPattern::ZoneBalanceLeft,         r"^BO([1-9][0-9]?)L([1-9][0-9]?)", 2),
    (RequestPattern::ZoneBalanceRight,        r"^BO([1-9][0-9]?)R([1-9][0-9]?)", 2),
    (RequestPattern::ZoneBalanceCenter,       r"^BO([1-9][0-9]?)C", 1),
    (RequestPattern::ZoneBassUp,              r"^TO([1-9][0-9]?)BU", 1),
    (RequestPattern::ZoneBassDown,            r"^TO([1-9][0-9]?)BD", 1),
    (RequestPattern::SetZoneBass,             r"^TO([1-9][0-9]?)B(0|-?[1-9][0-9]?)", 2),
    (RequestPattern::ZoneTrebleUp,            r"^TO([1-9][0-9]?)TU", 1),
    (RequestPattern::ZoneTrebleDown,          r"^TO([1-9][0-9]?)TD", 1),
    (RequestPattern::SetZoneTreble,           r"^TO([1-9][0-9]?)T(0|-?[1-9][0-9]?)", 2),
    (RequestPattern::SetZoneSource,           r"^CO([1-9][0-9]?)([1-9])", 2),
    (RequestPattern::SetPresetName,           "^NEP([1-9][0-9]?)\"([^\"]{1,16})\"", 2),
    (RequestPattern::SetZoneName,             "^NO([1-9][0-9]?)\"([^\"]{1,16})\"", 2),
    (RequestPattern::SetSourceName,           "^NI([1-9][0-9]?)\"([^\"]{1,16})\"", 2),
    (RequestPattern::SetGroupName,            "^NG([1-9][0-9]?)\"([^\"]{1,16})\"", 2),
    (RequestPattern::SetFavoriteName,         "^NF([1-9][0-9]?)\"([^\"]{1,16})\"", 2),
    (RequestPattern::PresetBandUp,            r"^EEP([1-9][0-9]?)B([1-9][0-9]?)U", 2),
    (RequestPattern::PresetBandDown,          r"^EEP([1-9][0-9]?)B([1-9][0-9]?)D", 2),
    (RequestPattern::SetPresetBand,           r"^EEP([1-9][0-9]?)B([1-9][0-9]?)L(0|-?[1-9][0-9]?)", 3),
    (RequestPattern::SetZoneHighpass,         r"^EO([1-9][0-9]?)HP([1-9][0-9]{0,4})", 2),
    (RequestPattern::SetZoneLowpass,          r"^EO([1-9][0-9]?)LP([1-9][0-9]{0,4})", 2),
    (RequestPattern::AddGroupZone,            r"^GA([1-9][0-9]?)O([1-9][0-9]?)", 2),
    (RequestPattern::RemoveGroupZone,         r"^GR([1-9][0-9]?)O([1-9][0-9]?)", 2),
    (RequestPattern::SetInfraredDisabled,     r"^IRD([01])", 1),
    (RequestPattern::SetFrontPanelBrightness, r"^FPB([0-3])", 1),
    (RequestPattern::SetFrontPanelLocked,     r"^FPL([01])", 1),
];

/// The process-wide compiled registry of server-inbound frame shapes.
pub fn request_matcher() -> &'static Matcher<RequestPattern> {
    static MATCHER: OnceLock<Matcher<RequestPattern>> = OnceLock::new();
    MATCHER.get_or_init(|| Matcher::new(REQUEST_TABLE).expect("request pattern registry compiles"))
}

/// A decoded request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    QueryZone { zone: Identifier },
    QueryAllZones,
    QuerySources,
    QueryGroup { group: Identifier },
    QueryFavorite { favorite: Identifier },
    QueryPreset { preset: Identifier },
    QueryInfrared,
    QueryNetwork,
    QueryFrontPanel,
    SetZoneVolume { zone: Identifier, level: i8 },
    ZoneVolumeUp { zone: Identifier },
    ZoneVolumeDown { zone: Identifier },
    SetZoneMute { zone: Identifier },
    ClearZoneMute { zone: Identifier },
    ToggleZoneMute { zone: Identifier },
    SetZoneBalance { zone: Identifier, balance: i8 },
    SetZoneBass { zone: Identifier, level: i8 },
    ZoneBassUp { zone: Identifier },
    ZoneBassDown { zone: Identifier },
    SetZoneTreble { zone: Identifier, level: i8 },
    ZoneTrebleUp { zone: Identifier },
    ZoneTrebleDown { zone: Identifier },
    SetZoneSource { zone: Identifier, source: Identifier },
    SetZoneName { zone: Identifier, name: String },
    SetSourceName { source: Identifier, name: String },
    SetGroupName { group: Identifier, name: String },
    SetFavoriteName { favorite: Identifier, name: String },
    SetPresetName { preset: Identifier, name: String },
    SetPresetBand { preset: Identifier, band: Identifier, level: i8 },
    PresetBandUp { preset: Identifier, band: Identifier },
    PresetBandDown { preset: Identifier, band: Identifier },
    SetZoneHighpass { zone: Identifier, frequency: u16 },
    SetZoneLowpass { zone: Identifier, frequency: u16 },
    AddGroupZone { group: Identifier, zone: Identifier },
    RemoveGroupZone { group: Identifier, zone: Identifier },
    SetInfraredDisabled { disabled: bool },
    SetFrontPanelBrightness { brightness: u8 },
    SetFrontPanelLocked { locked: bool },
}

impl Request {
    /// Decode a matched frame into its typed form. Identifier bounds are
    /// enforced here, before the dispatcher can observe the request.
    pub fn decode(m: &FrameMatch<RequestPattern>) -> Result<Request, Error> {
        use RequestPattern as P;
        Ok(match m.pattern {
            P::QueryAllZones => Request::QueryAllZones,
            P::QueryZone => Request::QueryZone {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::QuerySources => Request::QuerySources,
            P::QueryInfrared => Request::QueryInfrared,
            P::QueryGroup => Request::QueryGroup {
                group: fields::id(Kind::Group, m, 1)?,
            },
            P::QueryFrontPanel => Request::QueryFrontPanel,
            P::QueryFavorite => Request::QueryFavorite {
                favorite: fields::id(Kind::Favorite, m, 1)?,
            },
            P::QueryPreset => Request::QueryPreset {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
            },
            P::QueryNetwork => Request::QueryNetwork,
            P::ToggleZoneMute => Request::ToggleZoneMute {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::ClearZoneMute => Request::ClearZoneMute {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::SetZoneMute => Request::SetZoneMute {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::ZoneVolumeUp => Request::ZoneVolumeUp {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::ZoneVolumeDown => Request::ZoneVolumeDown {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::SetZoneVolume => Request::SetZoneVolume {
                zone: fields::id(Kind::Zone, m, 1)?,
                level: fields::level(m, 2)?,
            },
            P::ZoneBalanceLeft => Request::SetZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: -fields::level(m, 2)?,
            },
            P::ZoneBalanceRight => Request::SetZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: fields::level(m, 2)?,
            },
            P::ZoneBalanceCenter => Request::SetZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: 0,
            },
            P::ZoneBassUp => Request::ZoneBassUp {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::ZoneBassDown => Request::ZoneBassDown {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::SetZoneBass => Request::SetZoneBass {
                zone: fields::id(Kind::Zone, m, 1)?,
                level: fields::level(m, 2)?,
            },
            P::ZoneTrebleUp => Request::ZoneTrebleUp {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::ZoneTrebleDown => Request::ZoneTrebleDown {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::SetZoneTreble => Request::SetZoneTreble {
                zone: fields::id(Kind::Zone, m, 1)?,
                level: fields::level(m, 2)?,
            },
            P::SetZoneSource => Request::SetZoneSource {
                zone: fields::id(Kind::Zone, m, 1)?,
                source: fields::id(Kind::Source, m, 2)?,
            },
            P::SetPresetName => Request::SetPresetName {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::SetZoneName => Request::SetZoneName {
                zone: fields::id(Kind::Zone, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::SetSourceName => Request::SetSourceName {
                source: fields::id(Kind::Source, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::SetGroupName => Request::SetGroupName {
                group: fields::id(Kind::Group, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::SetFavoriteName => Request::SetFavoriteName {
                favorite: fields::id(Kind::Favorite, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::PresetBandUp => Request::PresetBandUp {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                band: fields::id(Kind::EqualizerBand, m, 2)?,
            },
            P::PresetBandDown => Request::PresetBandDown {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                band: fields::id(Kind::EqualizerBand, m, 2)?,
            },
            P::SetPresetBand => Request::SetPresetBand {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                band: fields::id(Kind::EqualizerBand, m, 2)?,
                level: fields::level(m, 3)?,
            },
            P::SetZoneHighpass => Request::SetZoneHighpass {
                zone: fields::id(Kind::Zone, m, 1)?,
                frequency: fields::frequency(m, 2)?,
            },
            P::SetZoneLowpass => Request::SetZoneLowpass {
                zone: fields::id(Kind::Zone, m, 1)?,
                frequency: fields::frequency(m, 2)?,
            },
            P::AddGroupZone => Request::AddGroupZone {
                group: fields::id(Kind::Group, m, 1)?,
                zone: fields::id(Kind::Zone, m, 2)?,
            },
            P::RemoveGroupZone => Request::RemoveGroupZone {
                group: fields::id(Kind::Group, m, 1)?,
                zone: fields::id(Kind::Zone, m, 2)?,
            },
            P::SetInfraredDisabled => Request::SetInfraredDisabled {
                disabled: fields::flag(m, 1)?,
            },
            P::SetFrontPanelBrightness => Request::SetFrontPanelBrightness {
                brightness: fields::int(m, 1)? as u8,
            },
            P::SetFrontPanelLocked => Request::SetFrontPanelLocked {
                locked: fields::flag(m, 1)?,
            },
        })
    }

    /// Render the request body for transmission.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// The response patterns that can complete an exchange carrying this
    /// request. Most requests have one; a toggle can land either way and a
    /// balance write renders as whichever side it ends on.
    pub fn expected_responses(&self) -> &'static [ResponsePattern] {
        use ResponsePattern as R;
        match self {
            Request::QueryZone { .. } => &[R::ZoneQueryDone],
            Request::QueryAllZones => &[R::AllZonesQueryDone],
            Request::QuerySources => &[R::SourcesQueryDone],
            Request::QueryGroup { .. } => &[R::GroupQueryDone],
            Request::QueryFavorite { .. } => &[R::FavoriteQueryDone],
            Request::QueryPreset { .. } => &[R::PresetQueryDone],
            // The amplifier answers the infrared query with a frame shaped
            // exactly like the unsolicited disabled-changed notification.
            Request::QueryInfrared => &[R::InfraredDisabled],
            Request::QueryNetwork => &[R::NetworkQueryDone],
            Request::QueryFrontPanel => &[R::FrontPanelQueryDone],
            Request::SetZoneVolume { .. }
            | Request::ZoneVolumeUp { .. }
            | Request::ZoneVolumeDown { .. } => &[R::ZoneVolume],
            Request::SetZoneMute { .. } => &[R::ZoneMuted],
            Request::ClearZoneMute { .. } => &[R::ZoneUnmuted],
            Request::ToggleZoneMute { .. } => &[R::ZoneMuted, R::ZoneUnmuted],
            Request::SetZoneBalance { .. } => {
                &[R::ZoneBalanceLeft, R::ZoneBalanceRight, R::ZoneBalanceCenter]
            }
            Request::SetZoneBass { .. }
            | Request::ZoneBassUp { .. }
            | Request::ZoneBassDown { .. }
            | Request::SetZoneTreble { .. }
            | Request::ZoneTrebleUp { .. }
            | Request::ZoneTrebleDown { .. } => &[R::ZoneTone],
            Request::SetZoneSource { .. } => &[R::ZoneSource],
            Request::SetZoneName { .. } => &[R::ZoneName],
            Request::SetSourceName { .. } => &[R::SourceName],
            Request::SetGroupName { .. } => &[R::GroupName],
            Request::SetFavoriteName { .. } => &[R::FavoriteName],
            Request::SetPresetName { .. } => &[R::PresetName],
            Request::SetPresetBand { .. }
            | Request::PresetBandUp { .. }
            | Request::PresetBandDown { .. } => &[R::PresetBand],
            Request::SetZoneHighpass { .. } => &[R::ZoneHighpass],
            Request::SetZoneLowpass { .. } => &[R::ZoneLowpass],
            Request::AddGroupZone { .. } => &[R::GroupZoneAdded],
            Request::RemoveGroupZone { .. } => &[R::GroupZoneRemoved],
            Request::SetInfraredDisabled { .. } => &[R::InfraredDisabled],
            Request::SetFrontPanelBrightness { .. } => &[R::FrontPanelBrightness],
            Request::SetFrontPanelLocked { .. } => &[R::FrontPanelLocked],
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::QueryZone { zone } => write!(f, "QO{zone}"),
            Request::QueryAllZones => write!(f, "QOA"),
            Request::QuerySources => write!(f, "QIA"),
            Request::QueryGroup { group } => write!(f, "QG{group}"),
            Request::QueryFavorite { favorite } => write!(f, "QF{favorite}"),
            Request::QueryPreset { preset } => write!(f, "QEP{preset}"),
            Request::QueryInfrared => write!(f, "QIR"),
            Request::QueryNetwork => write!(f, "QN"),
            Request::QueryFrontPanel => write!(f, "QFP"),
            Request::SetZoneVolume { zone, level } => write!(f, "VO{zone}{level}"),
            Request::ZoneVolumeUp { zone } => write!(f, "VO{zone}U"),
            Request::ZoneVolumeDown { zone } => write!(f, "VO{zone}D"),
            Request::SetZoneMute { zone } => write!(f, "VMO{zone}"),
            Request::ClearZoneMute { zone } => write!(f, "VMUO{zone}"),
            Request::ToggleZoneMute { zone } => write!(f, "VMTO{zone}"),
            Request::SetZoneBalance { zone, balance } if *balance < 0 => {
                write!(f, "BO{zone}L{}", -i16::from(*balance))
            }
            Request::SetZoneBalance { zone, balance } if *balance > 0 => {
                write!(f, "BO{zone}R{balance}")
            }
            Request::SetZoneBalance { zone, .. } => write!(f, "BO{zone}C"),
            Request::SetZoneBass { zone, level } => write!(f, "TO{zone}B{level}"),
            Request::ZoneBassUp { zone } => write!(f, "TO{zone}BU"),
            Request::ZoneBassDown { zone } => write!(f, "TO{zone}BD"),
            Request::SetZoneTreble { zone, level } => write!(f, "TO{zone}T{level}"),
            Request::ZoneTrebleUp { zone } => write!(f, "TO{zone}TU"),
            Request::ZoneTrebleDown { zone } => write!(f, "TO{zone}TD"),
            Request::SetZoneSource { zone, source } => write!(f, "CO{zone}{source}"),
            Request::SetZoneName { zone, name } => write!(f, "NO{zone}\"{name}\""),
            Request::SetSourceName { source, name } => write!(f, "NI{source}\"{name}\""),
            Request::SetGroupName { group, name } => write!(f, "NG{group}\"{name}\""),
            Request::SetFavoriteName { favorite, name } => write!(f, "NF{favorite}\"{name}\""),
            Request::SetPresetName { preset, name } => write!(f, "NEP{preset}\"{name}\""),
            Request::SetPresetBand {
                preset,
                band,
                level,
            } => write!(f, "EEP{preset}B{band}L{level}"),
            Request::PresetBandUp { preset, band } => write!(f, "EEP{preset}B{band}U"),
            Request::PresetBandDown { preset, band } => write!(f, "EEP{preset}B{band}D"),
            Request::SetZoneHighpass { zone, frequency } => write!(f, "EO{zone}HP{frequency}"),
            Request::SetZoneLowpass { zone, frequency } => write!(f, "EO{zone}LP{frequency}"),
            Request::AddGroupZone { group, zone } => write!(f, "GA{group}O{zone}"),
            Request::RemoveGroupZone { group, zone } => write!(f, "GR{group}O{zone}"),
            Request::SetInfraredDisabled { disabled } => write!(f, "IRD{}", u8::from(*disabled)),
            Request::SetFrontPanelBrightness { brightness } => write!(f, "FPB{brightness}"),
            Request::SetFrontPanelLocked { locked } => write!(f, "FPL{}", u8::from(*locked)),
        }
    }
}
