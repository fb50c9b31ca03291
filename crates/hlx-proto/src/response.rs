//! Typed response and notification frames.
//!
//! Responses and unsolicited notifications are morphologically identical:
//! both are a frame body wrapped in parentheses reporting one property's
//! current state. A multi-frame query answer ends with the echoed query as
//! a completion marker, e.g. `(QO3)`; the marker is the frame a pending
//! query exchange waits for, while the property frames ahead of it route
//! through the unsolicited path.

use std::fmt;
use std::sync::OnceLock;

use crate::error::Error;
use crate::fields;
use crate::ident::{Identifier, Kind};
use crate::pattern::{FrameMatch, Matcher, Role};

/// Pattern identifiers for every inbound frame shape the client recognizes,
/// in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponsePattern {
    AllZonesQueryDone,
    ZoneQueryDone,
    SourcesQueryDone,
    GroupQueryDone,
    FavoriteQueryDone,
    PresetQueryDone,
    NetworkQueryDone,
    FrontPanelQueryDone,
    ZoneUnmuted,
    ZoneMuted,
    ZoneVolume,
    ZoneBalanceLeft,
    ZoneBalanceRight,
    ZoneBalanceCenter,
    ZoneTone,
    ZoneSource,
    NetworkDhcp,
    NetworkSddp,
    PresetName,
    ZoneName,
    SourceName,
    GroupName,
    FavoriteName,
    PresetBand,
    ZoneHighpass,
    ZoneLowpass,
    GroupZoneAdded,
    GroupZoneRemoved,
    InfraredDisabled,
    FrontPanelBrightness,
    FrontPanelLocked,
}

impl ResponsePattern {
    /// Whether this shape only ever completes an exchange (query markers)
    /// or arrives through the unsolicited path as well. Property frames do
    /// double duty: the same shape answers a mutation and announces a
    /// change made elsewhere.
    pub fn role(self) -> Role {
        match self {
            ResponsePattern::AllZonesQueryDone
            | ResponsePattern::ZoneQueryDone
            | ResponsePattern::SourcesQueryDone
            | ResponsePattern::GroupQueryDone
            | ResponsePattern::FavoriteQueryDone
            | ResponsePattern::PresetQueryDone
            | ResponsePattern::NetworkQueryDone
            | ResponsePattern::FrontPanelQueryDone => Role::ExchangeResponse,
            _ => Role::Notification,
        }
    }
}

#[rustfmt::skip]
const RESPONSE_TABLE: &[(ResponsePattern, &str, usize)] = &[
    (ResponsePattern::AllZonesQueryDone,    r"^\(QOA\)", 0),
    (ResponsePattern::ZoneQueryDone,        r"^\(QO([1-9][0-9]?)\)", 1),
    (ResponsePattern::SourcesQueryDone,     r"^\(QIA\)", 0),
    (ResponsePattern::GroupQueryDone,       r"^\(QG([1-9][0-9]?)\)", 1),
    (ResponsePattern::FavoriteQueryDone,    r"^\(QF([1-9][0-9]?)\)", 1),
    (ResponsePattern::PresetQueryDone,      r"^\(QEP([1-9][0-9]?)\)", 1),
    (ResponsePattern::NetworkQueryDone,     r"^\(QN\)", 0),
    (ResponsePattern::FrontPanelQueryDone,  r"^\(QFP\)", 0),
    (ResponsePattern::ZoneUnmuted,          r"^\(VMUO([1-9][0-9]?)\)", 1),
    (ResponsePattern::ZoneMuted,            r"^\(VMO([1-9][0-9]?)\)", 1),
    (ResponsePattern::ZoneVolume,           r"^\(VO([1-9][0-9]?)(0|-[1-9][0-9]?)\)", 2),
    (ResponsePattern::ZoneBalanceLeft,      r"^\(BO([1-9][0-9]?)L([1-9][0-9]?)\)", 2),
    (ResponsePattern::ZoneBalanceRight,     r"^\(BO([1-9][0-9]?)R([1-9][0-9]?)\)", 2),
    (ResponsePattern::ZoneBalanceCenter,    r"^\(BO([1-9][0-9]?)C\)", 1),
    (ResponsePattern::ZoneTone,             r"^\(TO([1-9][0-9]?)B(0|-?[1-9][0-9]?)T(0|-?[1-9][0-9]?)\)", 3),
    (ResponsePattern::ZoneSource,           r"^\(CO([1-9][0-9]?)([1-9])\)", 2),
    (ResponsePattern::NetworkDhcp,          r"^\(NDHCP([01])\)", 1),
    (ResponsePattern::NetworkSddp,          r"^\(NSDDP([01])\)", 1),
    (ResponsePattern::PresetName,           "^\\(NEP([1-9][0-9]?)\"([^\"]{1,16})\"\\)", 2),
    (ResponsePattern::ZoneName,             "^\\(NO([1-9][0-9]?)\"([^\"]{1,16})\"\\)", 2),
    (ResponsePattern::SourceName,           "^\\(NI([1-9][0-9]?)\"([^\"]{1,16})\"\\)", 2),
    (ResponsePattern::GroupName,            "^\\(NG([1-9][0-9]?)\"([^\"]{1,16})\"\\)", 2),
    (ResponsePattern::FavoriteName,         "^\\(NF([1-9][0-9]?)\"([^\"]{1,16})\"\\)", 2),
    (ResponsePattern::PresetBand,           r"^\(EEP([1-9][0-9]?)B([1-9][0-9]?)L(0|-?[1-9][0-9]?)\)", 3),
    (ResponsePattern::ZoneHighpass,         r"^\(EO([1-9][0-9]?)HP([1-9][0-9]{0,4})\)", 2),
    (ResponsePattern::ZoneLowpass,          r"^\(EO([1-9][0-9]?)LP([1-9][0-9]{0,4})\)", 2),
    (ResponsePattern::GroupZoneAdded,       r"^\(GA([1-9][0-9]?)O([1-9][0-9]?)\)", 2),
    (ResponsePattern::GroupZoneRemoved,     r"^\(GR([1-9][0-9]?)O([1-9][0-9]?)\)", 2),
    (ResponsePattern::InfraredDisabled,     r"^\(IRD([01])\)", 1),
    (ResponsePattern::FrontPanelBrightness, r"^\(FPB([0-3])\)", 1),
    (ResponsePattern::FrontPanelLocked,     r"^\(FPL([01])\)", 1),
];

/// The process-wide compiled registry of client-inbound frame shapes.
pub fn response_matcher() -> &'static Matcher<ResponsePattern> {
    static MATCHER: OnceLock<Matcher<ResponsePattern>> = OnceLock::new();
    MATCHER.get_or_init(|| Matcher::new(RESPONSE_TABLE).expect("response pattern registry compiles"))
}

/// A decoded response or notification frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    AllZonesQueryDone,
    ZoneQueryDone { zone: Identifier },
    SourcesQueryDone,
    GroupQueryDone { group: Identifier },
    FavoriteQueryDone { favorite: Identifier },
    PresetQueryDone { preset: Identifier },
    NetworkQueryDone,
    FrontPanelQueryDone,
    ZoneMute { zone: Identifier, muted: bool },
    ZoneVolume { zone: Identifier, level: i8 },
    ZoneBalance { zone: Identifier, balance: i8 },
    ZoneTone { zone: Identifier, bass: i8, treble: i8 },
    ZoneSource { zone: Identifier, source: Identifier },
    ZoneName { zone: Identifier, name: String },
    ZoneHighpass { zone: Identifier, frequency: u16 },
    ZoneLowpass { zone: Identifier, frequency: u16 },
    SourceName { source: Identifier, name: String },
    GroupName { group: Identifier, name: String },
    GroupZoneAdded { group: Identifier, zone: Identifier },
    GroupZoneRemoved { group: Identifier, zone: Identifier },
    FavoriteName { favorite: Identifier, name: String },
    PresetName { preset: Identifier, name: String },
    PresetBand { preset: Identifier, band: Identifier, level: i8 },
    InfraredDisabled { disabled: bool },
    NetworkDhcp { enabled: bool },
    NetworkSddp { enabled: bool },
    FrontPanelBrightness { brightness: u8 },
    FrontPanelLocked { locked: bool },
}

impl Response {
    /// Decode a matched frame into its typed form. Identifier bounds are
    /// enforced here, before any handler can observe the frame.
    pub fn decode(m: &FrameMatch<ResponsePattern>) -> Result<Response, Error> {
        use ResponsePattern as P;
        Ok(match m.pattern {
            P::AllZonesQueryDone => Response::AllZonesQueryDone,
            P::ZoneQueryDone => Response::ZoneQueryDone {
                zone: fields::id(Kind::Zone, m, 1)?,
            },
            P::SourcesQueryDone => Response::SourcesQueryDone,
            P::GroupQueryDone => Response::GroupQueryDone {
                group: fields::id(Kind::Group, m, 1)?,
            },
            P::FavoriteQueryDone => Response::FavoriteQueryDone {
                favorite: fields::id(Kind::Favorite, m, 1)?,
            },
            P::PresetQueryDone => Response::PresetQueryDone {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
            },
            P::NetworkQueryDone => Response::NetworkQueryDone,
            P::FrontPanelQueryDone => Response::FrontPanelQueryDone,
            P::ZoneMuted => Response::ZoneMute {
                zone: fields::id(Kind::Zone, m, 1)?,
                muted: true,
            },
            P::ZoneUnmuted => Response::ZoneMute {
                zone: fields::id(Kind::Zone, m, 1)?,
                muted: false,
            },
            P::ZoneVolume => Response::ZoneVolume {
                zone: fields::id(Kind::Zone, m, 1)?,
                level: fields::level(m, 2)?,
            },
            P::ZoneBalanceLeft => Response::ZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: -fields::level(m, 2)?,
            },
            P::ZoneBalanceRight => Response::ZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: fields::level(m, 2)?,
            },
            P::ZoneBalanceCenter => Response::ZoneBalance {
                zone: fields::id(Kind::Zone, m, 1)?,
                balance: 0,
            },
            P::ZoneTone => Response::ZoneTone {
                zone: fields::id(Kind::Zone, m, 1)?,
                bass: fields::level(m, 2)?,
                treble: fields::level(m, 3)?,
            },
            P::ZoneSource => Response::ZoneSource {
                zone: fields::id(Kind::Zone, m, 1)?,
                source: fields::id(Kind::Source, m, 2)?,
            },
            P::ZoneName => Response::ZoneName {
                zone: fields::id(Kind::Zone, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::ZoneHighpass => Response::ZoneHighpass {
                zone: fields::id(Kind::Zone, m, 1)?,
                frequency: fields::frequency(m, 2)?,
            },
            P::ZoneLowpass => Response::ZoneLowpass {
                zone: fields::id(Kind::Zone, m, 1)?,
                frequency: fields::frequency(m, 2)?,
            },
            P::SourceName => Response::SourceName {
                source: fields::id(Kind::Source, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::GroupName => Response::GroupName {
                group: fields::id(Kind::Group, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::GroupZoneAdded => Response::GroupZoneAdded {
                group: fields::id(Kind::Group, m, 1)?,
                zone: fields::id(Kind::Zone, m, 2)?,
            },
            P::GroupZoneRemoved => Response::GroupZoneRemoved {
                group: fields::id(Kind::Group, m, 1)?,
                zone: fields::id(Kind::Zone, m, 2)?,
            },
            P::FavoriteName => Response::FavoriteName {
                favorite: fields::id(Kind::Favorite, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::PresetName => Response::PresetName {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                name: fields::name(m, 2)?,
            },
            P::PresetBand => Response::PresetBand {
                preset: fields::id(Kind::EqualizerPreset, m, 1)?,
                band: fields::id(Kind::EqualizerBand, m, 2)?,
                level: fields::level(m, 3)?,
            },
            P::InfraredDisabled => Response::InfraredDisabled {
                disabled: fields::flag(m, 1)?,
            },
            P::NetworkDhcp => Response::NetworkDhcp {
                enabled: fields::flag(m, 1)?,
            },
            P::NetworkSddp => Response::NetworkSddp {
                enabled: fields::flag(m, 1)?,
            },
            P::FrontPanelBrightness => Response::FrontPanelBrightness {
                brightness: fields::int(m, 1)? as u8,
            },
            P::FrontPanelLocked => Response::FrontPanelLocked {
                locked: fields::flag(m, 1)?,
            },
        })
    }

    /// The pattern this frame renders as.
    pub fn pattern(&self) -> ResponsePattern {
        use ResponsePattern as P;
        match self {
            Response::AllZonesQueryDone => P::AllZonesQueryDone,
            Response::ZoneQueryDone { .. } => P::ZoneQueryDone,
            Response::SourcesQueryDone => P::SourcesQueryDone,
            Response::GroupQueryDone { .. } => P::GroupQueryDone,
            Response::FavoriteQueryDone { .. } => P::FavoriteQueryDone,
            Response::PresetQueryDone { .. } => P::PresetQueryDone,
            Response::NetworkQueryDone => P::NetworkQueryDone,
            Response::FrontPanelQueryDone => P::FrontPanelQueryDone,
            Response::ZoneMute { muted: true, .. } => P::ZoneMuted,
            Response::ZoneMute { muted: false, .. } => P::ZoneUnmuted,
            Response::ZoneVolume { .. } => P::ZoneVolume,
            Response::ZoneBalance { balance, .. } if *balance < 0 => P::ZoneBalanceLeft,
            Response::ZoneBalance { balance, .. } if *balance > 0 => P::ZoneBalanceRight,
            Response::ZoneBalance { .. } => P::ZoneBalanceCenter,
            Response::ZoneTone { .. } => P::ZoneTone,
            Response::ZoneSource { .. } => P::ZoneSource,
            Response::ZoneName { .. } => P::ZoneName,
            Response::ZoneHighpass { .. } => P::ZoneHighpass,
            Response::ZoneLowpass { .. } => P::ZoneLowpass,
            Response::SourceName { .. } => P::SourceName,
            Response::GroupName { .. } => P::GroupName,
            Response::GroupZoneAdded { .. } => P::GroupZoneAdded,
            Response::GroupZoneRemoved { .. } => P::GroupZoneRemoved,
            Response::FavoriteName { .. } => P::FavoriteName,
            Response::PresetName { .. } => P::PresetName,
            Response::PresetBand { .. } => P::PresetBand,
            Response::InfraredDisabled { .. } => P::InfraredDisabled,
            Response::NetworkDhcp { .. } => P::NetworkDhcp,
            Response::NetworkSddp { .. } => P::NetworkSddp,
            Response::FrontPanelBrightness { .. } => P::FrontPanelBrightness,
            Response::FrontPanelLocked { .. } => P::FrontPanelLocked,
        }
    }

    /// Render the frame body, parentheses included.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::AllZonesQueryDone => write!(f, "(QOA)"),
            Response::ZoneQueryDone { zone } => write!(f, "(QO{zone})"),
            Response::SourcesQueryDone => write!(f, "(QIA)"),
            Response::GroupQueryDone { group } => write!(f, "(QG{group})"),
            Response::FavoriteQueryDone { favorite } => write!(f, "(QF{favorite})"),
            Response::PresetQueryDone { preset } => write!(f, "(QEP{preset})"),
            Response::NetworkQueryDone => write!(f, "(QN)"),
            Response::FrontPanelQueryDone => write!(f, "(QFP)"),
            Response::ZoneMute { zone, muted: true } => write!(f, "(VMO{zone})"),
            Response::ZoneMute { zone, muted: false } => write!(f, "(VMUO{zone})"),
            Response::ZoneVolume { zone, level } => write!(f, "(VO{zone}{level})"),
            Response::ZoneBalance { zone, balance } if *balance < 0 => {
                write!(f, "(BO{zone}L{})", -i16::from(*balance))
            }
            Response::ZoneBalance { zone, balance } if *balance > 0 => {
                write!(f, "(BO{zone}R{balance})")
            }
            Response::ZoneBalance { zone, .. } => write!(f, "(BO{zone}C)"),
            Response::ZoneTone { zone, bass, treble } => write!(f, "(TO{zone}B{bass}T{treble})"),
            Response::ZoneSource { zone, source } => write!(f, "(CO{zone}{source})"),
            Response::ZoneName { zone, name } => write!(f, "(NO{zone}\"{name}\")"),
            Response::ZoneHighpass { zone, frequency } => write!(f, "(EO{zone}HP{frequency})"),
            Response::ZoneLowpass { zone, frequency } => write!(f, "(EO{zone}LP{frequency})"),
            Response::SourceName { source, name } => write!(f, "(NI{source}\"{name}\")"),
            Response::GroupName { group, name } => write!(f, "(NG{group}\"{name}\")"),
            Response::GroupZoneAdded { group, zone } => write!(f, "(GA{group}O{zone})"),
            Response::GroupZoneRemoved { group, zone } => write!(f, "(GR{group}O{zone})"),
            Response::FavoriteName { favorite, name } => write!(f, "(NF{favorite}\"{name}\")"),
            Response::PresetName { preset, name } => write!(f, "(NEP{preset}\"{name}\")"),
            Response::PresetBand {
                preset,
                band,
                level,
            } => write!(f, "(EEP{preset}B{band}L{level})"),
            Response::InfraredDisabled { disabled } => {
                write!(f, "(IRD{})", u8::from(*disabled))
            }
            Response::NetworkDhcp { enabled } => write!(f, "(NDHCP{})", u8::from(*enabled)),
            Response::NetworkSddp { enabled } => write!(f, "(NSDDP{})", u8::from(*enabled)),
            Response::FrontPanelBrightness { brightness } => write!(f, "(FPB{brightness})"),
            Response::FrontPanelLocked { locked } => write!(f, "(FPL{})", u8::from(*locked)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(n: u32) -> Identifier {
        Kind::Zone.checked(n).unwrap()
    }

    fn roundtrip(frame: &Response) {
        let encoded = frame.encode();
        let m = response_matcher()
            .match_frame(encoded.as_bytes())
            .unwrap_or_else(|| panic!("no pattern for {encoded}"));
        assert_eq!(m.pattern, frame.pattern(), "pattern for {encoded}");
        let decoded = Response::decode(&m).unwrap();
        assert_eq!(&decoded, frame, "decode of {encoded}");
        assert_eq!(decoded.encode(), encoded, "re-encode of {encoded}");
    }

    #[test]
    fn every_shape_round_trips() {
        let g2 = Kind::Group.checked(2).unwrap();
        let s3 = Kind::Source.checked(3).unwrap();
        let f1 = Kind::Favorite.checked(1).unwrap();
        let p4 = Kind::EqualizerPreset.checked(4).unwrap();
        let b5 = Kind::EqualizerBand.checked(5).unwrap();
        let frames = vec![
            Response::AllZonesQueryDone,
            Response::ZoneQueryDone { zone: zone(24) },
            Response::SourcesQueryDone,
            Response::GroupQueryDone { group: g2 },
            Response::FavoriteQueryDone { favorite: f1 },
            Response::PresetQueryDone { preset: p4 },
            Response::NetworkQueryDone,
            Response::FrontPanelQueryDone,
            Response::ZoneMute {
                zone: zone(1),
                muted: true,
            },
            Response::ZoneMute {
                zone: zone(1),
                muted: false,
            },
            Response::ZoneVolume {
                zone: zone(3),
                level: -20,
            },
            Response::ZoneVolume {
                zone: zone(10),
                level: 0,
            },
            Response::ZoneBalance {
                zone: zone(3),
                balance: -25,
            },
            Response::ZoneBalance {
                zone: zone(3),
                balance: 80,
            },
            Response::ZoneBalance {
                zone: zone(3),
                balance: 0,
            },
            Response::ZoneTone {
                zone: zone(7),
                bass: -10,
                treble: 10,
            },
            Response::ZoneSource {
                zone: zone(12),
                source: s3,
            },
            Response::ZoneName {
                zone: zone(2),
                name: "Kitchen".to_owned(),
            },
            Response::ZoneHighpass {
                zone: zone(2),
                frequency: 100,
            },
            Response::ZoneLowpass {
                zone: zone(2),
                frequency: 20_000,
            },
            Response::SourceName {
                source: s3,
                name: "Tuner".to_owned(),
            },
            Response::GroupName {
                group: g2,
                name: "Upstairs".to_owned(),
            },
            Response::GroupZoneAdded {
                group: g2,
                zone: zone(5),
            },
            Response::GroupZoneRemoved {
                group: g2,
                zone: zone(5),
            },
            Response::FavoriteName {
                favorite: f1,
                name: "Morning".to_owned(),
            },
            Response::PresetName {
                preset: p4,
                name: "Rock".to_owned(),
            },
            Response::PresetBand {
                preset: p4,
                band: b5,
                level: -3,
            },
            Response::InfraredDisabled { disabled: true },
            Response::NetworkDhcp { enabled: true },
            Response::NetworkSddp { enabled: false },
            Response::FrontPanelBrightness { brightness: 2 },
            Response::FrontPanelLocked { locked: true },
        ];
        for frame in &frames {
            roundtrip(frame);
        }
    }

    #[test]
    fn adjacent_numeric_fields_split_unambiguously() {
        // Zone 12 source 3 and zone 1 volume 0 both pack digits back to back.
        let m = response_matcher().match_frame(b"(CO123)").unwrap();
        match Response::decode(&m).unwrap() {
            Response::ZoneSource { zone, source } => {
                assert_eq!(zone.get(), 12);
                assert_eq!(source.get(), 3);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
        let m = response_matcher().match_frame(b"(VO10)").unwrap();
        match Response::decode(&m).unwrap() {
            Response::ZoneVolume { zone, level } => {
                assert_eq!(zone.get(), 1);
                assert_eq!(level, 0);
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_identifiers_fail_decode_before_any_handler() {
        let m = response_matcher().match_frame(b"(VO25-20)").unwrap();
        assert!(matches!(
            Response::decode(&m),
            Err(Error::InvalidIdentifier { .. })
        ));
        let m = response_matcher().match_frame(b"(NG11\"x\")").unwrap();
        assert!(Response::decode(&m).is_err());
    }

    #[test]
    fn query_all_wins_over_query_one() {
        let m = response_matcher().match_frame(b"(QOA)").unwrap();
        assert_eq!(m.pattern, ResponsePattern::AllZonesQueryDone);
    }
}
