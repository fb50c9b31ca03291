//! Object identifiers.
//!
//! Every addressable object on the amplifier is named by a 1-based small
//! integer within its kind (zone 1..=24, source 1..=8, and so on). The
//! reserved value zero marks "unset". The per-kind maxima are hardware
//! constants, collected here in one table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 1-based object identifier. [`Identifier::INVALID`] (zero) marks unset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Identifier(u8);

impl Identifier {
    pub const INVALID: Identifier = Identifier(0);

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of addressable object, with their wire object codes and
/// hardware maxima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Zone,
    Source,
    Group,
    Favorite,
    EqualizerPreset,
    EqualizerBand,
}

impl Kind {
    /// Highest valid identifier for this kind.
    pub const fn max(self) -> u8 {
        match self {
            Kind::Zone => 24,
            Kind::Source => 8,
            Kind::Group => 10,
            Kind::Favorite => 10,
            Kind::EqualizerPreset => 10,
            Kind::EqualizerBand => 10,
        }
    }

    /// The object code used in frame bodies.
    pub const fn object_code(self) -> &'static str {
        match self {
            Kind::Zone => "O",
            Kind::Source => "I",
            Kind::Group => "G",
            Kind::Favorite => "F",
            Kind::EqualizerPreset => "EP",
            Kind::EqualizerBand => "B",
        }
    }

    /// Build an identifier of this kind, rejecting values outside
    /// `[1, max]`.
    pub fn checked(self, value: u32) -> Result<Identifier, Error> {
        if value >= 1 && value <= u32::from(self.max()) {
            Ok(Identifier(value as u8))
        } else {
            Err(Error::InvalidIdentifier { kind: self, value })
        }
    }

    /// Parse a decimal identifier of this kind from frame bytes.
    pub fn parse(self, bytes: &[u8]) -> Result<Identifier, Error> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::Protocol("non-ASCII identifier".to_owned()))?;
        let value: u32 = text
            .parse()
            .map_err(|_| Error::Protocol(format!("unparseable identifier {text:?}")))?;
        self.checked(value)
    }

    /// All identifiers of this kind, in ascending order.
    pub fn all(self) -> impl Iterator<Item = Identifier> {
        (1..=self.max()).map(Identifier)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Kind::Zone => "zone",
            Kind::Source => "source",
            Kind::Group => "group",
            Kind::Favorite => "favorite",
            Kind::EqualizerPreset => "equalizer preset",
            Kind::EqualizerBand => "equalizer band",
        };
        f.write_str(label)
    }
}
