//! Wire protocol for the HLX multi-zone amplifier.
//!
//! The amplifier speaks a line-oriented ASCII control protocol over a
//! persistent TCP stream (nominally telnet, port 23). Requests are bare
//! frames such as `VO3-20` (set zone 3 volume to -20 dB); responses and
//! unsolicited notifications are the same bodies wrapped in parentheses,
//! `(VO3-20)`. Frames carry no length prefix and no terminator: the
//! receiver tokenizes its inbound buffer by longest-prefix regex matching
//! against a registry of known frame shapes.
//!
//! This crate holds everything both ends of the link share:
//!
//! - [`ident`] — 1-based object identifiers and the per-kind maxima table
//! - [`addr`] — the accepted URL/host surface and address-family filtering
//! - [`pattern`] — the compiled pattern registries and prefix matcher
//! - [`codec`] — the growable inbound frame buffer with its overflow ceiling
//! - [`request`] / [`response`] — typed frames with encode/decode

pub mod addr;
pub mod codec;
pub mod error;
mod fields;
pub mod ident;
pub mod pattern;
pub mod request;
pub mod response;

pub use addr::{ControlUrl, VersionSet, DEFAULT_PORT};
pub use codec::{FrameBuffer, FRAME_BUFFER_CEILING};
pub use error::Error;
pub use ident::{Identifier, Kind};
pub use pattern::{FrameMatch, Matcher, Role};
pub use request::{request_matcher, Request, RequestPattern};
pub use response::{response_matcher, Response, ResponsePattern};

/// Longest name the amplifier accepts, in bytes of UTF-8 payload.
pub const NAME_LENGTH_MAX: usize = 16;

/// Validate a name for transmission: non-empty, within [`NAME_LENGTH_MAX`]
/// bytes, and free of the quote delimiter.
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.contains('"') {
        return Err(Error::InvalidName);
    }
    if name.len() > NAME_LENGTH_MAX {
        return Err(Error::NameTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_name_enforces_byte_bound() {
        assert!(validate_name("Living Room").is_ok());
        assert!(validate_name("exactly 16 bytes").is_ok());
        assert!(validate_name("seventeen bytes!!").is_err());
        // Multi-byte UTF-8 counts in bytes, not characters.
        assert!(validate_name("ééééééééé").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("no \" quotes").is_err());
    }
}
