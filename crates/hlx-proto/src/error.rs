//! Error surface shared across the control suite.
//!
//! The amplifier's native status codes are signed integers whose negative
//! values mirror POSIX errno; [`Error::errno`] preserves that surface for
//! callers that want the numeric form. Variants are cloneable so a single
//! connection failure can complete every queued exchange.

use std::io;

use thiserror::Error;

use crate::ident::Kind;

/// Negative errno values surfaced through [`Error::errno`] (Linux numbering).
pub mod errno {
    pub const EIO: i32 = -5;
    pub const EINVAL: i32 = -22;
    pub const EPROTO: i32 = -71;
    pub const EOVERFLOW: i32 = -75;
    pub const ECONNRESET: i32 = -104;
    pub const ENOTCONN: i32 = -107;
    pub const ETIMEDOUT: i32 = -110;
    pub const ECONNREFUSED: i32 = -111;
    pub const EHOSTUNREACH: i32 = -113;
    pub const EALREADY: i32 = -114;
    pub const EINPROGRESS: i32 = -115;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("operation timed out")]
    Timeout,
    #[error("connection already established")]
    Already,
    #[error("connection attempt already in progress")]
    InProgress,
    #[error("connection reset by peer")]
    ConnectionReset,
    #[error("connection refused")]
    ConnectionRefused,
    #[error("connection closed")]
    Closed,
    #[error("not connected")]
    NotInitialized,
    #[error("host name resolution failed for {0}")]
    HostNameResolution(String),
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    #[error("buffer not owned")]
    BufferNotOwned,
    #[error("invalid {kind} identifier {value}")]
    InvalidIdentifier { kind: Kind, value: u32 },
    #[error("invalid name")]
    InvalidName,
    #[error("name exceeds {} bytes", crate::NAME_LENGTH_MAX)]
    NameTooLong,
    #[error("value out of range for {0}")]
    ValueOutOfRange(&'static str),
    #[error("unmatched input exceeded the {0}-byte ceiling")]
    FrameOverflow(usize),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// The signed status code for this error, negative per POSIX convention.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Timeout => errno::ETIMEDOUT,
            Error::Already => errno::EALREADY,
            Error::InProgress => errno::EINPROGRESS,
            Error::ConnectionReset => errno::ECONNRESET,
            Error::ConnectionRefused => errno::ECONNREFUSED,
            Error::Closed | Error::NotInitialized => errno::ENOTCONN,
            Error::HostNameResolution(_) => errno::EHOSTUNREACH,
            Error::InitializationFailed(_) | Error::BufferNotOwned => errno::EINVAL,
            Error::InvalidIdentifier { .. }
            | Error::InvalidName
            | Error::NameTooLong
            | Error::ValueOutOfRange(_)
            | Error::InvalidUrl(_) => errno::EINVAL,
            Error::FrameOverflow(_) => errno::EOVERFLOW,
            Error::Protocol(_) => errno::EPROTO,
            Error::Io(_) => errno::EIO,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Error::Timeout,
            io::ErrorKind::ConnectionReset => Error::ConnectionReset,
            io::ErrorKind::ConnectionRefused => Error::ConnectionRefused,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe => Error::Closed,
            _ => Error::Io(err.to_string()),
        }
    }
}
