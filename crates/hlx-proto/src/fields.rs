//! Capture-group parsing helpers shared by the typed frame decoders.

use crate::error::Error;
use crate::ident::{Identifier, Kind};
use crate::pattern::FrameMatch;

pub(crate) fn id<P: Copy>(kind: Kind, m: &FrameMatch<P>, index: usize) -> Result<Identifier, Error> {
    kind.parse(m.group(index))
}

pub(crate) fn int<P: Copy>(m: &FrameMatch<P>, index: usize) -> Result<i32, Error> {
    let text = std::str::from_utf8(m.group(index))
        .map_err(|_| Error::Protocol("non-ASCII numeric field".to_owned()))?;
    text.parse()
        .map_err(|_| Error::Protocol(format!("unparseable numeric field {text:?}")))
}

pub(crate) fn level<P: Copy>(m: &FrameMatch<P>, index: usize) -> Result<i8, Error> {
    let value = int(m, index)?;
    i8::try_from(value).map_err(|_| Error::Protocol(format!("level {value} out of range")))
}

pub(crate) fn frequency<P: Copy>(m: &FrameMatch<P>, index: usize) -> Result<u16, Error> {
    let value = int(m, index)?;
    match u16::try_from(value) {
        Ok(f) if (1..=20_000).contains(&f) => Ok(f),
        _ => Err(Error::Protocol(format!("frequency {value} out of range"))),
    }
}

pub(crate) fn name<P: Copy>(m: &FrameMatch<P>, index: usize) -> Result<String, Error> {
    let bytes = m.group(index);
    if bytes.len() > crate::NAME_LENGTH_MAX {
        return Err(Error::NameTooLong);
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Protocol("non-UTF-8 name".to_owned()))
}

pub(crate) fn flag<P: Copy>(m: &FrameMatch<P>, index: usize) -> Result<bool, Error> {
    match m.group(index) {
        b"0" => Ok(false),
        b"1" => Ok(true),
        other => Err(Error::Protocol(format!(
            "unparseable flag {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}
