//! Inbound frame buffer.
//!
//! Each connection accumulates received bytes here and repeatedly asks for
//! the next tokenizable frame. Leading CR/LF/space bytes (telnet line
//! endings, interactive padding) are skipped before matching. An inbound
//! run that matches nothing and outgrows the soft ceiling fails the
//! connection with a protocol error; anything shorter is treated as an
//! incomplete frame awaiting more reads.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::Error;
use crate::pattern::{FrameMatch, Matcher};

/// Soft ceiling on unmatched buffered input.
pub const FRAME_BUFFER_CEILING: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer::default()
    }

    /// The underlying buffer, for `read_buf`-style fills.
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.buf.first() {
            if b == b'\r' || b == b'\n' || b == b' ' {
                self.buf.advance(1);
            } else {
                break;
            }
        }
    }

    /// Tokenize the next frame, if a registered pattern matches at the head
    /// of the buffer. `Ok(None)` means the buffered input is merely
    /// incomplete; [`Error::FrameOverflow`] means it can no longer become a
    /// valid frame within the ceiling and the connection must be failed.
    pub fn extract<P: Copy + std::fmt::Debug>(
        &mut self,
        matcher: &Matcher<P>,
    ) -> Result<Option<FrameMatch<P>>, Error> {
        self.skip_separators();
        if let Some((pattern, len, groups)) = matcher.match_head(&self.buf) {
            let frame: Bytes = self.buf.split_to(len).freeze();
            return Ok(Some(FrameMatch::from_parts(pattern, frame, groups)));
        }
        if self.buf.len() > FRAME_BUFFER_CEILING {
            return Err(Error::FrameOverflow(FRAME_BUFFER_CEILING));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{response_matcher, ResponsePattern};

    #[test]
    fn frame_followed_by_garbage_matches_exactly_once() {
        let mut buf = FrameBuffer::new();
        buf.extend_from_slice(b"(VO3-20)garbage");
        let hit = buf.extract(response_matcher()).unwrap().unwrap();
        assert_eq!(hit.pattern, ResponsePattern::ZoneVolume);
        assert_eq!(&hit.frame[..], b"(VO3-20)");
        // The garbage neither matches nor is consumed.
        assert!(buf.extract(response_matcher()).unwrap().is_none());
        assert_eq!(buf.len(), b"garbage".len());
    }

    #[test]
    fn split_delivery_needs_more_then_matches() {
        let mut buf = FrameBuffer::new();
        buf.extend_from_slice(b"(VO3-");
        assert!(buf.extract(response_matcher()).unwrap().is_none());
        buf.extend_from_slice(b"20)");
        let hit = buf.extract(response_matcher()).unwrap().unwrap();
        assert_eq!(hit.pattern, ResponsePattern::ZoneVolume);
    }

    #[test]
    fn line_ending_padding_is_skipped() {
        let mut buf = FrameBuffer::new();
        buf.extend_from_slice(b"\r\n(VMO1)\r\n(VMUO1)");
        let first = buf.extract(response_matcher()).unwrap().unwrap();
        assert_eq!(first.pattern, ResponsePattern::ZoneMuted);
        let second = buf.extract(response_matcher()).unwrap().unwrap();
        assert_eq!(second.pattern, ResponsePattern::ZoneUnmuted);
    }

    #[test]
    fn unmatched_input_over_the_ceiling_is_a_protocol_error() {
        let mut buf = FrameBuffer::new();
        buf.extend_from_slice(&vec![b'x'; FRAME_BUFFER_CEILING + 1]);
        let err = buf.extract(response_matcher()).unwrap_err();
        assert_eq!(err, Error::FrameOverflow(FRAME_BUFFER_CEILING));
    }

    #[test]
    fn unmatched_input_under_the_ceiling_is_not_fatal() {
        let mut buf = FrameBuffer::new();
        buf.extend_from_slice(&vec![b'x'; FRAME_BUFFER_CEILING - 1]);
        assert!(buf.extract(response_matcher()).unwrap().is_none());
    }
}
