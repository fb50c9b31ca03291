//! Compiled pattern registries.
//!
//! A registry holds the compiled regular expression for every frame shape
//! one side of the link can receive, in registration order. Tokenization
//! tries each pattern anchored at the head of the inbound buffer and the
//! first match wins, so more specific shapes must register ahead of less
//! specific ones (query-all before query-one, `VO3U` before `VO3<level>`).
//! Registries compile once at startup and live for the program lifetime;
//! a pattern that fails to compile is fatal.

use bytes::Bytes;
use regex::bytes::Regex;

use crate::error::Error;

/// How a matched frame is routed: completing a pending exchange, or through
/// the unsolicited-notification path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ExchangeResponse,
    Notification,
}

struct Entry<P> {
    pattern: P,
    regex: Regex,
    captures: usize,
}

/// An ordered set of compiled patterns identified by `P`.
pub struct Matcher<P> {
    entries: Vec<Entry<P>>,
}

/// One tokenized frame: the pattern that claimed it, the consumed bytes,
/// and the capture-group ranges within them.
#[derive(Debug, Clone)]
pub struct FrameMatch<P> {
    pub pattern: P,
    pub frame: Bytes,
    groups: Vec<(usize, usize)>,
}

impl<P: Copy> FrameMatch<P> {
    pub(crate) fn from_parts(pattern: P, frame: Bytes, groups: Vec<(usize, usize)>) -> Self {
        FrameMatch {
            pattern,
            frame,
            groups,
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Capture group `index` (1-based, like the underlying regex).
    pub fn group(&self, index: usize) -> &[u8] {
        let (start, end) = self.groups[index - 1];
        &self.frame[start..end]
    }
}

impl<P: Copy + std::fmt::Debug> Matcher<P> {
    /// Compile a registry from `(pattern, regex, capture_count)` rows.
    pub fn new(table: &[(P, &str, usize)]) -> Result<Self, Error> {
        let mut entries = Vec::with_capacity(table.len());
        for (pattern, source, captures) in table {
            let regex = Regex::new(source).map_err(|e| {
                Error::InitializationFailed(format!("pattern {pattern:?}: {e}"))
            })?;
            if regex.captures_len() - 1 != *captures {
                return Err(Error::InitializationFailed(format!(
                    "pattern {pattern:?} declares {captures} captures, regex has {}",
                    regex.captures_len() - 1
                )));
            }
            entries.push(Entry {
                pattern: *pattern,
                regex,
                captures: *captures,
            });
        }
        Ok(Matcher { entries })
    }

    /// Try every pattern, in registration order, anchored at the head of
    /// `buf`. Returns the winning pattern, the matched length, and the
    /// capture ranges.
    pub(crate) fn match_head(&self, buf: &[u8]) -> Option<(P, usize, Vec<(usize, usize)>)> {
        for entry in &self.entries {
            let Some(caps) = entry.regex.captures(buf) else {
                continue;
            };
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() != 0 {
                continue;
            }
            let mut groups = Vec::with_capacity(entry.captures);
            for i in 1..=entry.captures {
                let Some(m) = caps.get(i) else { return None };
                groups.push((m.start(), m.end()));
            }
            return Some((entry.pattern, whole.end(), groups));
        }
        None
    }

    /// Match a single complete frame held outside the inbound buffer.
    pub fn match_frame(&self, frame: &[u8]) -> Option<FrameMatch<P>> {
        let (pattern, len, groups) = self.match_head(frame)?;
        if len != frame.len() {
            return None;
        }
        Some(FrameMatch {
            pattern,
            frame: Bytes::copy_from_slice(frame),
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum P {
        All,
        One,
    }

    fn matcher() -> Matcher<P> {
        Matcher::new(&[(P::All, r"^\(QOA\)", 0), (P::One, r"^\(QO([0-9]{1,2})\)", 1)]).unwrap()
    }

    #[test]
    fn registration_order_breaks_ambiguity() {
        let m = matcher();
        let hit = m.match_frame(b"(QOA)").unwrap();
        assert_eq!(hit.pattern, P::All);
        let hit = m.match_frame(b"(QO7)").unwrap();
        assert_eq!(hit.pattern, P::One);
        assert_eq!(hit.group(1), b"7");
    }

    #[test]
    fn matches_anchor_at_offset_zero_only() {
        let m = matcher();
        assert!(m.match_head(b"xx(QO7)").is_none());
    }

    #[test]
    fn declared_capture_count_is_checked_at_compile() {
        let err = Matcher::new(&[(P::One, r"^\(QO([0-9]+)\)", 2)]).unwrap_err();
        assert!(matches!(err, Error::InitializationFailed(_)));
    }
}
