//! Publishable segments and the links that chain them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One publishable unit of text, bounded by the platform limit.
///
/// Only [`SegmentFormatter`](crate::formatter::SegmentFormatter) builds
/// segments, so every value respects the limit it was formatted with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub(crate) fn push_str(&mut self, line: &str) {
        self.0.push_str(line);
    }

    /// Segment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes (the unit the casting protocol limits).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Segment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier returned by the publisher for a posted segment (a cast hash).
///
/// Every reply in a thread carries its predecessor's link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadLink(String);

impl ThreadLink {
    /// Wrap a publisher-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_serializes_as_text() {
        let segment = Segment::new("@ñandú changed to ñandú.eth\n".to_string());

        assert_eq!(serde_json::to_string(&segment).unwrap(), r#""@ñandú changed to ñandú.eth\n""#);
        assert_eq!(segment.len(), segment.as_str().len());
        assert!(segment.len() > segment.as_str().chars().count());
    }

    #[test]
    fn test_link_round_trips() {
        let link = ThreadLink::new("0x9f3a");
        let json = serde_json::to_string(&link).unwrap();

        assert_eq!(serde_json::from_str::<ThreadLink>(&json).unwrap(), link);
    }
}
