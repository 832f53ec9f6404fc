//! Segment formatter.
//!
//! Renders identity changes into casts that fit the platform limit. Packing
//! is greedy and single pass so the order of changes survives across segment
//! boundaries.

use crate::types::{IdentityChange, Segment};
use crate::SEGMENT_LIMIT;

/// Error type for formatting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// There is nothing to announce.
    #[error("No identity changes to format")]
    Empty,
    /// A single rendered line cannot fit in any segment.
    #[error("Line of {len} bytes does not fit the {limit} byte segment limit: {line:?}")]
    Overflow {
        /// The offending line.
        line: String,
        /// Its length in bytes.
        len: usize,
        /// The segment limit in force.
        limit: usize,
    },
}

/// Packs identity changes into segments strictly shorter than `limit` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFormatter {
    limit: usize,
}

impl SegmentFormatter {
    /// Create a formatter with a custom limit.
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// The limit segments must stay under.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Format changes into segments.
    ///
    /// The first segment opens with the summary line. Each change line goes
    /// into the last segment if the result stays under the limit, otherwise
    /// it opens a new segment.
    pub fn format(&self, changes: &[IdentityChange]) -> Result<Vec<Segment>, FormatError> {
        if changes.is_empty() {
            return Err(FormatError::Empty);
        }

        let header = summary_line(changes.len());
        if header.len() >= self.limit {
            return Err(self.overflow(header));
        }

        let mut segments = vec![Segment::new(header)];

        for change in changes {
            let line = change_line(change);
            if line.len() >= self.limit {
                return Err(self.overflow(line));
            }

            match segments.last_mut() {
                Some(current) if current.len() + line.len() < self.limit => {
                    current.push_str(&line);
                }
                _ => segments.push(Segment::new(line)),
            }
        }

        Ok(segments)
    }

    fn overflow(&self, line: String) -> FormatError {
        FormatError::Overflow {
            len: line.len(),
            limit: self.limit,
            line,
        }
    }
}

impl Default for SegmentFormatter {
    fn default() -> Self {
        Self::new(SEGMENT_LIMIT)
    }
}

/// Format with the default 320 byte limit.
pub fn format(changes: &[IdentityChange]) -> Result<Vec<Segment>, FormatError> {
    SegmentFormatter::default().format(changes)
}

/// Opening line of the first segment.
pub fn summary_line(count: usize) -> String {
    let verb = if count > 1 { "s have" } else { " has" };
    format!("{} new user{} joined the .eth family!\n", count, verb)
}

/// One line per rename.
pub fn change_line(change: &IdentityChange) -> String {
    format!("@{} changed to {}\n", change.previous_name, change.new_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn changes(n: usize) -> Vec<IdentityChange> {
        (0..n)
            .map(|i| IdentityChange::new(format!("user{:02}", i), format!("user{:02}.eth", i)))
            .collect()
    }

    #[test]
    fn test_single_change_single_segment() {
        let segments = format(&[IdentityChange::new("alice", "alice.eth")]).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].as_str(),
            "1 new user has joined the .eth family!\n@alice changed to alice.eth\n"
        );
    }

    #[test]
    fn test_summary_pluralizes() {
        assert_eq!(summary_line(1), "1 new user has joined the .eth family!\n");
        assert_eq!(summary_line(2), "2 new users have joined the .eth family!\n");
        assert_eq!(summary_line(30), "30 new users have joined the .eth family!\n");
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(format(&[]), Err(FormatError::Empty));
    }

    #[test]
    fn test_thirty_changes_split() {
        let input = changes(30);
        let segments = format(&input).unwrap();

        assert!(segments.len() >= 2);
        for segment in &segments {
            assert!(segment.len() < SEGMENT_LIMIT, "segment too long: {}", segment.len());
        }
        assert!(segments[0].as_str().starts_with("30 new users have joined"));
        assert!(segments[1].as_str().starts_with("@user"));
    }

    #[test]
    fn test_line_that_exactly_fills_goes_to_next_segment() {
        // header is 39 bytes; a 281 byte line would make the segment exactly 320
        let header = summary_line(1);
        let name_len = SEGMENT_LIMIT - header.len() - "@ changed to x\n".len();
        let long = "a".repeat(name_len);
        let change = IdentityChange::new(long, "x");
        assert_eq!(header.len() + change_line(&change).len(), SEGMENT_LIMIT);

        let segments = format(&[change.clone()]).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].as_str(), header);
        assert_eq!(segments[1].as_str(), change_line(&change));
    }

    #[test]
    fn test_oversized_line_is_overflow() {
        let change = IdentityChange::new("a".repeat(400), "b");

        match format(&[change]) {
            Err(FormatError::Overflow { len, limit, .. }) => {
                assert_eq!(limit, SEGMENT_LIMIT);
                assert!(len >= SEGMENT_LIMIT);
            }
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_limit() {
        let formatter = SegmentFormatter::new(80);
        let segments = formatter.format(&changes(5)).unwrap();

        assert_eq!(formatter.limit(), 80);
        assert!(segments.iter().all(|s| s.len() < 80));
        assert!(segments.len() > 2);
    }

    #[test]
    fn test_multibyte_names_are_measured_in_bytes() {
        let input: Vec<IdentityChange> = (0..20)
            .map(|i| IdentityChange::new(format!("ñandú{:02}", i), format!("🦄.eth{:02}", i)))
            .collect();

        let segments = format(&input).unwrap();
        let bytes: Vec<usize> = segments.iter().map(Segment::len).collect();
        let chars: Vec<usize> = segments.iter().map(|s| s.as_str().chars().count()).collect();

        assert_eq!(bytes, vec![306, 297, 99]);
        assert_eq!(chars, vec![266, 252, 84]);
        assert!(bytes.iter().all(|len| *len < SEGMENT_LIMIT));
    }

    #[test]
    fn test_multibyte_line_that_fits_by_chars_still_overflows() {
        // 100 chars, 400 bytes
        let change = IdentityChange::new("🦄".repeat(100), "x");
        assert!(change_line(&change).chars().count() < SEGMENT_LIMIT);

        assert!(matches!(
            format(&[change]),
            Err(FormatError::Overflow { len, .. }) if len >= SEGMENT_LIMIT
        ));
    }

    fn change_strategy() -> impl Strategy<Value = Vec<IdentityChange>> {
        prop::collection::vec(
            ("[a-z0-9ñéü中🦄]{1,30}", "[a-z0-9ñéü中🦄]{1,30}")
                .prop_map(|(a, b)| IdentityChange::new(a, format!("{}.eth", b))),
            1..150,
        )
    }

    proptest! {
        #[test]
        fn prop_segments_stay_under_limit(input in change_strategy()) {
            let segments = format(&input).unwrap();
            for segment in &segments {
                prop_assert!(segment.len() < SEGMENT_LIMIT);
            }
        }

        #[test]
        fn prop_order_survives_segment_boundaries(input in change_strategy()) {
            let segments = format(&input).unwrap();
            let joined: String = segments.iter().map(Segment::as_str).collect();
            let lines: Vec<&str> = joined.lines().skip(1).collect();
            let expected: Vec<String> = input
                .iter()
                .map(|c| change_line(c).trim_end().to_string())
                .collect();

            prop_assert_eq!(lines, expected);
        }
    }
}
