//! Audit history types: stream ids, records, and trimming policy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::FieldChange;
use crate::error::RepositoryError;

/// Monotonic identifier of a history entry, written `"<millis>-<sequence>"`.
///
/// `millis` is the append time in milliseconds since the Unix epoch;
/// `sequence` disambiguates entries appended within the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    /// Milliseconds since the Unix epoch.
    pub millis: u64,
    /// Sequence within `millis`.
    pub sequence: u64,
}

impl StreamId {
    /// Creates a stream id.
    #[must_use]
    pub fn new(millis: u64, sequence: u64) -> Self {
        Self { millis, sequence }
    }

    /// The id to assign to an entry appended at `now_millis` after `last`.
    ///
    /// Never goes backwards: if the clock is behind `last`, the entry is
    /// stamped in `last`'s millisecond with the next sequence.
    #[must_use]
    pub fn next_after(last: Option<Self>, now_millis: u64) -> Self {
        match last {
            Some(last) if now_millis <= last.millis => Self::new(last.millis, last.sequence + 1),
            _ => Self::new(now_millis, 0),
        }
    }

    /// The instant encoded in the leading component.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::CorruptHistory` if the value is outside the
    /// representable date range.
    pub fn timestamp(&self) -> Result<DateTime<Utc>, RepositoryError> {
        i64::try_from(self.millis)
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| RepositoryError::CorruptHistory(format!("timestamp out of range: {self}")))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.sequence)
    }
}

impl FromStr for StreamId {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let corrupt = || RepositoryError::CorruptHistory(format!("invalid stream id: {s:?}"));
        let (millis, sequence) = s.split_once('-').ok_or_else(corrupt)?;
        Ok(Self {
            millis: millis.parse().map_err(|_| corrupt())?,
            sequence: sequence.parse().map_err(|_| corrupt())?,
        })
    }
}

/// Raw entry as read back from a history store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// The entry's stream id.
    pub id: StreamId,
    /// Field/value pairs in append order.
    pub fields: Vec<FieldChange>,
}

/// Length bound applied when appending to a history stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trim {
    /// Number of most recent entries to keep.
    pub max_len: usize,
    /// Allow the stream to overshoot `max_len` by `slack()` entries before
    /// trimming, so trimming happens in batches.
    pub approximate: bool,
}

impl Trim {
    /// Exact trimming to `max_len`.
    #[must_use]
    pub fn exact(max_len: usize) -> Self {
        Self {
            max_len,
            approximate: false,
        }
    }

    /// Approximate trimming to `max_len`.
    #[must_use]
    pub fn approximate(max_len: usize) -> Self {
        Self {
            max_len,
            approximate: true,
        }
    }

    /// How many entries beyond `max_len` an approximate trim tolerates.
    #[must_use]
    pub fn slack(&self) -> usize {
        if self.approximate {
            (self.max_len / 2).max(1)
        } else {
            0
        }
    }

    /// Number of oldest entries to drop from a stream holding `len` entries.
    #[must_use]
    pub fn excess(&self, len: usize) -> usize {
        if len > self.max_len + self.slack() {
            len - self.max_len
        } else {
            0
        }
    }
}

/// One audit entry for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Stream id of the entry.
    pub stream_id: String,
    /// Append time derived from the stream id.
    pub date: DateTime<Utc>,
    /// Changed fields with their previous values, followed by the `user`
    /// entry naming the actor.
    pub changes: Vec<FieldChange>,
}

impl TryFrom<StreamEntry> for HistoryRecord {
    type Error = RepositoryError;

    fn try_from(entry: StreamEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            stream_id: entry.id.to_string(),
            date: entry.id.timestamp()?,
            changes: entry.fields,
        })
    }
}

/// Full history of one entity, oldest record first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    /// The entity id.
    pub id: String,
    /// The entity type name.
    pub entity_name: String,
    /// Records in stream order.
    pub records: Vec<HistoryRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_parses_and_displays() {
        let id: StreamId = "1768471200000-3".parse().unwrap();
        assert_eq!(id, StreamId::new(1_768_471_200_000, 3));
        assert_eq!(id.to_string(), "1768471200000-3");
    }

    #[test]
    fn test_stream_id_rejects_garbage() {
        assert!("abc".parse::<StreamId>().is_err());
        assert!("12-x".parse::<StreamId>().is_err());
        assert!("-1".parse::<StreamId>().is_err());
    }

    #[test]
    fn test_next_after_never_goes_backwards() {
        let last = StreamId::new(1_000, 4);
        assert_eq!(StreamId::next_after(Some(last), 999), StreamId::new(1_000, 5));
        assert_eq!(StreamId::next_after(Some(last), 1_000), StreamId::new(1_000, 5));
        assert_eq!(StreamId::next_after(Some(last), 1_001), StreamId::new(1_001, 0));
        assert_eq!(StreamId::next_after(None, 7), StreamId::new(7, 0));
    }

    #[test]
    fn test_timestamp_reads_leading_component_as_millis() {
        let date = StreamId::new(1_768_471_200_000, 0).timestamp().unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_exact_trim_drops_everything_over_bound() {
        let trim = Trim::exact(10);
        assert_eq!(trim.excess(10), 0);
        assert_eq!(trim.excess(11), 1);
    }

    #[test]
    fn test_approximate_trim_batches_within_slack() {
        let trim = Trim::approximate(10);
        assert_eq!(trim.slack(), 5);
        assert_eq!(trim.excess(15), 0);
        assert_eq!(trim.excess(16), 6);
        assert_eq!(Trim::approximate(1).slack(), 1);
    }
}
