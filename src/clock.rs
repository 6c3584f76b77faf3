//! Time and id sources, injectable so uploads are reproducible in tests.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Yields `prefix-1`, `prefix-2`, ...
pub struct SequenceIds {
    prefix: String,
    next: AtomicUsize,
}

impl SequenceIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicUsize::new(1),
        }
    }
}

impl IdSource for SequenceIds {
    fn next_id(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
        assert_eq!(ids.next_id().len(), 32);
    }

    #[test]
    fn test_sequence_ids() {
        let ids = SequenceIds::new("t");
        assert_eq!(ids.next_id(), "t-1");
        assert_eq!(ids.next_id(), "t-2");
    }

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(FixedClock(at).now(), at);
    }
}
