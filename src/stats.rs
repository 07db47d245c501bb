use std::time::{Duration, Instant};
use tracing::trace;

use crate::contacts::{ContactBook, ContactStats};

/// Refreshes contact statistics at a fixed interval.
#[derive(Debug)]
pub struct StatsPoller {
    interval: Duration,
    last_poll: Option<Instant>,
    latest: ContactStats,
}

impl StatsPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
            latest: ContactStats::default(),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_poll {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Poll when due; returns the fresh numbers if a poll happened.
    pub fn poll(&mut self, book: &ContactBook, now: Instant) -> Option<ContactStats> {
        if !self.is_due(now) {
            return None;
        }
        Some(self.refresh(book, now))
    }

    /// Poll right away, e.g. after the contact book changed.
    pub fn refresh(&mut self, book: &ContactBook, now: Instant) -> ContactStats {
        self.latest = book.stats();
        self.last_poll = Some(now);
        trace!("Polled stats: {:?}", self.latest);
        self.latest
    }

    pub fn latest(&self) -> ContactStats {
        self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::RawRecord;
    use chrono::NaiveDate;

    fn book_with(names: &[&str]) -> ContactBook {
        let mut book = ContactBook::new();
        let records: Vec<RawRecord> = names
            .iter()
            .map(|n| [("имя".to_string(), n.to_string())].into_iter().collect())
            .collect();
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        book.import(&records, created);
        book
    }

    #[test]
    fn first_poll_is_always_due() {
        let start = Instant::now();
        let mut poller = StatsPoller::new(Duration::from_secs(30));
        let stats = poller.poll(&book_with(&["a", "b"]), start).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(poller.latest().total, 2);
    }

    #[test]
    fn waits_for_interval() {
        let start = Instant::now();
        let mut poller = StatsPoller::new(Duration::from_secs(30));
        let book = book_with(&["a"]);
        poller.poll(&book, start);

        assert!(poller.poll(&book, start + Duration::from_secs(29)).is_none());
        assert!(poller.is_due(start + Duration::from_secs(30)));

        let bigger = book_with(&["a", "b", "c"]);
        assert_eq!(poller.poll(&bigger, start + Duration::from_secs(31)).unwrap().total, 3);
    }

    #[test]
    fn refresh_resets_the_clock() {
        let start = Instant::now();
        let mut poller = StatsPoller::new(Duration::from_secs(10));
        let book = book_with(&[]);
        poller.refresh(&book, start + Duration::from_secs(5));
        assert!(!poller.is_due(start + Duration::from_secs(14)));
    }
}
