//! Query debouncer for keystroke-driven search
//!
//! Every query change bumps an epoch and restarts the quiet period. When the
//! period elapses only the latest query is released, tagged with the epoch it
//! was scheduled under; anything tagged with an older epoch is stale.

use std::time::{Duration, Instant};

/// A query that survived the quiet period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub epoch: u64,
    pub query: String,
}

#[derive(Debug)]
struct Pending {
    query: String,
    last_change: Instant,
}

pub struct QueryDebouncer {
    delay: Duration,
    epoch: u64,
    pending: Option<Pending>,
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            epoch: 0,
            pending: None,
        }
    }

    /// Record a query change, superseding whatever was pending
    pub fn schedule(&mut self, query: &str, now: Instant) -> u64 {
        self.epoch += 1;
        self.pending = Some(Pending {
            query: query.to_string(),
            last_change: now,
        });
        self.epoch
    }

    /// Drop the pending query and invalidate every outstanding epoch
    pub fn cancel(&mut self) -> u64 {
        self.epoch += 1;
        self.pending = None;
        self.epoch
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    /// Check if the quiet period has elapsed since the last change
    pub fn is_ready(&self, now: Instant) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.last_change) >= self.delay)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Get the time until the pending query is released (None if nothing pending)
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref().map(|p| {
            let elapsed = now.saturating_duration_since(p.last_change);
            self.delay.saturating_sub(elapsed)
        })
    }

    /// Release the pending query if its quiet period is over
    pub fn take_ready(&mut self, now: Instant) -> Option<Ticket> {
        if !self.is_ready(now) {
            return None;
        }

        self.pending.take().map(|p| Ticket {
            epoch: self.epoch,
            query: p.query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn test_debouncer_single_query() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(DELAY);
        let epoch = debouncer.schedule("abc", start);

        assert!(debouncer.has_pending());
        assert!(debouncer.take_ready(start + Duration::from_millis(299)).is_none());

        let ticket = debouncer.take_ready(start + DELAY).unwrap();
        assert_eq!(ticket, Ticket { epoch, query: "abc".into() });
        assert!(!debouncer.has_pending());
        assert!(debouncer.is_current(ticket.epoch));
    }

    #[test]
    fn test_debouncer_rapid_changes_release_only_last() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(DELAY);

        let mut now = start;
        for query in ["u", "us", "use", "user"] {
            debouncer.schedule(query, now);
            now += Duration::from_millis(100);
            // Each keystroke lands inside the previous quiet period
            assert!(debouncer.take_ready(now).is_none());
        }

        let ticket = debouncer.take_ready(now + DELAY).unwrap();
        assert_eq!(ticket.query, "user");
        assert_eq!(ticket.epoch, 4);
        assert!(debouncer.take_ready(now + DELAY * 2).is_none());
    }

    #[test]
    fn test_debouncer_stale_epoch() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(DELAY);
        let first = debouncer.schedule("a", start);
        let ticket = debouncer.take_ready(start + DELAY).unwrap();
        assert_eq!(ticket.epoch, first);

        // A newer change arrives while the first query is being filtered
        debouncer.schedule("ab", start + DELAY);
        assert!(!debouncer.is_current(first));
    }

    #[test]
    fn test_debouncer_time_until_ready() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(DELAY);
        assert!(debouncer.time_until_ready(start).is_none());

        debouncer.schedule("x", start);
        assert_eq!(debouncer.time_until_ready(start + Duration::from_millis(100)), Some(Duration::from_millis(200)));
        assert_eq!(debouncer.time_until_ready(start + DELAY * 2), Some(Duration::ZERO));
    }

    #[test]
    fn test_debouncer_cancel() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(DELAY);
        let epoch = debouncer.schedule("x", start);

        let after = debouncer.cancel();
        assert!(after > epoch);
        assert!(!debouncer.has_pending());
        assert!(debouncer.take_ready(start + DELAY).is_none());
    }

    #[test]
    fn test_debouncer_zero_delay() {
        let start = Instant::now();
        let mut debouncer = QueryDebouncer::new(Duration::ZERO);
        debouncer.schedule("now", start);
        assert!(debouncer.is_ready(start));
    }
}
