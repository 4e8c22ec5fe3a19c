use crate::index::RecordIndex;
use crate::query::debouncer::{QueryDebouncer, Ticket};
use crate::query::filter::{filter_with_threshold, FilteredView};
use log::{debug, warn};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Quiet period after the last query change
    pub debounce: Duration,
    /// Record count at which filtering goes parallel
    pub parallel_threshold: usize,
    /// Filter results remembered for the current index
    pub cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            parallel_threshold: 4096,
            cache_size: 64,
        }
    }
}

/// Result from a background filter
struct FilterResult {
    epoch: u64,
    query: String,
    index: RecordIndex,
    positions: Arc<[usize]>,
    elapsed: Duration,
    cached: bool,
}

/// A filter result accepted for display
#[derive(Debug, Clone)]
pub struct Published {
    pub query: String,
    pub view: FilteredView,
    pub elapsed: Duration,
    pub cached: bool,
}

/// Debounced, cancellable filtering over the current index.
///
/// Owned by the presentation context. Filtering runs on spawned threads and
/// comes back over a channel; [`SearchEngine::poll`] only hands out results
/// whose epoch is still current, so a superseded query never reaches the view.
pub struct SearchEngine {
    config: SearchConfig,
    debouncer: QueryDebouncer,
    /// LRU cache of positions by query, valid for the current index only
    cache: LruCache<String, Arc<[usize]>>,
    results_tx: Sender<FilterResult>,
    results_rx: Receiver<FilterResult>,
    in_flight: usize,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            config,
            debouncer: QueryDebouncer::new(config.debounce),
            cache: LruCache::new(cache_size),
            results_tx,
            results_rx,
            in_flight: 0,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Schedule `query` to run once input has been quiet for the debounce delay
    pub fn schedule(&mut self, query: &str, now: Instant) {
        self.debouncer.schedule(query, now);
    }

    /// Run `query` immediately, superseding anything pending or in flight
    pub fn submit_now(&mut self, index: &RecordIndex, query: &str) {
        let epoch = self.debouncer.cancel();
        self.run(
            index,
            Ticket {
                epoch,
                query: query.to_string(),
            },
        );
    }

    /// Forget pending work and cached results; call when the index is replaced
    pub fn reset(&mut self) {
        self.debouncer.cancel();
        self.cache.clear();
    }

    /// Start the pending query if its quiet period is over
    pub fn tick(&mut self, index: &RecordIndex, now: Instant) {
        if let Some(ticket) = self.debouncer.take_ready(now) {
            self.run(index, ticket);
        }
    }

    /// Collect finished filters. Returns the result for the current epoch, if
    /// it has arrived; stale results are dropped.
    pub fn poll(&mut self) -> Option<Published> {
        let mut latest = None;

        loop {
            match self.results_rx.try_recv() {
                Ok(result) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    if !self.debouncer.is_current(result.epoch) {
                        debug!("discarding stale filter result for {:?}", result.query);
                        continue;
                    }
                    if !result.cached {
                        self.cache.put(result.query.clone(), Arc::clone(&result.positions));
                    }
                    latest = Some(Published {
                        view: FilteredView::from_positions(&result.index, result.positions),
                        query: result.query,
                        elapsed: result.elapsed,
                        cached: result.cached,
                    });
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        latest
    }

    /// No query waiting for its quiet period and no filter running
    pub fn is_idle(&self) -> bool {
        !self.debouncer.has_pending() && self.in_flight == 0
    }

    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.debouncer.time_until_ready(now)
    }

    fn run(&mut self, index: &RecordIndex, ticket: Ticket) {
        let Ticket { epoch, query } = ticket;
        self.in_flight += 1;

        if let Some(positions) = self.cache.get(&query) {
            let _ = self.results_tx.send(FilterResult {
                epoch,
                query,
                index: index.clone(),
                positions: Arc::clone(positions),
                elapsed: Duration::ZERO,
                cached: true,
            });
            return;
        }

        let tx = self.results_tx.clone();
        let index = index.clone();
        let threshold = self.config.parallel_threshold;
        let job = move || {
            let start = Instant::now();
            let view = filter_with_threshold(&index, &query, threshold);
            let _ = tx.send(FilterResult {
                epoch,
                positions: view.shared_positions(),
                elapsed: start.elapsed(),
                query,
                index,
                cached: false,
            });
        };

        let spawned = thread::Builder::new()
            .name("ldbview-filter".to_string())
            .spawn(job);
        if let Err(e) = spawned {
            warn!("could not spawn filter thread: {}", e);
            self.in_flight -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Record;

    fn index() -> RecordIndex {
        RecordIndex::from_records(vec![
            Record::new("alpha", "1"),
            Record::new("beta", "2"),
            Record::new("gamma", "3"),
        ])
    }

    fn config(debounce_ms: u64) -> SearchConfig {
        SearchConfig {
            debounce: Duration::from_millis(debounce_ms),
            ..Default::default()
        }
    }

    /// Pump the engine until it is idle, returning the last published result
    fn drain(engine: &mut SearchEngine, index: &RecordIndex) -> Option<Published> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut last = None;
        while Instant::now() < deadline {
            engine.tick(index, Instant::now());
            if let Some(published) = engine.poll() {
                last = Some(published);
            }
            if engine.is_idle() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        last
    }

    #[test]
    fn test_submit_now_publishes() {
        let index = index();
        let mut engine = SearchEngine::new(config(300));
        engine.submit_now(&index, "ta");

        let published = drain(&mut engine, &index).unwrap();
        assert_eq!(published.query, "ta");
        assert_eq!(published.view.len(), 1);
        assert!(!published.cached);
    }

    #[test]
    fn test_only_last_query_is_published() {
        let index = index();
        let mut engine = SearchEngine::new(config(20));
        let now = Instant::now();
        engine.schedule("a", now);
        engine.schedule("al", now);
        engine.schedule("gam", now);

        let published = drain(&mut engine, &index).unwrap();
        assert_eq!(published.query, "gam");
        assert_eq!(published.view.len(), 1);
    }

    #[test]
    fn test_superseded_result_is_discarded() {
        let index = index();
        let mut engine = SearchEngine::new(config(300));
        engine.submit_now(&index, "alpha");
        engine.submit_now(&index, "beta");

        let published = drain(&mut engine, &index).unwrap();
        assert_eq!(published.query, "beta");
        assert!(engine.poll().is_none());
    }

    #[test]
    fn test_reset_discards_in_flight() {
        let index = index();
        let mut engine = SearchEngine::new(config(300));
        engine.submit_now(&index, "alpha");
        engine.reset();

        assert!(drain(&mut engine, &index).is_none());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_repeat_query_hits_cache() {
        let index = index();
        let mut engine = SearchEngine::new(config(300));
        engine.submit_now(&index, "beta");
        drain(&mut engine, &index).unwrap();

        engine.submit_now(&index, "beta");
        let published = drain(&mut engine, &index).unwrap();
        assert!(published.cached);
        assert_eq!(published.view.len(), 1);

        engine.reset();
        engine.submit_now(&index, "beta");
        assert!(!drain(&mut engine, &index).unwrap().cached);
    }

    #[test]
    fn test_pending_query_not_run_early() {
        let index = index();
        let mut engine = SearchEngine::new(config(10_000));
        engine.schedule("alpha", Instant::now());
        engine.tick(&index, Instant::now());
        assert!(engine.poll().is_none());
        assert!(!engine.is_idle());
    }
}
