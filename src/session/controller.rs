use crate::index::RecordIndex;
use crate::query::{FilteredView, SearchConfig, SearchEngine};
use crate::session::worker::{Command, Outcome, StoreWorker};
use crate::store::{OpenError, RepairError, StoreEngine};
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::time::{Duration, Instant};

/// Lifecycle of the viewed store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Opening,
    Open,
    CorruptedPendingRepair,
    Repairing,
}

impl Phase {
    /// A store operation is running on the worker
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Opening | Phase::Repairing)
    }
}

/// Everything the presentation layer shows
#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    status_text: String,
    total_count: usize,
    corruption_detected: bool,
    last_path: Option<PathBuf>,
    query: String,
    filtered_view: FilteredView,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Closed,
            status_text: "No database open".to_string(),
            total_count: 0,
            corruption_detected: false,
            last_path: None,
            query: String::new(),
            filtered_view: FilteredView::empty(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Records in the whole index, regardless of the query
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn corruption_detected(&self) -> bool {
        self.corruption_detected
    }

    /// Path of the last open or repair request
    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Records currently shown; the last published filter result
    pub fn filtered_view(&self) -> &FilteredView {
        &self.filtered_view
    }

    /// Whether the view is narrowed by a query
    pub fn is_filtered(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

/// Drives the viewer: opening, closing, repairing and searching.
///
/// Commands never block. Store work runs on a [`StoreWorker`] and filtering
/// on the [`SearchEngine`]; [`SessionController::poll`] folds finished work
/// into the [`SessionState`]. Each open or repair request takes a new
/// generation, and outcomes from older generations are dropped, so a slow
/// open can never overwrite a newer one.
pub struct SessionController {
    worker: StoreWorker,
    search: SearchEngine,
    state: SessionState,
    index: RecordIndex,
    generation: u64,
    /// The pending open follows a successful repair
    reopen_after_repair: bool,
    /// Phase to fall back to if the pending repair fails
    repair_origin: Phase,
    /// Status prefix while open
    headline: &'static str,
}

impl SessionController {
    pub fn new<E>(engine: E, config: SearchConfig) -> io::Result<Self>
    where
        E: StoreEngine + Send + 'static,
    {
        Ok(Self {
            worker: StoreWorker::spawn(engine)?,
            search: SearchEngine::new(config),
            state: SessionState::new(),
            index: RecordIndex::empty(),
            generation: 0,
            reopen_after_repair: false,
            repair_origin: Phase::Closed,
            headline: "Database opened",
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The full index of the open store (empty otherwise)
    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    /// Open the store at `path`, replacing whatever is open.
    ///
    /// Supersedes an open already in progress. Rejected while a repair runs.
    pub fn open(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref().to_path_buf();
        if self.state.phase == Phase::Repairing {
            self.state.status_text = format!(
                "Repair in progress, cannot open {} yet",
                path.display()
            );
            return false;
        }

        self.begin_open(path, false);
        true
    }

    /// Open the store a picked file belongs to
    pub fn open_via_file_hint(&mut self, path: impl AsRef<Path>) -> bool {
        let store = resolve_store_path(path.as_ref());
        self.open(store)
    }

    /// Release the store and clear the view. The query is cleared too.
    pub fn close(&mut self) {
        // In-flight results belong to the store being closed
        self.generation += 1;
        self.worker.send(Command::Close);

        self.index = RecordIndex::empty();
        self.search.reset();
        self.reopen_after_repair = false;
        self.headline = "Database opened";

        let state = &mut self.state;
        if state.phase == Phase::Repairing {
            warn!("closing while a repair is still running");
        }
        state.phase = Phase::Closed;
        state.total_count = 0;
        state.corruption_detected = false;
        state.query.clear();
        state.filtered_view = FilteredView::empty();
        state.status_text = "Database closed".to_string();
    }

    /// Repair the last store. Allowed after corruption was detected, or when
    /// closed with a known path. A successful repair reopens the store once.
    pub fn repair(&mut self) -> bool {
        let path = match (self.state.phase, self.state.last_path.clone()) {
            (Phase::CorruptedPendingRepair | Phase::Closed, Some(path)) => path,
            (Phase::Closed | Phase::CorruptedPendingRepair, None) => {
                self.state.status_text = "Error: no database path to repair".to_string();
                return false;
            }
            (Phase::Open, _) => {
                self.state.status_text = "Close the database before repairing it".to_string();
                return false;
            }
            (Phase::Opening | Phase::Repairing, _) => {
                self.state.status_text = "Busy, repair not started".to_string();
                return false;
            }
        };

        self.generation += 1;
        self.repair_origin = self.state.phase;
        self.state.phase = Phase::Repairing;
        self.state.status_text = format!("Repairing database: {}...", path.display());
        info!("repair requested for {}", path.display());

        if !self.worker.send(Command::Repair {
            generation: self.generation,
            path,
        }) {
            self.worker_lost();
        }
        true
    }

    /// Update the query; filtering starts after the debounce delay.
    /// While no store is open the query is only remembered.
    pub fn set_query(&mut self, text: &str) {
        if self.state.query == text {
            return;
        }
        self.state.query = text.to_string();
        if self.state.phase == Phase::Open {
            self.search.schedule(text, Instant::now());
        }
    }

    /// Filter with the current query now, skipping the debounce delay
    pub fn submit_query(&mut self) {
        if self.state.phase == Phase::Open {
            self.search.submit_now(&self.index, &self.state.query);
        }
    }

    /// Apply finished store work and filter results. Returns whether the
    /// state changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;

        loop {
            match self.worker.try_recv() {
                Ok(outcome) => changed |= self.apply(outcome),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state.phase.is_busy() {
                        self.worker_lost();
                        changed = true;
                    }
                    break;
                }
            }
        }

        if self.state.phase == Phase::Open {
            self.search.tick(&self.index, now);
            if let Some(published) = self.search.poll() {
                if published.view.index().same_snapshot(&self.index) {
                    debug!(
                        "filter {:?}: {} of {} in {:.1}ms{}",
                        published.query,
                        published.view.len(),
                        self.index.len(),
                        published.elapsed.as_secs_f64() * 1000.0,
                        if published.cached { " (cached)" } else { "" }
                    );
                    self.state.filtered_view = published.view;
                    self.refresh_open_status();
                    changed = true;
                } else {
                    debug!("dropping filter result computed against a replaced index");
                }
            }
        }

        changed
    }

    /// No store operation and no search pending or running
    pub fn is_idle(&self) -> bool {
        !self.state.phase.is_busy() && self.search.is_idle()
    }

    /// How long the event loop may sleep before the next [`poll`](Self::poll)
    /// has debounce work to do
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.search.time_until_ready(now)
    }

    /// Poll until idle or `timeout` elapses. Returns whether it became idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.poll(now);
            if self.is_idle() {
                return true;
            }
            if now >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn begin_open(&mut self, path: PathBuf, after_repair: bool) {
        self.generation += 1;
        self.reopen_after_repair = after_repair;

        // The previous snapshot goes away with the implicit close
        self.index = RecordIndex::empty();
        self.search.reset();

        let state = &mut self.state;
        state.phase = Phase::Opening;
        state.total_count = 0;
        state.corruption_detected = false;
        state.filtered_view = FilteredView::empty();
        state.status_text = format!("Opening database: {}...", path.display());
        state.last_path = Some(path.clone());

        if !self.worker.send(Command::Open {
            generation: self.generation,
            path,
        }) {
            self.worker_lost();
        }
    }

    fn apply(&mut self, outcome: Outcome) -> bool {
        if outcome.generation() != self.generation {
            debug!(
                "discarding outcome of generation {} (current {})",
                outcome.generation(),
                self.generation
            );
            return false;
        }

        match outcome {
            Outcome::Opened {
                path,
                result,
                elapsed,
                ..
            } => {
                debug!("open of {} finished in {:.1}ms", path.display(), elapsed.as_secs_f64() * 1000.0);
                match result {
                    Ok(index) => self.opened(index),
                    Err(err) => self.open_failed(&path, err),
                }
            }
            Outcome::Repaired { path, result, .. } => match result {
                Ok(()) => self.repaired(path),
                Err(err) => self.repair_failed(&path, err),
            },
        }
        true
    }

    fn opened(&mut self, index: RecordIndex) {
        self.headline = if self.reopen_after_repair {
            "Database repaired and reopened"
        } else {
            "Database opened"
        };
        self.reopen_after_repair = false;

        self.index = index;
        let state = &mut self.state;
        state.phase = Phase::Open;
        state.corruption_detected = false;
        state.total_count = self.index.len();
        state.filtered_view = FilteredView::all(&self.index);

        if state.is_filtered() {
            self.search.submit_now(&self.index, &self.state.query);
        }
        self.refresh_open_status();
    }

    fn open_failed(&mut self, path: &Path, err: OpenError) {
        let after_repair = std::mem::take(&mut self.reopen_after_repair);
        let prefix = if after_repair {
            "Repair finished but reopening failed"
        } else {
            "Error"
        };

        let state = &mut self.state;
        state.total_count = 0;
        state.filtered_view = FilteredView::empty();

        if err.is_corruption() {
            warn!("corruption detected in {}: {}", path.display(), err);
            state.phase = Phase::CorruptedPendingRepair;
            state.corruption_detected = true;
            state.status_text = format!(
                "{} opening {}: {}. Database appears corrupted, repair is available",
                prefix,
                path.display(),
                err
            );
        } else {
            warn!("could not open {}: {}", path.display(), err);
            state.phase = Phase::Closed;
            state.corruption_detected = false;
            state.status_text = format!("{} opening {}: {}", prefix, path.display(), err);
        }
    }

    fn repaired(&mut self, path: PathBuf) {
        info!("repair of {} succeeded, reopening", path.display());
        let display = path.display().to_string();
        self.begin_open(path, true);
        self.state.status_text = format!("Database repaired, reopening {}...", display);
    }

    fn repair_failed(&mut self, path: &Path, err: RepairError) {
        warn!("repair of {} failed: {}", path.display(), err.message);
        self.state.phase = self.repair_origin;
        self.state.status_text = format!("Repair failed for {}: {}", path.display(), err.message);
    }

    fn refresh_open_status(&mut self) {
        let state = &mut self.state;
        let path = state
            .last_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        state.status_text = if state.is_filtered() {
            format!(
                "{}: {} ({} of {} entries match \"{}\")",
                self.headline,
                path,
                state.filtered_view.len(),
                state.total_count,
                state.query.trim()
            )
        } else {
            format!("{}: {} ({} entries)", self.headline, path, state.total_count)
        };
    }

    fn worker_lost(&mut self) {
        warn!("store worker is gone");
        self.index = RecordIndex::empty();
        self.search.reset();
        let state = &mut self.state;
        state.phase = Phase::Closed;
        state.total_count = 0;
        state.corruption_detected = false;
        state.filtered_view = FilteredView::empty();
        state.status_text = "Store worker terminated unexpectedly".to_string();
    }
}

/// A picked file stands for the directory holding it
pub fn resolve_store_path(path: &Path) -> PathBuf {
    if path.is_file() {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        path.to_path_buf()
    }
}
