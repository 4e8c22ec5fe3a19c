use crate::index::Record;
use crate::session::{Phase, SessionController};
use std::path::PathBuf;
use std::time::Instant;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Typing a query and moving through the list
    Browse,
    /// Full key and value of the selected record
    Detail,
    Help,
    /// Entering a database path
    PathPrompt,
}

/// Rows moved by PageUp/PageDown
const PAGE: usize = 10;

/// Application state
pub struct App {
    pub session: SessionController,
    /// Query being edited; mirrored into the session on every change
    pub query: String,
    pub selected: usize,
    pub mode: Mode,
    /// Previous mode before entering help or the path prompt
    pub previous_mode: Mode,
    pub show_hex: bool,
    pub path_input: String,
    pub detail_scroll: usize,
    /// Pending key for vim multi-key commands (e.g., 'g' for 'gg')
    pub pending_key: Option<char>,
}

impl App {
    pub fn new(session: SessionController, show_hex: bool) -> Self {
        Self {
            session,
            query: String::new(),
            selected: 0,
            mode: Mode::Browse,
            previous_mode: Mode::Browse,
            show_hex,
            path_input: String::new(),
            detail_scroll: 0,
            pending_key: None,
        }
    }

    /// Fold finished background work into the view (call this in event loop)
    pub fn tick(&mut self) {
        if self.session.poll(Instant::now()) {
            self.selected = 0;
            self.detail_scroll = 0;
        }
    }

    pub fn view_len(&self) -> usize {
        self.session.state().filtered_view().len()
    }

    pub fn get_selected_record(&self) -> Option<&Record> {
        self.session.state().filtered_view().get(self.selected)
    }

    // Query editing

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.session.set_query(&self.query);
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.session.set_query(&self.query);
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
        self.session.set_query(&self.query);
    }

    /// Delete word backward from query (vim Ctrl+w)
    pub fn delete_word(&mut self) {
        while self.query.ends_with(' ') {
            self.query.pop();
        }
        while !self.query.is_empty() && !self.query.ends_with(' ') {
            self.query.pop();
        }
        self.session.set_query(&self.query);
    }

    pub fn clear_query(&mut self) {
        self.set_query("");
        self.selected = 0;
    }

    /// Run the current query without waiting for the debounce delay
    pub fn execute_search(&mut self) {
        self.session.submit_query();
    }

    // Store commands

    pub fn open_path(&mut self, path: PathBuf) {
        self.selected = 0;
        self.session.open_via_file_hint(path);
    }

    /// Reopen the last database (F5)
    pub fn reload(&mut self) {
        if let Some(path) = self.session.state().last_path().map(|p| p.to_path_buf()) {
            self.open_path(path);
        }
    }

    pub fn close(&mut self) {
        self.session.close();
        self.query.clear();
        self.selected = 0;
        if self.mode == Mode::Detail {
            self.mode = Mode::Browse;
        }
    }

    pub fn repair(&mut self) {
        self.session.repair();
    }

    /// Repair is worth offering in the status bar
    pub fn repair_available(&self) -> bool {
        self.session.state().phase() == Phase::CorruptedPendingRepair
    }

    // Path prompt

    pub fn open_prompt(&mut self) {
        if self.mode == Mode::PathPrompt {
            return;
        }
        self.path_input = self
            .session
            .state()
            .last_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.previous_mode = self.mode;
        self.mode = Mode::PathPrompt;
    }

    pub fn confirm_prompt(&mut self) {
        let input = self.path_input.trim();
        if !input.is_empty() {
            let path = PathBuf::from(input);
            self.open_path(path);
        }
        self.mode = Mode::Browse;
    }

    pub fn cancel_prompt(&mut self) {
        self.mode = self.previous_mode;
    }

    // Modes

    pub fn toggle_detail(&mut self) {
        self.mode = match self.mode {
            Mode::Browse => Mode::Detail,
            Mode::Detail => Mode::Browse,
            other => other,
        };
        self.detail_scroll = 0;
    }

    pub fn toggle_hex(&mut self) {
        self.show_hex = !self.show_hex;
    }

    pub fn show_help(&mut self) {
        if self.mode != Mode::Help {
            self.previous_mode = self.mode;
            self.mode = Mode::Help;
        }
    }

    pub fn hide_help(&mut self) {
        if self.mode == Mode::Help {
            self.mode = self.previous_mode;
        }
    }

    // Vim-style navigation methods

    pub fn select_next(&mut self) {
        let len = self.view_len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
            self.detail_scroll = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.detail_scroll = 0;
        }
    }

    pub fn select_page_down(&mut self) {
        let len = self.view_len();
        if len > 0 {
            self.selected = (self.selected + PAGE).min(len - 1);
            self.detail_scroll = 0;
        }
    }

    pub fn select_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(PAGE);
        self.detail_scroll = 0;
    }

    /// Jump to first record
    pub fn select_first(&mut self) {
        self.selected = 0;
        self.detail_scroll = 0;
    }

    /// Jump to last record
    pub fn select_last(&mut self) {
        self.selected = self.view_len().saturating_sub(1);
        self.detail_scroll = 0;
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll += 1;
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    pub fn scroll_detail_page_down(&mut self) {
        self.detail_scroll += PAGE;
    }

    pub fn scroll_detail_page_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(PAGE);
    }

    pub fn clear_pending_key(&mut self) {
        self.pending_key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchConfig;
    use crate::store::{MemoryEngine, MemoryStore};
    use std::time::Duration;

    fn app() -> App {
        let engine = MemoryEngine::new();
        engine.insert(
            "/db",
            MemoryStore::with_records((0..30).map(|i| (format!("key{:02}", i), format!("v{}", i)))),
        );
        let config = SearchConfig {
            debounce: Duration::from_millis(10),
            ..Default::default()
        };
        let mut app = App::new(SessionController::new(engine, config).unwrap(), false);
        app.open_path(PathBuf::from("/db"));
        assert!(app.session.wait_idle(Duration::from_secs(5)));
        app
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut app = app();
        app.select_prev();
        assert_eq!(app.selected, 0);

        app.select_page_down();
        app.select_page_down();
        app.select_page_down();
        app.select_page_down();
        assert_eq!(app.selected, 29);

        app.select_next();
        assert_eq!(app.selected, 29);
        app.select_first();
        assert_eq!(app.get_selected_record().unwrap().key_display(), "key00");
    }

    #[test]
    fn test_typing_filters_view() {
        let mut app = app();
        for c in "key1".chars() {
            app.push_char(c);
        }
        app.execute_search();
        app.session.wait_idle(Duration::from_secs(5));
        app.tick();
        assert_eq!(app.view_len(), 10);

        app.delete_word();
        assert_eq!(app.query, "");
        app.session.wait_idle(Duration::from_secs(5));
        assert_eq!(app.view_len(), 30);
    }

    #[test]
    fn test_prompt_prefills_last_path() {
        let mut app = app();
        app.open_prompt();
        assert_eq!(app.mode, Mode::PathPrompt);
        assert_eq!(app.path_input, "/db");

        app.cancel_prompt();
        assert_eq!(app.mode, Mode::Browse);
    }

    #[test]
    fn test_close_clears_query() {
        let mut app = app();
        app.set_query("key");
        app.close();
        assert_eq!(app.query, "");
        assert_eq!(app.session.state().query(), "");
        assert!(!app.session.state().is_open());
    }

    #[test]
    fn test_help_returns_to_previous_mode() {
        let mut app = app();
        app.toggle_detail();
        app.show_help();
        app.hide_help();
        assert_eq!(app.mode, Mode::Detail);
    }
}
