mod app;
mod ui;

use crate::session::SessionController;
use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Longest wait for input before redrawing
const FRAME: Duration = Duration::from_millis(100);

/// Start the viewer. `path`, if given, is opened right away and
/// `initial_query` is applied once it has loaded.
pub fn run(
    session: SessionController,
    path: Option<PathBuf>,
    initial_query: Option<String>,
    show_hex: bool,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.clear()?;

    let mut app = App::new(session, show_hex);
    if let Some(query) = initial_query {
        app.set_query(&query);
    }
    if let Some(path) = path {
        app.open_path(path);
    }

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Term, app: &mut App) -> Result<()> {
    loop {
        app.tick();

        terminal.draw(|f| ui::draw(f, app))?;

        // Wake up in time for a pending debounced search
        let timeout = app
            .session
            .time_until_ready(Instant::now())
            .map_or(FRAME, |d| d.min(FRAME));

        if event::poll(timeout)? {
            // Only handle key press events, not release or repeat
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(app, key) == Flow::Quit {
                    return Ok(());
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent) -> Flow {
    // Global keybindings
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (KeyModifiers::CONTROL, KeyCode::Char('q')) => {
            return Flow::Quit;
        }
        _ => {}
    }

    match app.mode {
        app::Mode::Help => {
            // Any key closes help
            app.hide_help();
        }
        app::Mode::PathPrompt => match key.code {
            KeyCode::Enter => app.confirm_prompt(),
            KeyCode::Esc => app.cancel_prompt(),
            KeyCode::Backspace => {
                app.path_input.pop();
            }
            KeyCode::Char(c) => app.path_input.push(c),
            _ => {}
        },
        app::Mode::Browse => return handle_browse_key(app, key),
        app::Mode::Detail => handle_detail_key(app, key),
    }

    Flow::Continue
}

fn handle_browse_key(app: &mut App, key: KeyEvent) -> Flow {
    // Handle pending 'g' key for gg command
    if app.pending_key == Some('g') {
        app.clear_pending_key();
        if key.code == KeyCode::Char('g') {
            app.select_first();
            return Flow::Continue;
        }
        // The first 'g' was part of the query after all
        app.push_char('g');
    }

    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('j')) | (KeyModifiers::CONTROL, KeyCode::Char('n')) => {
            app.select_next()
        }
        (KeyModifiers::CONTROL, KeyCode::Char('k')) => app.select_prev(),
        (KeyModifiers::CONTROL, KeyCode::Char('d')) => app.select_page_down(),
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.select_page_up(),
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => app.delete_word(),
        (KeyModifiers::CONTROL, KeyCode::Char('h')) => app.pop_char(),
        (KeyModifiers::CONTROL, KeyCode::Char('a')) => app.select_first(),
        (KeyModifiers::CONTROL, KeyCode::Char('e')) => app.select_last(),
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.toggle_detail(),
        (KeyModifiers::CONTROL, KeyCode::Char('x')) => app.toggle_hex(),
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => app.open_prompt(),
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => app.close(),
        (KeyModifiers::CONTROL, KeyCode::Char('r')) => app.repair(),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
            KeyCode::Esc => {
                if app.query.is_empty() {
                    return Flow::Quit;
                }
                app.clear_query();
            }
            KeyCode::Enter => app.execute_search(),
            KeyCode::Down | KeyCode::Tab => app.select_next(),
            KeyCode::Up | KeyCode::BackTab => app.select_prev(),
            KeyCode::PageDown => app.select_page_down(),
            KeyCode::PageUp => app.select_page_up(),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            // 'g' and 'G' only navigate while the query is empty
            KeyCode::Char('g') if app.query.is_empty() => app.pending_key = Some('g'),
            KeyCode::Char('G') if app.query.is_empty() => app.select_last(),
            KeyCode::Char(c) => app.push_char(c),
            KeyCode::Backspace => app.pop_char(),
            KeyCode::F(1) => app.show_help(),
            KeyCode::F(5) => app.reload(),
            _ => {}
        },
        _ => {}
    }

    Flow::Continue
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('d')) | (KeyModifiers::CONTROL, KeyCode::Char('f')) => {
            app.scroll_detail_page_down()
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) | (KeyModifiers::CONTROL, KeyCode::Char('b')) => {
            app.scroll_detail_page_up()
        }
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.toggle_detail(),
        (KeyModifiers::CONTROL, KeyCode::Char('x')) => app.toggle_hex(),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
            KeyCode::Esc | KeyCode::Char('q') => app.toggle_detail(),
            KeyCode::Down | KeyCode::Char('j') => app.scroll_detail_down(),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_detail_up(),
            KeyCode::PageDown => app.scroll_detail_page_down(),
            KeyCode::PageUp => app.scroll_detail_page_up(),
            // Vim: n/N - next/previous record without leaving the detail view
            KeyCode::Char('n') => app.select_next(),
            KeyCode::Char('N') | KeyCode::Char('p') => app.select_prev(),
            KeyCode::Char('x') => app.toggle_hex(),
            KeyCode::Char('?') | KeyCode::F(1) => app.show_help(),
            _ => {}
        },
        _ => {}
    }
}
