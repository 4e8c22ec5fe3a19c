//! Loading spinner for CLI commands; a no-op when the `progress` feature is disabled

#[cfg(feature = "progress")]
use std::time::Duration;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown on stderr while a database is being loaded or repaired
pub struct Spinner {
    #[cfg(feature = "progress")]
    bar: ProgressBar,
}

impl Spinner {
    #[cfg(feature = "progress")]
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    #[cfg(not(feature = "progress"))]
    pub fn start(_message: impl Into<String>) -> Self {
        Self {}
    }

    #[cfg(feature = "progress")]
    pub fn finish(self) {
        self.bar.finish_and_clear();
    }

    #[cfg(not(feature = "progress"))]
    pub fn finish(self) {}
}
