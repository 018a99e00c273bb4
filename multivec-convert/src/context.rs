use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

///
/// Per-run settings that are not conversion parameters: diagnostics and progress
/// display. Passed explicitly through the pipeline.
///
#[derive(Debug, Clone)]
pub struct RunContext {
    debug: bool,
    show_progress: bool,
    started: Instant,
    lap: Instant,
}

impl RunContext {
    pub fn new(debug: bool, show_progress: bool) -> Self {
        let now = Instant::now();
        RunContext {
            debug,
            show_progress,
            started: now,
            lap: now,
        }
    }

    /// No progress bars, no stage timings. What library callers and tests want.
    pub fn quiet() -> Self {
        RunContext::new(false, false)
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    ///
    /// Mark the end of a pipeline stage. In debug mode the stage's duration is
    /// logged at info level, otherwise at debug level.
    ///
    pub fn lap(&mut self, stage: &str) -> Duration {
        let took = self.lap.elapsed();
        self.lap = Instant::now();

        let level = match self.debug {
            true => log::Level::Info,
            false => log::Level::Debug,
        };
        log::log!(
            level,
            "{} took {:.2?} ({:.2?} total)",
            stage,
            took,
            self.started.elapsed()
        );
        took
    }

    /// Progress bar over `len` steps, hidden unless progress display is on.
    pub fn progress_bar(&self, len: u64, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        ProgressBar::new(len).with_style(style).with_message(message)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        RunContext::new(false, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    #[rstest]
    fn test_quiet_context_hides_progress() {
        let ctx = RunContext::quiet();
        assert!(!ctx.debug());
        assert!(ctx.progress_bar(10, "test").is_hidden());
    }

    #[rstest]
    fn test_laps_are_bounded_by_total() {
        let mut ctx = RunContext::new(true, false);
        let first = ctx.lap("first");
        let second = ctx.lap("second");
        assert!(first + second <= ctx.elapsed());
    }
}
