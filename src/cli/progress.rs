use std::time::{Duration, Instant};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::pipeline::RunEvent;
use crate::utils::format_duration;

/// Progress bars for a fuzzing run, driven by [`RunEvent`]s.
pub struct RunProgress {
    multi: MultiProgress,
    batch_bar: Option<ProgressBar>,
    status_bar: ProgressBar,
    tests: usize,
    bugs: usize,
    start_time: Instant,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {bar:30.cyan/dark_gray} {pos}/{len} | {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl RunProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(spinner_style());
        status_bar.set_message("Starting...");
        status_bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            multi,
            batch_bar: None,
            status_bar,
            tests: 0,
            bugs: 0,
            start_time: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::StageStarted { stage } => {
                self.println(&format!("{} {}", style("==>").cyan().bold(), stage.display_name()));
                self.update_status();
            }
            RunEvent::PhaseChanged { .. } => {}
            RunEvent::BatchStarted { label, total } => {
                self.finish_batch();
                let bar = self.multi.insert_before(&self.status_bar, ProgressBar::new(*total as u64));
                bar.set_style(bar_style());
                bar.set_message(label.clone());
                self.batch_bar = Some(bar);
            }
            RunEvent::TestCompleted { test_name, is_bug, bug_type } => {
                self.tests += 1;
                if let Some(bar) = &self.batch_bar {
                    bar.inc(1);
                }
                if *is_bug {
                    self.bugs += 1;
                    self.println(&format!("    {} [{}] {}", style("BUG").red().bold(), bug_type, test_name));
                }
                self.update_status();
            }
            RunEvent::CategoryCompleted { category, total, bugs } => {
                self.finish_batch();
                let marker = if *bugs > 0 {
                    style(format!("{} bugs", bugs)).red().to_string()
                } else {
                    style("OK".to_string()).green().to_string()
                };
                self.println(&format!("    {}: {} tests, {}", category.display_name(), total, marker));
            }
            RunEvent::StageCompleted { stage, total, bugs, interrupted } => {
                self.finish_batch();
                let suffix = if *interrupted { " (interrupted)" } else { "" };
                self.println(&format!(
                    "{} {} complete: {} tests, {} bugs{}",
                    style("<==").cyan(), stage.display_name(), total, bugs, suffix
                ));
            }
            RunEvent::StageSkipped { stage, reason } => {
                self.finish_batch();
                self.println(&format!("{} {} skipped: {}", style("[!]").yellow(), stage.display_name(), reason));
            }
        }
    }

    fn finish_batch(&mut self) {
        if let Some(bar) = self.batch_bar.take() {
            bar.finish_and_clear();
        }
    }

    fn update_status(&self) {
        self.status_bar.set_message(format!(
            "{} | {} tests | {} bugs",
            format_duration(self.start_time.elapsed().as_millis() as u64),
            self.tests,
            self.bugs,
        ));
    }

    pub fn finish(mut self) {
        self.finish_batch();
        self.status_bar.finish_and_clear();
    }

    /// Print a line above the bars.
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new()
    }
}
