//! Terminal presentation: spinners and colored output.
//!
//! Uses `indicatif` for progress spinners and `console` for colors. A
//! [`JobProgress`] follows one CLI run from upload to result.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use vizzle::api::VideoResponse;
use vizzle::jobs::JobRecord;
use vizzle::session::SessionView;

/// Spinner plus colored status lines for a CLI run.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Reflect the session's current stage in the spinner.
    pub fn show(&self, label: &str, view: &SessionView) {
        let flags = [&view.try_on, &view.layered, &view.video]
            .into_iter()
            .find(|f| f.processing || f.polling);
        match flags {
            Some(f) if f.polling => self.message(&format!("{label}: waiting for result ({})", f.stage)),
            Some(f) => self.message(&format!("{label}: submitting ({})", f.stage)),
            None if view.uploading => self.message(&format!("{label}: uploading images")),
            None => self.message(label),
        }
    }

    /// Advisory video progress from the status poller.
    pub fn video_progress(&self, snapshot: &VideoResponse) {
        let percent = snapshot.progress.unwrap_or(0.0).clamp(0.0, 100.0);
        let eta = snapshot
            .estimated_time
            .map(|secs| format!(", ~{secs:.0}s left"))
            .unwrap_or_default();
        self.message(&format!(
            "Generating video: {percent:.0}% ({}{eta})",
            snapshot.status
        ));
    }

    pub fn note(&self, text: &str) {
        self.pb
            .println(format!("  {} {text}", self.yellow.apply_to("•")));
    }

    pub fn success(&self, text: &str) {
        self.pb
            .println(format!("  {} {text}", self.green.apply_to("✓")));
    }

    /// Stop the spinner and print the final outcome.
    pub fn finish(&self, outcome: Result<&str, &str>) {
        self.pb.finish_and_clear();
        match outcome {
            Ok(text) => println!("  {} {text}", self.green.apply_to("✓")),
            Err(reason) => println!("  {} {reason}", self.red.apply_to("✗")),
        }
    }

    /// Pretty-print job records as JSON.
    pub fn print_records(&self, records: &[JobRecord]) -> Result<(), serde_json::Error> {
        let heading = if records.iter().any(|r| r.error.is_some()) {
            &self.red
        } else {
            &self.green
        };
        println!();
        println!("{}", heading.apply_to("─── Job Records ───"));
        println!("{}", serde_json::to_string_pretty(records)?);
        Ok(())
    }
}
