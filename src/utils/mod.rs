use std::time::Instant;
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
///
/// Dropped without `complete()` it reports the work as stopped, not finished.
pub struct Timer {
    label: String,
    start: Instant,
    completed: bool,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn complete(&mut self) {
        self.completed = true;
    }

    fn outcome(&self) -> &'static str {
        if self.completed { "Finished" } else { "Stopped" }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  {}: {} (took {:.2?})",
            self.outcome(),
            self.label,
            self.start.elapsed()
        );
    }
}

/// Signed percentage with two decimals, e.g. `+5.00%`.
pub fn fmt_pct(value: f64) -> String {
    format!("{:+.2}%", value)
}
