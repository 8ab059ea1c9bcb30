use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Pipeline;

/// Recurring fetch driver. Owns its task handle so a double start is a
/// visible no-op instead of a second concurrent run; the pipeline executes
/// inline in the task, so runs never overlap.
pub struct Scheduler {
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { handle: None }
    }

    pub fn start(&mut self, pipeline: Arc<Pipeline>, interval_minutes: u32) {
        if self.is_running() {
            tracing::warn!("Scheduler already running");
            return;
        }

        tracing::info!("Starting scheduler (every {} minutes)", interval_minutes);

        let handle = tokio::spawn(async move {
            let period = Duration::from_secs(u64::from(interval_minutes) * 60);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the first
            // run happens one full interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                tracing::info!("Running scheduled fetch...");
                match pipeline.run(None).await {
                    Ok(summary) => tracing::info!(
                        "Scheduled fetch done: {} processed, {} added, {} skipped",
                        summary.processed,
                        summary.added,
                        summary.skipped
                    ),
                    Err(e) => tracing::error!("Scheduled fetch failed: {}", e),
                }
            }
        });

        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
