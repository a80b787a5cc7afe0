use crate::{lifecycle, notifier::NotifierState, repository::RepositoryState};
use std::time::Duration;

/// run_scheduler
///
/// The periodic driver of the event completion sweep. Spawned once at
/// startup; each tick claims overdue events and fans out the thank-you
/// notices. A failing tick is logged and the loop keeps running, so a
/// transient database outage never kills the scheduler.
pub async fn run_scheduler(
    repo: RepositoryState,
    notifier: NotifierState,
    interval_secs: u64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick fires immediately, which doubles as a catch-up pass
    // after downtime.
    loop {
        ticker.tick().await;
        let today = chrono::Utc::now().date_naive();
        match lifecycle::run_completion_sweep(&repo, &notifier, today).await {
            Ok(report) if report.events_completed > 0 => {
                tracing::info!(
                    events = report.events_completed,
                    notices = report.thank_you_notices,
                    "scheduled completion sweep finished"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("scheduled completion sweep failed: {e}");
            }
        }
    }
}
