use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use tokio::sync::{broadcast, watch};

use crate::services::init::SyncContext;

/// Local wall-clock hours at which a sync cycle runs every day.
pub const DAILY_RUN_HOURS: [u32; 2] = [8, 20];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { at: DateTime<Local> },
}

/// Earliest daily slot strictly after `now`.
///
/// Slots that do not exist on a given day (DST gaps) are skipped; ambiguous
/// ones resolve to their earlier instant.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hours: &[u32]) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut slots: Vec<NaiveTime> = hours
        .iter()
        .filter_map(|h| NaiveTime::from_hms_opt(*h, 0, 0))
        .collect();
    slots.sort();

    for day in 0..=2 {
        let date = today + Duration::days(day);
        for slot in &slots {
            let Some(candidate) = tz.from_local_datetime(&date.and_time(*slot)).earliest() else {
                continue;
            };
            if candidate > *now {
                return candidate;
            }
        }
    }

    now.clone() + Duration::days(1)
}

/// Wall clock the scheduler arms its timer against.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Twice-daily trigger for sync cycles.
///
/// Runs as an explicit loop: each iteration arms a single timer, waits for it
/// (or for shutdown), runs one cycle and re-arms.
pub struct Scheduler {
    ctx: Arc<SyncContext>,
    clock: Clock,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self::with_clock(ctx, Arc::new(Local::now))
    }

    pub fn with_clock(ctx: Arc<SyncContext>, clock: Clock) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self { ctx, clock, state }
    }

    pub fn state(&self) -> SchedulerState {
        self.state.borrow().clone()
    }

    /// Follow state changes after the scheduler has been moved into its task.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Arm the timer for the next slot after `now` and return the wait.
    pub fn arm(&self, now: DateTime<Local>) -> std::time::Duration {
        let at = next_run_after(&now, &DAILY_RUN_HOURS);
        let wait = (at - now).to_std().unwrap_or_default();

        tracing::info!(
            "Next scheduled run: {} (in {:.1} hours)",
            at.format("%Y-%m-%d %H:%M:%S %Z"),
            wait.as_secs_f64() / 3600.0
        );

        self.state.send_replace(SchedulerState::Armed { at });
        wait
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.ctx.config.schedule.run_on_startup {
            tracing::info!("Running initial sync cycle");
            self.ctx.run_sync_cycle().await;
        }

        loop {
            let wait = self.arm((self.clock)());

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Scheduler shutting down");
                    self.state.send_replace(SchedulerState::Idle);
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            self.state.send_replace(SchedulerState::Idle);
            self.ctx.run_sync_cycle().await;
        }
    }
}
