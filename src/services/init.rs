//! Service context and lifecycle:
//! - construction of the source adapter and Discord destinations
//! - one-shot sync / clear cycles across every destination
//! - scheduler spawn and teardown

use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::error::AppResult;
use crate::services::calendar::{CalendarDirectory, CalendarSynchronizer};
use crate::services::discord::DiscordService;
use crate::services::scheduler::Scheduler;
use crate::services::startgg::{StartGgService, TournamentFilter, TournamentSource};

/// Totals of one sync cycle across all destinations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub calendars: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Destinations whose existing events could not be read.
    pub calendar_errors: usize,
    pub source_unavailable: bool,
}

/// Totals of one clear cycle across all destinations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClearCycleReport {
    pub calendars: usize,
    pub deleted: usize,
    pub failed: usize,
    pub calendar_errors: usize,
}

/// Everything a sync cycle needs, built once at startup and shared with the
/// scheduler.
pub struct SyncContext {
    pub config: Config,
    filter: TournamentFilter,
    source: Arc<dyn TournamentSource>,
    destinations: Arc<dyn CalendarDirectory>,
    synchronizer: CalendarSynchronizer,
}

impl SyncContext {
    pub fn new(
        config: Config,
        filter: TournamentFilter,
        source: Arc<dyn TournamentSource>,
        destinations: Arc<dyn CalendarDirectory>,
    ) -> Self {
        Self {
            config,
            filter,
            source,
            destinations,
            synchronizer: CalendarSynchronizer::default(),
        }
    }

    /// Build the start.gg source and the Discord destinations, verifying the
    /// bot token before anything else runs.
    pub async fn init(config: Config, filter: TournamentFilter) -> AppResult<Self> {
        let source = StartGgService::new(&config)?;
        let discord = DiscordService::new(&config)?;

        tracing::info!("Logging in to Discord");
        let user = discord.get_current_user().await?;
        tracing::info!("Logged in as {} (ID: {})", user.username, user.id);

        tracing::info!(
            "Tournament filter: country {}, videogame ids {:?}",
            filter.country_code,
            filter.videogame_ids
        );

        Ok(Self::new(config, filter, Arc::new(source), Arc::new(discord)))
    }

    /// Fetch tournaments once and synchronize them into every destination, one
    /// destination at a time.
    pub async fn run_sync_cycle(&self) -> CycleReport {
        tracing::info!("Running sync cycle");
        let mut report = CycleReport::default();

        let calendars = match self.destinations.calendars().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to list destination calendars: {}", e);
                return report;
            }
        };

        if calendars.is_empty() {
            tracing::warn!(
                "Bot is not in any servers; invite it with the View Channels and Manage Events permissions"
            );
            return report;
        }

        let Some(tournaments) = self.source.fetch_tournaments(&self.filter).await else {
            tracing::warn!("No valid tournament data received; skipping this cycle");
            report.source_unavailable = true;
            return report;
        };
        tracing::info!("Found {} tournaments", tournaments.len());

        for calendar in &calendars {
            report.calendars += 1;
            match self
                .synchronizer
                .sync_calendar(calendar.as_ref(), &tournaments, Utc::now())
                .await
            {
                Ok(r) => {
                    report.created += r.created;
                    report.skipped += r.skipped;
                    report.failed += r.failures.len();
                }
                Err(e) => {
                    tracing::warn!("Failed to sync calendar \"{}\": {}", calendar.label(), e);
                    report.calendar_errors += 1;
                }
            }
        }

        tracing::info!(
            "Completed sync cycle for {} server(s): {} created, {} skipped, {} failed",
            report.calendars,
            report.created,
            report.skipped,
            report.failed
        );

        report
    }

    /// Delete every event from every destination.
    pub async fn run_clear_cycle(&self) -> ClearCycleReport {
        tracing::info!("Running clear events cycle");
        let mut report = ClearCycleReport::default();

        let calendars = match self.destinations.calendars().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to list destination calendars: {}", e);
                return report;
            }
        };

        if calendars.is_empty() {
            tracing::warn!("Bot is not in any servers");
            return report;
        }

        for calendar in &calendars {
            report.calendars += 1;
            match self.synchronizer.clear_calendar(calendar.as_ref()).await {
                Ok(r) => {
                    report.deleted += r.deleted;
                    report.failed += r.failures.len();
                }
                Err(e) => {
                    tracing::warn!(
                        "Error clearing events from \"{}\": {}",
                        calendar.label(),
                        e
                    );
                    report.calendar_errors += 1;
                }
            }
        }

        tracing::info!(
            "Completed clear events cycle. Deleted {} total events from {} server(s)",
            report.deleted,
            report.calendars
        );

        report
    }

    /// Release the HTTP sessions held by the context.
    pub fn shutdown(self) {
        tracing::info!("Closing start.gg and Discord sessions");
        drop(self);
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        use crate::services::testing::{MemoryDirectory, MemorySource};

        let mut config = Config::default();
        config.schedule.run_on_startup = false;
        let filter = TournamentFilter::from_config(&config.filter, None, None);
        Self::new(
            config,
            filter,
            Arc::new(MemorySource::new(None)),
            Arc::new(MemoryDirectory {
                calendars: Vec::new(),
            }),
        )
    }
}

/// Spawn the twice-daily scheduler. It exits when `shutdown` fires.
pub fn spawn_scheduler(
    ctx: Arc<SyncContext>,
    shutdown: &tokio::sync::broadcast::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        Scheduler::new(ctx).run(shutdown_rx).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::services::testing::{tournament, MemoryCalendar, MemoryDirectory, MemorySource};

    fn upcoming(name: &str) -> crate::services::startgg::TournamentRecord {
        let end = Utc::now().timestamp() + 86_400;
        tournament(name, end - 3600, end)
    }

    fn context(
        source: Arc<MemorySource>,
        calendars: Vec<MemoryCalendar>,
    ) -> SyncContext {
        let config = Config::default();
        let filter = TournamentFilter::from_config(&config.filter, Some("us"), None);
        SyncContext::new(config, filter, source, Arc::new(MemoryDirectory { calendars }))
    }

    #[tokio::test]
    async fn cycle_syncs_every_calendar() {
        let first = MemoryCalendar::new("first");
        let second = MemoryCalendar::with_events("second", &["Cup A"]);
        let source = Arc::new(MemorySource::new(Some(vec![upcoming("Cup A"), upcoming("Cup B")])));
        let ctx = context(source.clone(), vec![first.clone(), second.clone()]);

        let report = ctx.run_sync_cycle().await;

        assert_eq!(report.calendars, 2);
        assert_eq!(report.created, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(first.names(), vec!["Cup A".to_string(), "Cup B".to_string()]);
        assert_eq!(second.names(), vec!["Cup A".to_string(), "Cup B".to_string()]);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(
            source.last_filter.lock().unwrap().as_ref().unwrap().country_code,
            "US"
        );
    }

    #[tokio::test]
    async fn unavailable_source_writes_nothing() {
        let calendar = MemoryCalendar::new("guild");
        let ctx = context(Arc::new(MemorySource::new(None)), vec![calendar.clone()]);

        let report = ctx.run_sync_cycle().await;

        assert!(report.source_unavailable);
        assert_eq!(report.created, 0);
        assert_eq!(calendar.create_calls(), 0);
    }

    #[tokio::test]
    async fn no_calendars_skips_source_fetch() {
        let source = Arc::new(MemorySource::new(Some(vec![upcoming("Cup A")])));
        let ctx = context(source.clone(), Vec::new());

        let report = ctx.run_sync_cycle().await;

        assert_eq!(report, CycleReport::default());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_calendar_does_not_stop_others() {
        let broken = MemoryCalendar::new("broken").failing_list();
        let healthy = MemoryCalendar::new("healthy");
        let source = Arc::new(MemorySource::new(Some(vec![upcoming("Cup A")])));
        let ctx = context(source, vec![broken, healthy.clone()]);

        let report = ctx.run_sync_cycle().await;

        assert_eq!(report.calendar_errors, 1);
        assert_eq!(report.created, 1);
        assert_eq!(healthy.names(), vec!["Cup A".to_string()]);
    }

    #[tokio::test]
    async fn clear_cycle_totals_across_calendars() {
        let first = MemoryCalendar::with_events("first", &["Cup A", "Cup B"]);
        let second = MemoryCalendar::with_events("second", &["Cup C"]).failing_delete("Cup C");
        let ctx = context(Arc::new(MemorySource::new(None)), vec![first.clone(), second.clone()]);

        let report = ctx.run_clear_cycle().await;

        assert_eq!(report.calendars, 2);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed, 1);
        assert!(first.names().is_empty());
        assert_eq!(second.names(), vec!["Cup C".to_string()]);
    }
}
