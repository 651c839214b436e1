use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::services::dedup::DuplicateIndex;
use crate::services::events::{has_ended, CalendarEventDescriptor};
use crate::services::startgg::TournamentRecord;

/// Upper bound on source records considered per synchronization run.
pub const MAX_EVENTS_PER_RUN: usize = 100;

/// An event as seen in a destination calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub id: String,
    pub name: String,
}

/// A destination calendar the synchronizer can append to or clear.
///
/// Calls against one calendar are always issued sequentially.
#[async_trait]
pub trait EventCalendar: Send + Sync {
    /// Human readable name used in logs and reports.
    fn label(&self) -> &str;

    async fn list_events(&self) -> AppResult<Vec<CalendarEntry>>;

    async fn create_event(&self, event: &CalendarEventDescriptor) -> AppResult<CalendarEntry>;

    async fn delete_event(&self, event_id: &str) -> AppResult<()>;
}

/// Source of destination calendars, queried once per cycle.
#[async_trait]
pub trait CalendarDirectory: Send + Sync {
    async fn calendars(&self) -> AppResult<Vec<Box<dyn EventCalendar>>>;
}

/// One item that could not be written.
#[derive(Debug)]
pub struct ItemFailure {
    pub name: String,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: usize,
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Default)]
pub struct ClearReport {
    pub deleted: usize,
    pub failures: Vec<ItemFailure>,
}

/// Appends tournaments to destination calendars without creating duplicates,
/// and clears calendars on request.
///
/// Duplicate detection is a read-modify-write against the live calendar: a
/// concurrent writer to the same calendar can still cause a name to be
/// created twice.
pub struct CalendarSynchronizer {
    max_events: usize,
}

impl Default for CalendarSynchronizer {
    fn default() -> Self {
        Self {
            max_events: MAX_EVENTS_PER_RUN,
        }
    }
}

impl CalendarSynchronizer {
    pub fn new(max_events: usize) -> Self {
        Self { max_events }
    }

    /// Create events for `tournaments` in `calendar`, skipping past and
    /// already present ones.
    ///
    /// Fails only if the existing events cannot be read; per-item failures are
    /// collected into the report.
    pub async fn sync_calendar(
        &self,
        calendar: &dyn EventCalendar,
        tournaments: &[TournamentRecord],
        now: DateTime<Utc>,
    ) -> AppResult<SyncReport> {
        let mut report = SyncReport::default();

        if tournaments.is_empty() {
            warn!("No tournaments found for calendar \"{}\"", calendar.label());
            return Ok(report);
        }

        info!("Fetching existing events of \"{}\" for duplicate checking", calendar.label());
        let existing = calendar.list_events().await?;
        let mut index = DuplicateIndex::build(existing.iter().map(|e| e.name.as_str()));
        info!(
            "Found {} existing events, indexed {} event names",
            existing.len(),
            index.len()
        );

        for tournament in tournaments.iter().take(self.max_events) {
            // Discord rejects events that are already over.
            if has_ended(tournament, now) {
                continue;
            }

            if index.contains(&tournament.name) {
                info!("Skipping duplicate tournament \"{}\"", tournament.name);
                report.skipped += 1;
                continue;
            }

            let descriptor = CalendarEventDescriptor::from_tournament(tournament);
            match calendar.create_event(&descriptor).await {
                Ok(created) => {
                    info!(
                        "Created tournament event \"{}\" in \"{}\"",
                        created.name,
                        calendar.label()
                    );
                    index.insert(created.name);
                    report.created += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to create event for tournament \"{}\": {}",
                        tournament.name, e
                    );
                    if e.discord_status() == Some(403) {
                        warn!("The bot needs the Manage Events permission in \"{}\"", calendar.label());
                    }
                    report.failures.push(ItemFailure {
                        name: tournament.name.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            "Created {} new tournament events in \"{}\" ({} duplicates skipped, {} failed)",
            report.created,
            calendar.label(),
            report.skipped,
            report.failures.len()
        );

        Ok(report)
    }

    /// Delete every event in `calendar`, continuing past individual failures.
    pub async fn clear_calendar(&self, calendar: &dyn EventCalendar) -> AppResult<ClearReport> {
        info!("Clearing all events from \"{}\"", calendar.label());

        let mut report = ClearReport::default();
        let existing = calendar.list_events().await?;

        if existing.is_empty() {
            info!("No events found in \"{}\"", calendar.label());
            return Ok(report);
        }

        for event in existing {
            match calendar.delete_event(&event.id).await {
                Ok(()) => {
                    info!("Deleted event \"{}\"", event.name);
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Failed to delete event \"{}\": {}", event.name, e);
                    report.failures.push(ItemFailure {
                        name: event.name,
                        error: e,
                    });
                }
            }
        }

        info!(
            "Deleted {} events from \"{}\" ({} failed)",
            report.deleted,
            calendar.label(),
            report.failures.len()
        );

        Ok(report)
    }
}
