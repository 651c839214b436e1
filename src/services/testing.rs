//! In-memory stand-ins for the source and destination boundaries.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{AppError, AppResult};
use crate::services::calendar::{CalendarDirectory, CalendarEntry, EventCalendar};
use crate::services::events::CalendarEventDescriptor;
use crate::services::startgg::{TournamentFilter, TournamentRecord, TournamentSource};

pub fn tournament(name: &str, start_at: i64, end_at: i64) -> TournamentRecord {
    TournamentRecord {
        id: 1,
        name: name.to_string(),
        slug: format!("tournament/{}", name.to_lowercase().replace(' ', "-")),
        country_code: Some("DE".to_string()),
        city: Some("Berlin".to_string()),
        region: Some("BE".to_string()),
        start_at,
        end_at,
        num_attendees: None,
        venue_name: None,
        venue_address: None,
        timezone: None,
        events: Vec::new(),
        streams: Vec::new(),
    }
}

#[derive(Default)]
struct CalendarState {
    events: Vec<CalendarEntry>,
    next_id: usize,
}

/// Calendar backed by a `Vec`, with configurable per-name failures.
#[derive(Clone, Default)]
pub struct MemoryCalendar {
    label: String,
    state: Arc<Mutex<CalendarState>>,
    create_calls: Arc<AtomicUsize>,
    fail_list: bool,
    fail_create: HashSet<String>,
    fail_delete: HashSet<String>,
}

impl MemoryCalendar {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn with_events(label: &str, names: &[&str]) -> Self {
        let calendar = Self::new(label);
        {
            let mut state = calendar.state.lock().unwrap();
            for name in names {
                state.next_id += 1;
                let id = state.next_id.to_string();
                state.events.push(CalendarEntry {
                    id,
                    name: name.to_string(),
                });
            }
        }
        calendar
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete.insert(name.to_string());
        self
    }

    pub fn names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.events.iter().map(|e| e.name.clone()).collect()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventCalendar for MemoryCalendar {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list_events(&self) -> AppResult<Vec<CalendarEntry>> {
        if self.fail_list {
            return Err(AppError::discord_api(
                StatusCode::INTERNAL_SERVER_ERROR,
                "list failed",
            ));
        }
        Ok(self.state.lock().unwrap().events.clone())
    }

    async fn create_event(&self, event: &CalendarEventDescriptor) -> AppResult<CalendarEntry> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.contains(&event.name) {
            return Err(AppError::discord_api(StatusCode::BAD_REQUEST, "invalid event"));
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let entry = CalendarEntry {
            id: state.next_id.to_string(),
            name: event.name.clone(),
        };
        state.events.push(entry.clone());
        Ok(entry)
    }

    async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state.events.iter().position(|e| e.id == event_id) else {
            return Err(AppError::discord_api(StatusCode::NOT_FOUND, "unknown event"));
        };
        if self.fail_delete.contains(&state.events[pos].name) {
            return Err(AppError::discord_api(
                StatusCode::INTERNAL_SERVER_ERROR,
                "delete failed",
            ));
        }
        state.events.remove(pos);
        Ok(())
    }
}

/// Directory that hands out clones of a fixed set of calendars.
pub struct MemoryDirectory {
    pub calendars: Vec<MemoryCalendar>,
}

#[async_trait]
impl CalendarDirectory for MemoryDirectory {
    async fn calendars(&self) -> AppResult<Vec<Box<dyn EventCalendar>>> {
        Ok(self
            .calendars
            .iter()
            .cloned()
            .map(|c| Box::new(c) as Box<dyn EventCalendar>)
            .collect())
    }
}

/// Source returning a fixed answer and counting fetches.
#[derive(Default)]
pub struct MemorySource {
    pub tournaments: Option<Vec<TournamentRecord>>,
    pub fetches: AtomicUsize,
    pub last_filter: Mutex<Option<TournamentFilter>>,
}

impl MemorySource {
    pub fn new(tournaments: Option<Vec<TournamentRecord>>) -> Self {
        Self {
            tournaments,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TournamentSource for MemorySource {
    async fn fetch_tournaments(&self, filter: &TournamentFilter) -> Option<Vec<TournamentRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        self.tournaments.clone()
    }
}
