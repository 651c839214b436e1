use chrono::{DateTime, TimeZone, Utc};

use crate::services::startgg::{TournamentRecord, STARTGG_SITE_URL};

/// Stream source whose channels are linked in event descriptions.
const TWITCH_SOURCE: &str = "TWITCH";
const TWITCH_CHANNEL_URL: &str = "https://www.twitch.tv";

/// Calendar-ready representation of one tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEventDescriptor {
    /// Also the duplicate detection key.
    pub name: String,
    pub description: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub location: String,
    pub url: String,
}

/// Public tournament page on start.gg.
pub fn tournament_url(slug: &str) -> String {
    format!("{}/{}", STARTGG_SITE_URL, slug.trim_start_matches('/'))
}

/// Convert Unix seconds into a UTC instant. Out-of-range values clamp to the epoch.
pub fn unix_to_utc(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Whether the tournament's own end time is at or before `now`. Decided on
/// the raw end, before any clamping done by the mapper.
pub fn has_ended(tournament: &TournamentRecord, now: DateTime<Utc>) -> bool {
    unix_to_utc(tournament.end_at) <= now
}

impl CalendarEventDescriptor {
    pub fn from_tournament(tournament: &TournamentRecord) -> Self {
        let scheduled_start = unix_to_utc(tournament.start_at);
        let scheduled_end = unix_to_utc(tournament.end_at).max(scheduled_start);

        Self {
            name: tournament.name.clone(),
            description: describe(tournament),
            scheduled_start,
            scheduled_end,
            location: location(tournament),
            url: tournament_url(&tournament.slug),
        }
    }
}

/// Names of the tournament's sub-events, skipping unnamed ones.
pub fn game_names(tournament: &TournamentRecord) -> Vec<&str> {
    tournament
        .events
        .iter()
        .filter_map(|e| e.name.as_deref())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Twitch channel links for the tournament's streams.
pub fn twitch_stream_urls(tournament: &TournamentRecord) -> Vec<String> {
    tournament
        .streams
        .iter()
        .filter(|s| s.source.as_deref() == Some(TWITCH_SOURCE))
        .filter_map(|s| s.channel.as_deref())
        .filter(|c| !c.is_empty())
        .map(|c| format!("{}/{}", TWITCH_CHANNEL_URL, c))
        .collect()
}

fn describe(tournament: &TournamentRecord) -> String {
    let mut description = format!("🔗 Event Page: {}\n\n", tournament_url(&tournament.slug));

    let games = game_names(tournament);
    if !games.is_empty() {
        description.push_str(&format!("🎮 Games: {}\n", games.join(", ")));
    }

    if let Some(venue) = tournament.venue_name.as_deref().filter(|v| !v.is_empty()) {
        description.push_str(&format!("📍 Venue: {}\n", venue));
    }

    let streams = twitch_stream_urls(tournament);
    if !streams.is_empty() {
        let label = if streams.len() > 1 { "Streams" } else { "Stream" };
        description.push_str(&format!("📺 {}: {}", label, streams.join(", ")));
    }

    description
}

fn location(tournament: &TournamentRecord) -> String {
    if let Some(address) = tournament
        .venue_address
        .as_deref()
        .filter(|a| !a.trim().is_empty())
    {
        return address.to_string();
    }

    let parts: Vec<&str> = [tournament.city.as_deref(), tournament.region.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect();

    if parts.is_empty() {
        "TBD".to_string()
    } else {
        parts.join(", ")
    }
}
