use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::services::events::{
    has_ended, twitch_stream_urls, unix_to_utc, CalendarEventDescriptor,
};
use crate::services::startgg::{TournamentFilter, TournamentRecord, TournamentSource};

fn or_tbd(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("TBD")
}

/// Human readable report of the fetched tournaments and the calendar events
/// a sync would create from them.
pub fn render_preview(tournaments: &[TournamentRecord], now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "📊 {} tournament(s) received", tournaments.len());
    let _ = writeln!(out, "=====================================");

    for (i, t) in tournaments.iter().enumerate() {
        let _ = writeln!(out, "\n🏆 Tournament {}: {}", i + 1, t.name);
        let _ = writeln!(out, "   🌍 Country: {}", or_tbd(t.country_code.as_deref()));
        let _ = writeln!(
            out,
            "   🏙️ City: {}, {}",
            or_tbd(t.city.as_deref()),
            or_tbd(t.region.as_deref())
        );
        let _ = writeln!(out, "   📅 Start: {}", unix_to_utc(t.start_at).to_rfc3339());
        let _ = writeln!(out, "   📅 End: {}", unix_to_utc(t.end_at).to_rfc3339());
        let _ = writeln!(
            out,
            "   👥 Attendees: {}",
            t.num_attendees
                .map(|n| n.to_string())
                .unwrap_or_else(|| "TBD".to_string())
        );
        let _ = writeln!(out, "   📍 Venue: {}", or_tbd(t.venue_name.as_deref()));
        let _ = writeln!(out, "   🕐 Timezone: {}", or_tbd(t.timezone.as_deref()));
        let _ = writeln!(out, "   🎮 Events: {}", t.events.len());

        for (j, event) in t.events.iter().enumerate() {
            let game = event
                .videogame
                .as_ref()
                .and_then(|v| v.display_name.as_deref())
                .or(event.name.as_deref())
                .unwrap_or("Unknown game");
            let _ = writeln!(
                out,
                "      {}. {} ({} entrants)",
                j + 1,
                game,
                event.num_entrants.unwrap_or(0)
            );
        }

        let streams = twitch_stream_urls(t);
        if !streams.is_empty() {
            let _ = writeln!(out, "   📺 Streams: {}", streams.join(", "));
        }

        let descriptor = CalendarEventDescriptor::from_tournament(t);
        let status = if has_ended(t, now) {
            "already ended, would be omitted"
        } else {
            "would be created"
        };
        let _ = writeln!(out, "   🎯 Calendar event ({}):", status);
        let _ = writeln!(out, "      Name: {}", descriptor.name);
        let _ = writeln!(out, "      Location: {}", descriptor.location);
        let _ = writeln!(out, "      URL: {}", descriptor.url);
        for line in descriptor.description.lines().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "      | {}", line);
        }
    }

    out
}

/// Fetch tournaments for `filter` and print the preview. Returns whether any
/// data was available.
pub async fn run_preview(source: &dyn TournamentSource, filter: &TournamentFilter) -> bool {
    match source.fetch_tournaments(filter).await {
        Some(tournaments) => {
            println!("{}", render_preview(&tournaments, Utc::now()));
            true
        }
        None => {
            tracing::warn!("No tournament data available; add START_GG_TOKEN to .env to test with real data");
            false
        }
    }
}
