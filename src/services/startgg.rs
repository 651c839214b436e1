use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, FilterConfig, MAX_PAGE_SIZE};
use crate::error::{AppError, AppResult};

pub const STARTGG_SITE_URL: &str = "https://start.gg";

const TOURNAMENTS_QUERY: &str = r#"
  query TournamentsByCountry($cCode: String!, $perPage: Int!, $videogameIds: [ID!]) {
    tournaments(query: {
      perPage: $perPage
      filter: {
        countryCode: $cCode
        videogameIds: $videogameIds
      }
    }) {
      nodes {
        id
        name
        slug
        countryCode
        startAt
        endAt
        numAttendees
        venueAddress
        venueName
        city
        addrState
        timezone
        events {
          id
          name
          numEntrants
          videogame {
            id
            name
            displayName
          }
        }
        streams {
          streamName
          streamSource
        }
      }
    }
  }
"#;

// ============================================================================
// Domain Types
// ============================================================================

/// A normalized tournament as returned by the source adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentRecord {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    /// Unix seconds.
    pub start_at: i64,
    /// Unix seconds.
    pub end_at: i64,
    pub num_attendees: Option<u32>,
    pub venue_name: Option<String>,
    pub venue_address: Option<String>,
    pub timezone: Option<String>,
    pub events: Vec<TournamentEvent>,
    pub streams: Vec<StreamReference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentEvent {
    pub name: Option<String>,
    pub num_entrants: Option<u32>,
    pub videogame: Option<Videogame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Videogame {
    pub id: u64,
    pub name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamReference {
    pub source: Option<String>,
    pub channel: Option<String>,
}

/// Region/game filter for one tournaments query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentFilter {
    pub country_code: String,
    pub videogame_ids: Vec<u64>,
    pub per_page: u32,
}

impl TournamentFilter {
    pub fn new(country_code: impl Into<String>, videogame_ids: Vec<u64>, per_page: u32) -> Self {
        Self {
            country_code: country_code.into().trim().to_uppercase(),
            videogame_ids,
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Configured filter with optional command line overrides applied.
    pub fn from_config(
        filter: &FilterConfig,
        country: Option<&str>,
        videogame_ids: Option<&[u64]>,
    ) -> Self {
        Self::new(
            country.unwrap_or(&filter.country_code),
            videogame_ids
                .map(<[u64]>::to_vec)
                .unwrap_or_else(|| filter.videogame_ids.clone()),
            filter.per_page,
        )
    }
}

/// Anything that can supply tournaments for a filter.
///
/// `None` means the source is unavailable for this cycle; implementations log
/// the reason instead of returning an error.
#[async_trait]
pub trait TournamentSource: Send + Sync {
    async fn fetch_tournaments(&self, filter: &TournamentFilter) -> Option<Vec<TournamentRecord>>;
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TournamentsVariables<'a> {
    c_code: &'a str,
    per_page: u32,
    videogame_ids: &'a [u64],
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TournamentsData {
    tournaments: Option<TournamentConnection>,
}

#[derive(Debug, Deserialize)]
struct TournamentConnection {
    nodes: Option<Vec<TournamentNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TournamentNode {
    id: u64,
    name: Option<String>,
    slug: Option<String>,
    country_code: Option<String>,
    start_at: Option<i64>,
    end_at: Option<i64>,
    num_attendees: Option<u32>,
    venue_address: Option<String>,
    venue_name: Option<String>,
    city: Option<String>,
    addr_state: Option<String>,
    timezone: Option<String>,
    events: Option<Vec<EventNode>>,
    streams: Option<Vec<StreamNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventNode {
    name: Option<String>,
    num_entrants: Option<u32>,
    videogame: Option<VideogameNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideogameNode {
    id: u64,
    name: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamNode {
    stream_name: Option<String>,
    stream_source: Option<String>,
}

impl TournamentNode {
    /// Tournaments without a name, slug or both timestamps cannot be placed
    /// on a calendar.
    fn into_record(self) -> Option<TournamentRecord> {
        let (Some(name), Some(slug)) = (
            self.name.filter(|n| !n.trim().is_empty()),
            self.slug.filter(|s| !s.trim().is_empty()),
        ) else {
            tracing::warn!("Tournament {} has no name or slug; dropping it", self.id);
            return None;
        };

        let (Some(start_at), Some(end_at)) = (self.start_at, self.end_at) else {
            tracing::warn!(
                "Tournament '{}' ({}) has no complete schedule; dropping it",
                name,
                self.id
            );
            return None;
        };

        Some(TournamentRecord {
            id: self.id,
            name,
            slug,
            country_code: self.country_code,
            city: self.city,
            region: self.addr_state,
            start_at,
            end_at,
            num_attendees: self.num_attendees,
            venue_name: self.venue_name,
            venue_address: self.venue_address,
            timezone: self.timezone,
            events: self
                .events
                .unwrap_or_default()
                .into_iter()
                .map(|e| TournamentEvent {
                    name: e.name,
                    num_entrants: e.num_entrants,
                    videogame: e.videogame.map(|v| Videogame {
                        id: v.id,
                        name: v.name,
                        display_name: v.display_name,
                    }),
                })
                .collect(),
            streams: self
                .streams
                .unwrap_or_default()
                .into_iter()
                .map(|s| StreamReference {
                    source: s.stream_source,
                    channel: s.stream_name,
                })
                .collect(),
        })
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone)]
pub struct StartGgService {
    client: Client,
    token: Option<String>,
    api_url: String,
}

impl StartGgService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::StartGg(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token: config.startgg.token.clone(),
            api_url: config.startgg.api_url.clone(),
        })
    }

    /// Issue the tournaments query and validate the response envelope.
    async fn query_tournaments(
        &self,
        token: &str,
        filter: &TournamentFilter,
    ) -> AppResult<Vec<TournamentRecord>> {
        let request = GraphQlRequest {
            query: TOURNAMENTS_QUERY,
            variables: TournamentsVariables {
                c_code: &filter.country_code,
                per_page: filter.per_page,
                videogame_ids: &filter.videogame_ids,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::StartGg(format!("Failed to query tournaments: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::StartGg(format!(
                "start.gg API error ({}): {}",
                status, error_text
            )));
        }

        let body: GraphQlResponse<TournamentsData> = response
            .json()
            .await
            .map_err(|e| AppError::StartGg(format!("Failed to parse tournaments response: {}", e)))?;

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(AppError::StartGg(format!(
                "GraphQL query returned errors: {}",
                messages.join("; ")
            )));
        }

        let nodes = body
            .data
            .and_then(|d| d.tournaments)
            .and_then(|t| t.nodes)
            .ok_or_else(|| {
                AppError::StartGg("Response is missing data.tournaments.nodes".to_string())
            })?;

        Ok(nodes
            .into_iter()
            .filter_map(TournamentNode::into_record)
            .collect())
    }
}

#[async_trait]
impl TournamentSource for StartGgService {
    async fn fetch_tournaments(&self, filter: &TournamentFilter) -> Option<Vec<TournamentRecord>> {
        let Some(token) = self.token.as_deref() else {
            tracing::warn!("No START_GG_TOKEN configured; tournament data is unavailable");
            return None;
        };

        tracing::info!(
            "Fetching up to {} tournaments for country {} (videogame ids: {:?})",
            filter.per_page,
            filter.country_code,
            filter.videogame_ids
        );

        match self.query_tournaments(token, filter).await {
            Ok(records) => {
                tracing::info!("Fetched {} tournaments from start.gg", records.len());
                Some(records)
            }
            Err(e) => {
                tracing::warn!("Tournament data unavailable: {}", e);
                None
            }
        }
    }
}
