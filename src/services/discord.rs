use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::calendar::{CalendarDirectory, CalendarEntry, EventCalendar};
use crate::services::events::CalendarEventDescriptor;

/// Discord rejects scheduled event descriptions longer than this.
const MAX_DESCRIPTION_CHARS: usize = 1000;

const PRIVACY_GUILD_ONLY: u8 = 2;
const ENTITY_TYPE_EXTERNAL: u8 = 3;

#[derive(Clone)]
pub struct DiscordService {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
    guild_allow_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
}

/// Payload for `POST /guilds/{id}/scheduled-events`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateScheduledEvent {
    pub name: String,
    pub description: Option<String>,
    pub scheduled_start_time: String,
    pub scheduled_end_time: Option<String>,
    pub privacy_level: u8, // 2 = GUILD_ONLY
    pub entity_type: u8,   // 3 = EXTERNAL
    pub entity_metadata: Option<EntityMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledEvent {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub description: Option<String>,
    pub scheduled_start_time: String,
    pub scheduled_end_time: Option<String>,
}

impl CreateScheduledEvent {
    /// EXTERNAL events cannot have a channel and must carry a location. The
    /// start.gg link is part of the description.
    pub fn from_descriptor(event: &CalendarEventDescriptor) -> Self {
        Self {
            name: event.name.clone(),
            description: Some(truncate_chars(&event.description, MAX_DESCRIPTION_CHARS)),
            scheduled_start_time: event.scheduled_start.to_rfc3339(),
            scheduled_end_time: Some(event.scheduled_end.to_rfc3339()),
            privacy_level: PRIVACY_GUILD_ONLY,
            entity_type: ENTITY_TYPE_EXTERNAL,
            entity_metadata: Some(EntityMetadata {
                location: Some(event.location.clone()),
            }),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

impl DiscordService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let bot_token = config.require_discord_token()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::discord(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            bot_token,
            api_base: config.discord.api_url.clone(),
            guild_allow_list: config.discord.guild_ids.clone(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        AppError::discord_api(status, &error_text)
    }

    /// Fetch the bot's own user; doubles as a token check.
    pub async fn get_current_user(&self) -> AppResult<DiscordUser> {
        let response = self
            .client
            .get(self.api_url("/users/@me"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Failed to fetch bot user: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::discord(format!("Failed to parse user response: {}", e)))
    }

    /// Get guilds the bot is a member of
    pub async fn get_guilds(&self) -> AppResult<Vec<DiscordGuild>> {
        let response = self
            .client
            .get(self.api_url("/users/@me/guilds"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Failed to get guilds: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::discord(format!("Failed to parse guilds response: {}", e)))
    }

    /// Get scheduled events for a guild
    pub async fn get_scheduled_events(&self, guild_id: &str) -> AppResult<Vec<ScheduledEvent>> {
        let url = self.api_url(&format!("/guilds/{}/scheduled-events", guild_id));

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Failed to get scheduled events: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::discord(format!("Failed to parse events response: {}", e)))
    }

    /// Create a scheduled event in a guild. Single attempt.
    pub async fn create_scheduled_event(
        &self,
        guild_id: &str,
        event: &CreateScheduledEvent,
    ) -> AppResult<ScheduledEvent> {
        let url = self.api_url(&format!("/guilds/{}/scheduled-events", guild_id));

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Failed to create scheduled event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::discord(format!("Failed to parse event response: {}", e)))
    }

    /// Delete a scheduled event. Single attempt.
    pub async fn delete_scheduled_event(&self, guild_id: &str, event_id: &str) -> AppResult<()> {
        let url = self.api_url(&format!(
            "/guilds/{}/scheduled-events/{}",
            guild_id, event_id
        ));

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::discord(format!("Failed to delete scheduled event: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    fn is_allowed(&self, guild_id: &str) -> bool {
        self.guild_allow_list.is_empty() || self.guild_allow_list.iter().any(|g| g == guild_id)
    }
}

/// One guild's scheduled events viewed as a destination calendar.
pub struct GuildCalendar {
    discord: DiscordService,
    guild: DiscordGuild,
}

impl GuildCalendar {
    pub fn new(discord: DiscordService, guild: DiscordGuild) -> Self {
        Self { discord, guild }
    }
}

#[async_trait]
impl EventCalendar for GuildCalendar {
    fn label(&self) -> &str {
        &self.guild.name
    }

    async fn list_events(&self) -> AppResult<Vec<CalendarEntry>> {
        let events = self.discord.get_scheduled_events(&self.guild.id).await?;
        Ok(events
            .into_iter()
            .map(|e| CalendarEntry {
                id: e.id,
                name: e.name,
            })
            .collect())
    }

    async fn create_event(&self, event: &CalendarEventDescriptor) -> AppResult<CalendarEntry> {
        let payload = CreateScheduledEvent::from_descriptor(event);
        let created = self
            .discord
            .create_scheduled_event(&self.guild.id, &payload)
            .await?;
        Ok(CalendarEntry {
            id: created.id,
            name: created.name,
        })
    }

    async fn delete_event(&self, event_id: &str) -> AppResult<()> {
        self.discord
            .delete_scheduled_event(&self.guild.id, event_id)
            .await
    }
}

#[async_trait]
impl CalendarDirectory for DiscordService {
    async fn calendars(&self) -> AppResult<Vec<Box<dyn EventCalendar>>> {
        let guilds = self.get_guilds().await?;
        tracing::info!("Bot is connected to {} server(s)", guilds.len());

        let mut calendars: Vec<Box<dyn EventCalendar>> = Vec::new();
        for guild in guilds {
            if !self.is_allowed(&guild.id) {
                tracing::debug!("Ignoring guild {} ({}): not in DISCORD_GUILD_IDS", guild.name, guild.id);
                continue;
            }
            tracing::info!("   - {} (ID: {})", guild.name, guild.id);
            calendars.push(Box::new(GuildCalendar::new(self.clone(), guild)));
        }

        Ok(calendars)
    }
}
