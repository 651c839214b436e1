use std::env;

use serde::Deserialize;

/// Hard cap on the page size start.gg accepts for the tournaments query.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub startgg: StartGgConfig,
    pub discord: DiscordConfig,
    pub filter: FilterConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartGgConfig {
    /// Read from `START_GG_TOKEN`. Absence is not an error: the source simply
    /// reports that no data is available.
    pub token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: Option<String>,
    pub api_url: String,
    /// Optional allow-list of guild ids (`DISCORD_GUILD_IDS`, comma separated).
    /// Empty means every guild the bot belongs to.
    pub guild_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    pub country_code: String,
    pub videogame_ids: Vec<u64>,
    pub per_page: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Run one cycle immediately when entering scheduled mode.
    pub run_on_startup: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let startgg_api_url = env::var("START_GG_API_URL")
            .unwrap_or_else(|_| "https://api.start.gg/gql/alpha".to_string());
        validate_url("START_GG_API_URL", &startgg_api_url)?;

        let discord_api_url = env::var("DISCORD_API_URL")
            .unwrap_or_else(|_| "https://discord.com/api/v10".to_string());
        validate_url("DISCORD_API_URL", &discord_api_url)?;

        Ok(Config {
            startgg: StartGgConfig {
                token: non_empty(env::var("START_GG_TOKEN").ok()),
                api_url: startgg_api_url,
            },
            discord: DiscordConfig {
                bot_token: first_non_empty([
                    env::var("DISCORD_TOKEN").ok(),
                    env::var("DISCORD_BOT_TOKEN").ok(),
                ]),
                api_url: discord_api_url.trim_end_matches('/').to_string(),
                guild_ids: env::var("DISCORD_GUILD_IDS")
                    .map(|v| {
                        v.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            filter: FilterConfig {
                country_code: env::var("COUNTRY_CODE").unwrap_or_else(|_| "DE".to_string()),
                videogame_ids: parse_videogame_ids(
                    &env::var("VIDEOGAME_IDS").unwrap_or_else(|_| "1".to_string()),
                )
                .map_err(|_| ConfigError::InvalidValue("VIDEOGAME_IDS".to_string()))?,
                per_page: env::var("TOURNAMENTS_PER_PAGE")
                    .unwrap_or_else(|_| MAX_PAGE_SIZE.to_string())
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidValue("TOURNAMENTS_PER_PAGE".to_string()))?
                    .min(MAX_PAGE_SIZE),
            },
            schedule: ScheduleConfig {
                run_on_startup: match env::var("RUN_ON_STARTUP") {
                    Ok(v) => match v.to_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => true,
                    },
                    Err(_) => true,
                },
            },
        })
    }

    /// The Discord bot token, or `MissingEnv` for modes that need Discord.
    pub fn require_discord_token(&self) -> Result<&str, ConfigError> {
        self.discord
            .bot_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv("DISCORD_TOKEN".to_string()))
    }
}

/// Parse a comma separated list of game ids such as `"1, 1386"`.
///
/// Fails on an empty list or any entry that is not an unsigned integer.
pub fn parse_videogame_ids(raw: &str) -> Result<Vec<u64>, ConfigError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue(format!("videogame id '{}'", s)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        return Err(ConfigError::InvalidValue(
            "videogame id list is empty".to_string(),
        ));
    }

    Ok(ids)
}

fn validate_url(var: &str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidValue(var.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// First candidate that is set and not blank.
fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates.into_iter().find_map(non_empty)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            startgg: StartGgConfig {
                token: None,
                api_url: "https://api.start.gg/gql/alpha".to_string(),
            },
            discord: DiscordConfig {
                bot_token: None,
                api_url: "https://discord.com/api/v10".to_string(),
                guild_ids: Vec::new(),
            },
            filter: FilterConfig {
                country_code: "DE".to_string(),
                videogame_ids: vec![1],
                per_page: MAX_PAGE_SIZE,
            },
            schedule: ScheduleConfig {
                run_on_startup: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_game_id_list_with_whitespace() {
        assert_eq!(parse_videogame_ids("1, 1386 ,33945").unwrap(), vec![1, 1386, 33945]);
    }

    #[test]
    fn rejects_empty_or_garbled_game_ids() {
        assert!(parse_videogame_ids("").is_err());
        assert!(parse_videogame_ids(" , ").is_err());
        assert!(parse_videogame_ids("1,abc").is_err());
    }

    #[test]
    fn blank_primary_token_falls_back_to_alternate() {
        assert_eq!(
            first_non_empty([Some(String::new()), Some("bot-token".to_string())]),
            Some("bot-token".to_string())
        );
        assert_eq!(first_non_empty([Some("  ".to_string()), None]), None);
        assert_eq!(
            first_non_empty([Some("primary".to_string()), Some("alternate".to_string())]),
            Some("primary".to_string())
        );
    }

    #[test]
    fn discord_token_required_only_on_demand() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_discord_token(),
            Err(ConfigError::MissingEnv(_))
        ));

        config.discord.bot_token = Some("abc".to_string());
        assert_eq!(config.require_discord_token().unwrap(), "abc");
    }

    #[test]
    fn non_empty_drops_blank_values() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
    }
}
