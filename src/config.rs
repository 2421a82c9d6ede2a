//! Runtime configuration read from the environment.
//!
//! Secrets may be given either directly (`DISCORD_TOKEN`) or as a path to a file containing them
//! (`DISCORD_TOKEN_FILE`), the file variant is searched first.

use std::{env, time::Duration};

use poise::serenity_prelude as serenity;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "tp!";
const DEFAULT_AUTOPOST_INTERVAL: u64 = 60;
const DEFAULT_EMBED_COLOUR: u32 = 0x5865F2;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Expected {0} in the environment")]
    Missing(&'static str),
    #[error("Unable to read {key} from file {path}: {error}")]
    SecretFile {
        key: &'static str,
        path: String,
        error: std::io::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub database_url: String,
    pub prefix: String,
    pub owners: Vec<serenity::UserId>,
    pub weather_api_key: Option<String>,
    pub topgg: Option<TopGgConfig>,
    pub links: Links,
    pub autopost: AutopostConfig,
    pub embed_colour: serenity::Colour,
}

#[derive(Debug, Clone)]
pub struct TopGgConfig {
    pub token: String,
    pub bot_id: serenity::UserId,
}

#[derive(Debug, Clone, Default)]
pub struct Links {
    pub invite: Option<String>,
    pub support: Option<String>,
    pub vote: Option<String>,
    pub policy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AutopostConfig {
    /// Base url of the image api. Autoposting is turned off without it.
    pub api_base: Option<String>,
    pub endpoints: Vec<String>,
    pub excluded_guilds: Vec<serenity::GuildId>,
    pub interval: Duration,
}

impl BotConfig {
    /// Load the configuration from the process environment. In debug builds a `.env` file is
    /// loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = secret(&lookup, "DISCORD_TOKEN")?.ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let database_url =
            secret(&lookup, "DATABASE_URL")?.ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let prefix = non_empty(&lookup, "BOT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let owners = id_list(&lookup, "OWNER_IDS")?
            .into_iter()
            .map(serenity::UserId::new)
            .collect();

        let topgg = match secret(&lookup, "TOPGG_TOKEN")? {
            Some(token) => {
                let bot_id = non_empty(&lookup, "TOPGG_BOT_ID")
                    .ok_or(ConfigError::Missing("TOPGG_BOT_ID"))?;
                Some(TopGgConfig {
                    token,
                    bot_id: serenity::UserId::new(parse_id("TOPGG_BOT_ID", &bot_id)?),
                })
            }
            None => None,
        };

        let interval = match non_empty(&lookup, "AUTOPOST_INTERVAL_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    key: "AUTOPOST_INTERVAL_SECS",
                    value,
                })?,
            None => DEFAULT_AUTOPOST_INTERVAL,
        };
        let endpoints = non_empty(&lookup, "AUTOPOST_ENDPOINTS")
            .map(|value| split_list(&value))
            .unwrap_or_else(|| vec!["jpg".to_string(), "gif".to_string()]);
        let autopost = AutopostConfig {
            api_base: non_empty(&lookup, "AUTOPOST_API_BASE"),
            endpoints,
            excluded_guilds: id_list(&lookup, "AUTOPOST_EXCLUDED_GUILDS")?
                .into_iter()
                .map(serenity::GuildId::new)
                .collect(),
            interval: Duration::from_secs(interval),
        };

        let embed_colour = match non_empty(&lookup, "EMBED_COLOUR") {
            Some(value) => u32::from_str_radix(value.trim_start_matches('#'), 16)
                .map_err(|_| ConfigError::Invalid {
                    key: "EMBED_COLOUR",
                    value,
                })?,
            None => DEFAULT_EMBED_COLOUR,
        };

        Ok(Self {
            token,
            database_url,
            prefix,
            owners,
            weather_api_key: secret(&lookup, "WEATHER_API_KEY")?,
            topgg,
            links: Links {
                invite: non_empty(&lookup, "INVITE_URL"),
                support: non_empty(&lookup, "SUPPORT_URL"),
                vote: non_empty(&lookup, "VOTE_URL"),
                policy: non_empty(&lookup, "POLICY_URL"),
            },
            autopost,
            embed_colour: serenity::Colour::new(embed_colour),
        })
    }

    pub fn is_owner(&self, user_id: serenity::UserId) -> bool {
        self.owners.contains(&user_id)
    }
}

/// Looks up `{key}_FILE` first and reads the secret from that path, then falls back to `key`.
fn secret<F>(lookup: &F, key: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(&format!("{key}_FILE")) {
        let value = std::fs::read_to_string(&path)
            .map_err(|error| ConfigError::SecretFile { key, path, error })?;
        return Ok(Some(value.trim().to_string()));
    }
    Ok(non_empty(lookup, key))
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn id_list<F>(lookup: &F, key: &'static str) -> Result<Vec<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(value) => split_list(&value)
            .iter()
            .map(|id| parse_id(key, id))
            .collect(),
        None => Ok(vec![]),
    }
}

fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
}
