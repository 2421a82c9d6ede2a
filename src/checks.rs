//! Command checks shared by several modules.

use serde::Deserialize;
use tracing::warn;

use crate::{config::TopGgConfig, error::BotError, utils::GuildInfo, Context, Data};

const TOPGG_API: &str = "https://top.gg/api";

/// Refuses commands an admin disabled in this guild. Commands used in DMs always pass.
pub async fn check_command_enabled(ctx: Context<'_>) -> Result<bool, BotError> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(true);
    };
    let command = disabled_name(ctx.parent_commands(), ctx.command());

    let disabled = ctx
        .data()
        .data_manager
        .guild_settings()
        .is_command_disabled(guild_id, command)
        .await?;
    if disabled {
        ctx.reply(":x: This command has been disabled!").await?;
        return Ok(false);
    }
    Ok(true)
}

/// Commands are disabled by their top level name, so subcommands answer to their group.
pub fn disabled_name<'a>(
    parents: &[&'a poise::Command<Data, BotError>],
    command: &'a poise::Command<Data, BotError>,
) -> &'a str {
    parents.first().map_or(&command.name, |root| &root.name)
}

#[derive(Debug, Deserialize)]
struct VoteCheck {
    voted: u8,
}

pub fn vote_check_url(topgg: &TopGgConfig, user_id: poise::serenity_prelude::UserId) -> String {
    format!("{TOPGG_API}/bots/{}/check?userId={user_id}", topgg.bot_id)
}

/// Owners always pass. Everyone else must have voted for the bot on top.gg, if it is configured.
pub async fn voter_only(ctx: Context<'_>) -> Result<bool, BotError> {
    let data = ctx.data();
    if data.config.is_owner(ctx.author().id) {
        return Ok(true);
    }
    let Some(topgg) = &data.config.topgg else {
        return Ok(true);
    };

    let response = data
        .http
        .get(vote_check_url(topgg, ctx.author().id))
        .header("Authorization", &topgg.token)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|error| BotError::HttpError {
            service: "top.gg",
            error,
        })?;
    let check: VoteCheck = response.json().await.map_err(|error| BotError::HttpError {
        service: "top.gg",
        error,
    })?;

    if check.voted == 1 {
        Ok(true)
    } else {
        warn!(
            "{} tried a voter only command in {}",
            ctx.author().id,
            GuildInfo::from_ctx(ctx).map(|g| g.guild_name).unwrap_or_default()
        );
        Err(BotError::NotVoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{autopost::autopost, constants::*, data::DataManager};

    #[tokio::test]
    async fn disabled_group_blocks_its_subcommands() {
        let settings = DataManager::new("sqlite::memory:")
            .await
            .unwrap()
            .guild_settings();
        settings.disable_command(GUILD_ID_1, "autopost").await.unwrap();

        let group = autopost();
        for subcommand in &group.subcommands {
            let name = disabled_name(&[&group], subcommand);
            assert_eq!(name, "autopost");
            assert!(settings.is_command_disabled(GUILD_ID_1, name).await.unwrap());
        }
        assert_eq!(group.subcommands.len(), 2);
    }

    #[test]
    fn top_level_commands_use_their_own_name() {
        let group = autopost();
        assert_eq!(disabled_name(&[], &group), "autopost");
    }

    #[test]
    fn vote_url_names_bot_and_user() {
        let topgg = TopGgConfig {
            token: "secret".to_string(),
            bot_id: BOT_ID,
        };
        assert_eq!(
            vote_check_url(&topgg, USER_ID_1),
            format!("https://top.gg/api/bots/{BOT_ID}/check?userId={USER_ID_1}")
        );
    }

    #[test]
    fn vote_payload_parses() {
        let check: VoteCheck = serde_json::from_str(r#"{"voted": 1}"#).unwrap();
        assert_eq!(check.voted, 1);
    }
}
