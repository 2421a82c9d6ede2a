use miette::Diagnostic;
use poise::serenity_prelude as serenity;
use thiserror::Error;
use tracing::error;

use crate::{data::error::DataError, voice::error::MusicCommandError, Data};

pub async fn error_handler(error: poise::FrameworkError<'_, Data, BotError>) {
    match error {
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => {
            error!(
                "Failed to parse argument {:?} for {}: {}",
                input,
                ctx.command().qualified_name,
                error
            );
            let usage = format!(
                "Invalid usage of `{}`: {}",
                ctx.command().qualified_name,
                error
            );
            if let Err(e) = ctx.say(usage).await {
                error!("Error sending error message: {}", e);
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let cmd = ctx.command().name.clone();
            error!("Error executing command ({}) [{}]: {}", cmd, error.name(), error);

            if let Err(e) = ctx
                .send(poise::CreateReply::default().embed(command_error_embed(cmd, error)))
                .await
            {
                error!("Error sending error message: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed {
            error: Some(error),
            ctx,
            ..
        } => {
            let cmd = ctx.command().name.clone();
            error!("Check failed for command ({}) [{}]: {}", cmd, error.name(), error);

            if let Err(e) = ctx
                .send(poise::CreateReply::default().embed(command_error_embed(cmd, error)))
                .await
            {
                error!("Error sending error message: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error sending error message: {}", e);
            }
        }
    }
}

pub trait ErrorName {
    fn name(&self) -> String;
}

#[derive(Error, Diagnostic, Debug)]
pub enum BotError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    MusicCommandError(#[from] MusicCommandError),
    #[error("Unable to figure out the ID of this guild.")]
    NoGuildId,
    #[error("This guild is not in the cache.")]
    #[diagnostic(help("Try again in a few seconds."))]
    NoGuild,
    #[error("An error occured with serenity: {0}")]
    GeneralSerenityError(#[from] serenity::Error),
    #[error("An error occured within the data manager: {0}")]
    DataManagerError(#[from] DataError),
    #[error("An error occured while talking to {service}: {error}")]
    HttpError {
        service: &'static str,
        error: reqwest::Error,
    },
    #[error("This command is only available to voters.")]
    #[diagnostic(help("Please vote! Use the vote command to get the link."))]
    NotVoted,
    #[error("This command is not configured on this bot: {0} is missing.")]
    #[diagnostic(help("Ask the bot owner to configure it."))]
    NotConfigured(&'static str),
    #[error("The channel {0} is not age restricted.")]
    #[diagnostic(help("Autoposting is only allowed in age restricted channels."))]
    ChannelNotAgeRestricted(serenity::ChannelId),
    #[error("Invalid date or time: {0}")]
    #[diagnostic(help("Use the format MM/DD/YYYY HH:MM:SS, the time is optional."))]
    InvalidTimestamp(String),
}

impl ErrorName for BotError {
    fn name(&self) -> String {
        let name = match self {
            BotError::MusicCommandError(music_command_error) => &music_command_error.name(),
            BotError::NoGuildId => "no_guild_id",
            BotError::NoGuild => "no_guild",
            BotError::GeneralSerenityError(..) => "serenity_error",
            BotError::DataManagerError(data_error) => &data_error.name(),
            BotError::HttpError { .. } => "http_error",
            BotError::NotVoted => "not_voted",
            BotError::NotConfigured(..) => "not_configured",
            BotError::ChannelNotAgeRestricted(..) => "channel_not_age_restricted",
            BotError::InvalidTimestamp(..) => "invalid_timestamp",
        };
        format!("main::{name}")
    }
}

pub fn command_error_embed(command: String, error: BotError) -> serenity::CreateEmbed {
    serenity::CreateEmbed::default()
        .color(serenity::Color::DARK_RED)
        .author(serenity::CreateEmbedAuthor::new(format!(
            "Error In Command | {}",
            command
        )))
        .description(
            serenity::MessageBuilder::default()
                .push_line(format!("### {}", error))
                .push_line({
                    let error_help = error.help().map(|e| e.to_string());
                    let error_help = match error_help {
                        Some(error_str) => error_str,
                        None => "Undescribed error, please report it in the support server."
                            .to_string(),
                    };
                    format!("**Help**: {}", error_help)
                })
                .to_string(),
        )
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new("AGB"))
}
