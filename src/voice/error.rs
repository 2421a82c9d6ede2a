use miette::Diagnostic;
use poise::serenity_prelude as serenity;
use thiserror::Error;

use crate::error::ErrorName;

#[derive(Error, Diagnostic, Debug)]
pub enum MusicCommandError {
    #[error("Not connected to any voice channel in the guild {guild_id}.")]
    #[diagnostic(help("Join a voice channel and use the play or connect command."))]
    BotVoiceNotJoined { guild_id: serenity::GuildId },
    #[error("No channel to join. Please either specify a valid channel or join one.")]
    #[diagnostic(help("Join a voice channel before running the command."))]
    NoChannelProvided,
    #[error("Failed to join voice channel {channel_id} in guild {guild_id} due to {source}")]
    FailedJoinCall {
        source: songbird::error::JoinError,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    },
    #[error("Failed to deafen in voice channel {channel_id} in guild {guild_id} due to {source}")]
    FailedDeafenCall {
        source: songbird::error::JoinError,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    },
    #[error("Failed to leave the voice channel in guild {guild_id} due to {source}")]
    FailedLeaveCall {
        source: songbird::error::JoinError,
        guild_id: serenity::GuildId,
    },
    #[error("The voice connection for this guild is gone.")]
    #[diagnostic(help("Use the connect command to join again."))]
    CallDoesNotExist,
    #[error("Failed to {action} the current track: {source}")]
    FailedTrackControl {
        action: &'static str,
        source: songbird::error::ControlError,
    },
    #[error("An error occured with youtube-dl while processing query \"{query}\" : {source}")]
    #[diagnostic(help("The source may be unavailable right now, just try again."))]
    YoutubeDlError {
        source: youtube_dl::Error,
        query: String,
    },
    #[error("Nothing is playing right now.")]
    #[diagnostic(help("Queue something with the play command."))]
    NothingPlaying,
    #[error("Please enter a value between 1 and 100, got {0}.")]
    InvalidVolume(u8),
    #[error("Only the DJ or admins may use this command.")]
    NotPrivileged,
    #[error("{0} is not in the voice channel.")]
    MemberNotInChannel(serenity::UserId),
}

impl ErrorName for MusicCommandError {
    fn name(&self) -> String {
        let name = match self {
            MusicCommandError::BotVoiceNotJoined { .. } => "bot_voice_not_joined",
            MusicCommandError::NoChannelProvided => "no_channel_provided",
            MusicCommandError::FailedJoinCall { .. } => "failed_join_call",
            MusicCommandError::FailedDeafenCall { .. } => "failed_deafen_call",
            MusicCommandError::FailedLeaveCall { .. } => "failed_leave_call",
            MusicCommandError::CallDoesNotExist => "call_does_not_exist",
            MusicCommandError::FailedTrackControl { .. } => "failed_track_control",
            MusicCommandError::YoutubeDlError { .. } => "youtube_dl_error",
            MusicCommandError::NothingPlaying => "nothing_playing",
            MusicCommandError::InvalidVolume(..) => "invalid_volume",
            MusicCommandError::NotPrivileged => "not_privileged",
            MusicCommandError::MemberNotInChannel(..) => "member_not_in_channel",
        };
        format!("music::{name}")
    }
}
