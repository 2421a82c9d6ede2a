//! Music commands. The heavy lifting happens in [`super::actions`].

use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::debug;

use super::{
    actions::{self, ActionResult, Invoker},
    controller::{queue_pages, NOTICE_LIFETIME},
    error::MusicCommandError,
    gateway::Notice,
    session::Session,
    track::clean_query,
    vote::is_privileged,
};
use crate::{
    error::BotError,
    utils::{author_permissions, get_guild_id},
    CommandResult, Commands, Context,
};

pub fn music_commands() -> Commands {
    vec![
        connect(),
        play(),
        pause(),
        resume(),
        skip(),
        stop(),
        volume(),
        shuffle(),
        vol_up(),
        vol_down(),
        queue(),
        nowplaying(),
        swap_dj(),
    ]
}

/// Music commands stay in the session's text channel and, unless privileged, in its voice
/// channel.
pub async fn music_check(ctx: Context<'_>) -> Result<bool, BotError> {
    let guild_id = get_guild_id(ctx)?;
    let Some(session) = ctx.data().sessions.get(guild_id) else {
        return Ok(true);
    };

    if ctx.channel_id() != session.text_channel_id() {
        ctx.say(format!(
            "{}, you must be in {} for this session.",
            ctx.author().mention(),
            session.text_channel_id().mention()
        ))
        .await?;
        return Ok(false);
    }

    let invoker = invoker(ctx, Some(&session)).await;
    if invoker.privileged {
        return Ok(true);
    }
    if let Some(voice_channel_id) = session.voice_channel_id() {
        if !session.is_listening(invoker.user_id) {
            ctx.say(format!(
                "{}, you must be in {} to use voice commands.",
                ctx.author().mention(),
                voice_channel_id.mention()
            ))
            .await?;
            return Ok(false);
        }
    }
    Ok(true)
}

async fn invoker(ctx: Context<'_>, session: Option<&Session>) -> Invoker {
    let user_id = ctx.author().id;
    let permissions = author_permissions(ctx).await;
    let owners = &ctx.data().config.owners;
    let privileged = match session {
        Some(session) => is_privileged(owners, session.dj(), user_id, permissions),
        None => {
            owners.contains(&user_id) || permissions.kick_members() || permissions.manage_guild()
        }
    };
    Invoker {
        user_id,
        privileged,
    }
}

fn session(ctx: Context<'_>) -> Result<Arc<Session>, BotError> {
    let guild_id = get_guild_id(ctx)?;
    ctx.data()
        .sessions
        .get(guild_id)
        .ok_or_else(|| MusicCommandError::BotVoiceNotJoined { guild_id }.into())
}

/// Sends the notice as the command's reply, removing it later when it is fleeting.
async fn reply(ctx: Context<'_>, notice: Option<Notice>) -> CommandResult {
    let Some(notice) = notice else {
        // prefix invocations need no answer, interactions do
        if let poise::Context::Application(_) = ctx {
            ctx.send(poise::CreateReply::default().content("Done.").ephemeral(true))
                .await?;
        }
        return Ok(());
    };
    let handle = ctx.say(notice.content).await?;
    if let Some(lifetime) = notice.delete_after {
        let message = handle.into_message().await?;
        let http = ctx.serenity_context().http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Err(e) = message.delete(&http).await {
                debug!("unable to delete reply {}: {e}", message.id);
            }
        });
    }
    Ok(())
}

async fn run(ctx: Context<'_>, result: ActionResult) -> CommandResult {
    reply(ctx, result?).await
}

fn author_voice_channel(ctx: Context<'_>) -> Option<serenity::ChannelId> {
    let guild = ctx.guild()?;
    guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|state| state.channel_id)
}

/// Joins `channel`, or the voice channel you are in.
async fn join(ctx: Context<'_>, channel: Option<serenity::ChannelId>) -> Result<Arc<Session>, BotError> {
    let guild_id = get_guild_id(ctx)?;
    let channel_id = channel
        .or_else(|| author_voice_channel(ctx))
        .ok_or(MusicCommandError::NoChannelProvided)?;
    let session = ctx
        .data()
        .sessions
        .get_or_create(guild_id, ctx.channel_id(), ctx.author().id);
    session.connect(channel_id).await?;
    Ok(session)
}

/// Connect to a voice channel.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("join"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn connect(
    ctx: Context<'_>,
    #[description = "The voice channel to join"]
    #[channel_types("Voice")]
    channel: Option<serenity::GuildChannel>,
) -> CommandResult {
    let session = join(ctx, channel.map(|c| c.id)).await?;
    let voice_channel_id = session.voice_channel_id().ok_or(MusicCommandError::NoChannelProvided)?;
    reply(
        ctx,
        Some(Notice::fleeting(
            format!("Connecting to {}", voice_channel_id.mention()),
            NOTICE_LIFETIME,
        )),
    )
    .await
}

/// Play or queue a song or playlist with the given query or link.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "A search query or a link"]
    #[rest]
    query: String,
) -> CommandResult {
    ctx.defer().await?;
    let session = match ctx.data().sessions.get(get_guild_id(ctx)?) {
        Some(session) if session.voice_channel_id().is_some() => session,
        _ => join(ctx, None).await?,
    };

    let result = ctx.data().sessions.search(clean_query(&query)).await?;
    let notice = actions::enqueue_result(&session, ctx.author().id, result).await;
    reply(ctx, notice).await
}

/// Pause the currently playing song.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "music_check",
    category = "Music",
    user_cooldown = 4
)]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::pause(&session, invoker).await).await
}

/// Resume a paused song.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::resume(&session, invoker).await).await
}

/// Skip the current song.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::skip(&session, invoker).await).await
}

/// Stop the player and leave the voice channel.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("disconnect", "dc"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::stop(&session, invoker).await).await
}

/// Change the player volume, between 1 and 100.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("vol"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "New volume in percent"] volume: u8,
) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::volume(&session, invoker, volume).await).await
}

/// Shuffle the queue.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("mix"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn shuffle(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::shuffle(&session, invoker).await).await
}

/// Turn the volume up by ten.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    hide_in_help,
    check = "music_check",
    category = "Music"
)]
pub async fn vol_up(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::volume_up(&session, invoker).await).await
}

/// Turn the volume down by ten.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    hide_in_help,
    check = "music_check",
    category = "Music"
)]
pub async fn vol_down(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::volume_down(&session, invoker).await).await
}

/// Show the upcoming songs.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("q"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    let titles = session.queued_titles();
    if titles.is_empty() {
        return reply(ctx, actions::queue(&session)).await;
    }

    let pages = queue_pages(titles.iter().map(String::as_str))
        .into_iter()
        .map(|page| format!("**Coming Up...**\n{page}"))
        .collect::<Vec<_>>();
    let pages = pages.iter().map(String::as_str).collect::<Vec<_>>();
    poise::builtins::paginate(ctx, &pages).await?;
    Ok(())
}

/// Bring the music controller back to the bottom of the channel.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("np", "now_playing", "current"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn nowplaying(ctx: Context<'_>) -> CommandResult {
    let session = session(ctx)?;
    if !session.is_playing() {
        return Err(MusicCommandError::NothingPlaying.into());
    }
    session.refresh_controller().await;
    reply(ctx, None).await
}

/// Hand the DJ role to someone else in the voice channel.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id, guild_id = ?ctx.guild_id()))]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    aliases("swap"),
    check = "music_check",
    category = "Music",
    user_cooldown = 5
)]
pub async fn swap_dj(
    ctx: Context<'_>,
    #[description = "The new DJ"] member: Option<serenity::User>,
) -> CommandResult {
    let session = session(ctx)?;
    let invoker = invoker(ctx, Some(&session)).await;
    run(ctx, actions::swap_dj(&session, invoker, member.map(|m| m.id))).await
}
