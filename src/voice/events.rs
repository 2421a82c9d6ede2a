//! Gateway events the music sessions react to.

use poise::serenity_prelude as serenity;
use tracing::{debug, info};

use super::{
    actions::{self, Invoker},
    controller::{ControllerAction, NOTICE_LIFETIME},
    gateway::Notice,
    session::SessionManager,
    vote::is_privileged,
};
use crate::Data;

/// A voice state change, reduced to what the sessions need.
#[derive(Debug, Clone, Copy)]
pub struct VoiceChange {
    pub guild_id: serenity::GuildId,
    pub user_id: serenity::UserId,
    pub bot: bool,
    pub channel_id: Option<serenity::ChannelId>,
}

/// Tears the session down when the bot is dropped from voice and keeps the DJ role occupied
/// otherwise.
pub async fn voice_changed(sessions: &SessionManager, bot_id: serenity::UserId, change: VoiceChange) {
    let Some(session) = sessions.get(change.guild_id) else {
        return;
    };

    if change.user_id == bot_id {
        if change.channel_id.is_none() && session.voice_channel_id().is_some() {
            info!("removed from voice in guild {}, ending session", change.guild_id);
            session.teardown().await;
        }
        return;
    }

    let joined = change.channel_id.is_some() && change.channel_id == session.voice_channel_id();
    let roster = session.roster();
    if let Some(dj) = session.handle_voice_update(
        change.user_id,
        change.bot,
        change.channel_id.is_none(),
        joined,
        &roster,
    ) {
        debug!("{dj} is now the DJ in guild {}", change.guild_id);
        session.refresh_controller().await;
    }
}

/// A reaction on some message, with the reacting member's standing.
#[derive(Debug, Clone)]
pub struct ControllerPress {
    pub guild_id: serenity::GuildId,
    pub message_id: serenity::MessageId,
    pub user_id: serenity::UserId,
    pub bot: bool,
    pub permissions: serenity::Permissions,
    pub emoji: serenity::ReactionType,
}

/// Runs the controller button that was pressed. Returns whether the reaction was a button press.
pub async fn controller_pressed(
    sessions: &SessionManager,
    owners: &[serenity::UserId],
    press: ControllerPress,
) -> bool {
    let Some(session) = sessions.get(press.guild_id) else {
        return false;
    };
    if press.bot || session.controller() != Some(press.message_id) {
        return false;
    }
    if !session.is_listening(press.user_id) {
        return false;
    }
    let Some(action) = ControllerAction::from_reaction(&press.emoji) else {
        return false;
    };

    let invoker = Invoker {
        user_id: press.user_id,
        privileged: is_privileged(owners, session.dj(), press.user_id, press.permissions),
    };
    debug!("{} pressed {action} in guild {}", press.user_id, press.guild_id);
    match actions::perform(&session, invoker, action).await {
        Ok(Some(notice)) => session.announce(&notice).await,
        Ok(None) => {}
        Err(e) => {
            session
                .announce(&Notice::fleeting(e.to_string(), NOTICE_LIFETIME))
                .await
        }
    }
    true
}

pub async fn handle_voice_state_update(ctx: &serenity::Context, data: &Data, new: &serenity::VoiceState) {
    let Some(guild_id) = new.guild_id else {
        return;
    };
    let bot_id = ctx.cache.current_user().id;
    let bot = new
        .member
        .as_ref()
        .map(|m| m.user.bot)
        .unwrap_or(new.user_id == bot_id);
    let change = VoiceChange {
        guild_id,
        user_id: new.user_id,
        bot,
        channel_id: new.channel_id,
    };
    voice_changed(&data.sessions, bot_id, change).await;
}

pub async fn handle_reaction_add(ctx: &serenity::Context, data: &Data, reaction: &serenity::Reaction) {
    let (Some(guild_id), Some(member)) = (reaction.guild_id, reaction.member.as_ref()) else {
        return;
    };
    let permissions = ctx
        .cache
        .guild(guild_id)
        .map(|guild| guild.member_permissions(member))
        .unwrap_or_else(serenity::Permissions::empty);
    let press = ControllerPress {
        guild_id,
        message_id: reaction.message_id,
        user_id: member.user.id,
        bot: member.user.bot,
        permissions,
        emoji: reaction.emoji.clone(),
    };

    if controller_pressed(&data.sessions, &data.config.owners, press).await {
        // the button stays usable for the next press
        if let Err(e) = reaction.delete(&ctx.http).await {
            debug!("unable to remove reaction: {e}");
        }
    }
}
