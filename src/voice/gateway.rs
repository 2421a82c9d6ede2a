//! The chat side of a session: controller messages, notices and the voice roster.

use std::{sync::Arc, time::Duration};

use poise::serenity_prelude::{self as serenity, async_trait};
use strum::IntoEnumIterator;
use tracing::debug;

use super::controller::{controller_embed, ControllerAction, ControllerView};
use crate::utils::OptionExt;

/// A member currently connected to a voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterMember {
    pub user_id: serenity::UserId,
    pub bot: bool,
}

/// A plain text reply, optionally removed after a while.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub content: String,
    pub delete_after: Option<Duration>,
}

impl Notice {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            delete_after: None,
        }
    }

    pub fn fleeting(content: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            content: content.into(),
            delete_after: Some(lifetime),
        }
    }
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_controller(
        &self,
        channel_id: serenity::ChannelId,
        view: &ControllerView,
    ) -> serenity::Result<serenity::MessageId>;

    async fn edit_controller(
        &self,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
        view: &ControllerView,
    ) -> serenity::Result<()>;

    async fn delete_message(
        &self,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
    ) -> serenity::Result<()>;

    /// Ids of the newest `limit` messages in the channel, newest first.
    async fn recent_message_ids(
        &self,
        channel_id: serenity::ChannelId,
        limit: u8,
    ) -> serenity::Result<Vec<serenity::MessageId>>;

    async fn say(&self, channel_id: serenity::ChannelId, notice: &Notice) -> serenity::Result<()>;

    fn voice_members(
        &self,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Vec<RosterMember>;
}

pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    colour: serenity::Colour,
}

impl SerenityGateway {
    pub fn new(http: Arc<serenity::Http>, cache: Arc<serenity::Cache>, colour: serenity::Colour) -> Self {
        Self { http, cache, colour }
    }

    fn render(&self, view: &ControllerView) -> serenity::CreateEmbed {
        let channel_name = view.voice_channel_id.and_then(|channel_id| {
            self.cache
                .guild(view.guild_id)
                .and_then(|guild| guild.channels.get(&channel_id).map(|c| c.name.clone()))
        });
        controller_embed(view, &channel_name.unwrap_or_unknown(), self.colour)
    }
}

#[async_trait]
impl ChatGateway for SerenityGateway {
    async fn send_controller(
        &self,
        channel_id: serenity::ChannelId,
        view: &ControllerView,
    ) -> serenity::Result<serenity::MessageId> {
        let message = channel_id
            .send_message(&self.http, serenity::CreateMessage::new().embed(self.render(view)))
            .await?;
        for action in ControllerAction::iter() {
            if let Err(e) = message.react(&self.http, action.reaction()).await {
                debug!("unable to add the {action} button: {e}");
            }
        }
        Ok(message.id)
    }

    async fn edit_controller(
        &self,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
        view: &ControllerView,
    ) -> serenity::Result<()> {
        channel_id
            .edit_message(
                &self.http,
                message_id,
                serenity::EditMessage::new().embed(self.render(view)),
            )
            .await
            .map(|_| ())
    }

    async fn delete_message(
        &self,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
    ) -> serenity::Result<()> {
        channel_id.delete_message(&self.http, message_id).await
    }

    async fn recent_message_ids(
        &self,
        channel_id: serenity::ChannelId,
        limit: u8,
    ) -> serenity::Result<Vec<serenity::MessageId>> {
        let messages = channel_id
            .messages(&self.http, serenity::GetMessages::new().limit(limit))
            .await?;
        Ok(messages.into_iter().map(|m| m.id).collect())
    }

    async fn say(&self, channel_id: serenity::ChannelId, notice: &Notice) -> serenity::Result<()> {
        let message = channel_id.say(&self.http, &notice.content).await?;
        if let Some(lifetime) = notice.delete_after {
            let http = self.http.clone();
            tokio::spawn(async move {
                tokio::time::sleep(lifetime).await;
                if let Err(e) = message.delete(&http).await {
                    debug!("unable to delete notice {}: {e}", message.id);
                }
            });
        }
        Ok(())
    }

    fn voice_members(
        &self,
        guild_id: serenity::GuildId,
        channel_id: serenity::ChannelId,
    ) -> Vec<RosterMember> {
        let bot_id = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(guild_id) else {
            return vec![];
        };
        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .map(|state| {
                let bot = state
                    .member
                    .as_ref()
                    .map(|m| m.user.bot)
                    .or_else(|| guild.members.get(&state.user_id).map(|m| m.user.bot))
                    .unwrap_or(state.user_id == bot_id);
                RosterMember {
                    user_id: state.user_id,
                    bot,
                }
            })
            .collect()
    }
}
