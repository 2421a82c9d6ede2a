//! The reaction driven controller message.

use std::time::Duration;

use poise::serenity_prelude as serenity;
use serenity::Mentionable;
use strum::{EnumIter, IntoEnumIterator};

/// Everything the controller message shows, detached from any chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerView {
    pub guild_id: serenity::GuildId,
    pub voice_channel_id: Option<serenity::ChannelId>,
    pub title: String,
    pub uri: String,
    pub thumbnail: Option<String>,
    pub length: String,
    pub queue_len: usize,
    pub volume: u8,
    pub paused: bool,
    pub requester: serenity::UserId,
    pub dj: serenity::UserId,
}

/// Reaction buttons on the controller, in the order they are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum ControllerAction {
    Resume,
    Pause,
    Stop,
    Skip,
    Shuffle,
    VolumeUp,
    VolumeDown,
    Queue,
}

impl ControllerAction {
    pub fn emoji(&self) -> &'static str {
        match self {
            ControllerAction::Resume => "\u{25B6}",
            ControllerAction::Pause => "\u{23F8}",
            ControllerAction::Stop => "\u{23F9}",
            ControllerAction::Skip => "\u{23ED}",
            ControllerAction::Shuffle => "\u{1F500}",
            ControllerAction::VolumeUp => "\u{2795}",
            ControllerAction::VolumeDown => "\u{2796}",
            ControllerAction::Queue => "\u{1F1F6}",
        }
    }

    /// Maps a reaction back to its action. The emoji presentation selector is ignored.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        let emoji = emoji.trim_end_matches('\u{FE0F}');
        Self::iter().find(|action| action.emoji() == emoji)
    }

    pub fn from_reaction(reaction: &serenity::ReactionType) -> Option<Self> {
        match reaction {
            serenity::ReactionType::Unicode(emoji) => Self::from_emoji(emoji),
            _ => None,
        }
    }

    pub fn reaction(&self) -> serenity::ReactionType {
        serenity::ReactionType::Unicode(self.emoji().to_string())
    }
}

pub fn controller_embed(
    view: &ControllerView,
    voice_channel_name: &str,
    colour: serenity::Colour,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Music Controller | {voice_channel_name}"))
        .colour(colour)
        .description(format!("Now Playing:\n**`{}`**\n\n", view.title))
        .field("Duration", &view.length, true)
        .field("Queue Length", view.queue_len.to_string(), true)
        .field("Volume", format!("**`{}%`**", view.volume), true)
        .field("Requested By", view.requester.mention().to_string(), true)
        .field("DJ", view.dj.mention().to_string(), true)
        .field("Video URL", format!("[Click Here!]({})", view.uri), true);
    if view.paused {
        embed = embed.footer(serenity::CreateEmbedFooter::new("Paused"));
    }
    if let Some(thumbnail) = &view.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

pub const QUEUE_PAGE_SIZE: usize = 8;

/// Splits the upcoming titles into numbered pages.
pub fn queue_pages<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let entries = titles
        .into_iter()
        .enumerate()
        .map(|(index, title)| format!("`{}.` **`{}`**", index + 1, title))
        .collect::<Vec<_>>();
    entries
        .chunks(QUEUE_PAGE_SIZE)
        .map(|page| page.join("\n"))
        .collect()
}

/// How long short lived notices stay in the channel.
pub const NOTICE_LIFETIME: Duration = Duration::from_secs(15);
