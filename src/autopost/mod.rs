//! Periodic image posting into opted in, age restricted channels.
//!
//! Every cycle fetches one image and posts it to every configured channel through a webhook
//! owned by the bot, falling back to a plain message when the webhook is unavailable.

use std::{sync::Arc, time::Duration};

use poise::serenity_prelude as serenity;
use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
    checks::voter_only,
    config::{AutopostConfig, BotConfig, Links},
    data::DataManager,
    error::BotError,
    utils::get_guild_id,
    CommandResult, Commands, Context,
};

pub const WEBHOOK_NAME: &str = "AGB Autoposting";
const POST_SPACING: Duration = Duration::from_millis(50);

pub fn autopost_commands() -> Commands {
    vec![autopost()]
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: String,
}

async fn fetch_image_url(
    http: &reqwest::Client,
    api_base: &str,
    endpoints: &[String],
) -> Result<String, BotError> {
    let endpoint = endpoints
        .choose(&mut rand::thread_rng())
        .map(String::as_str)
        .unwrap_or("jpg");
    let url = format!("{}/{endpoint}", api_base.trim_end_matches('/'));
    let as_error = |error| BotError::HttpError {
        service: "the image api",
        error,
    };

    let image = http
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(as_error)?
        .json::<ImageResponse>()
        .await
        .map_err(as_error)?;
    Ok(image.url)
}

fn links_line(links: &Links) -> Option<String> {
    match (&links.invite, &links.support, &links.vote) {
        (Some(invite), Some(support), Some(vote)) => Some(format!(
            "[Add me]({invite}) | [Support]({support}) | [Vote]({vote})"
        )),
        _ => None,
    }
}

pub fn autopost_embed(
    links: &Links,
    colour: serenity::Colour,
    slow_note: bool,
    image_url: &str,
) -> serenity::CreateEmbed {
    let mut description = String::new();
    if slow_note {
        description.push_str(
            "Posting can be slow, please take into consideration how many servers this bot is in \
             and how many are using auto posting. Please be patient. If I completely stop \
             posting, please rerun the command or join the support server.\n",
        );
    }
    if let Some(line) = links_line(links) {
        description.push_str(&line);
    }
    serenity::CreateEmbed::new()
        .title("Enjoy your autopost")
        .description(description)
        .colour(colour)
        .image(image_url)
}

/// What to do with one configured channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    Skip,
    /// The channel lost its age restriction.
    Clear,
    Post,
}

/// `channel` is the cached guild and age restriction of the channel, if it is cached at all.
pub fn channel_action(
    channel: Option<(serenity::GuildId, bool)>,
    excluded: &[serenity::GuildId],
) -> ChannelAction {
    match channel {
        None => ChannelAction::Skip,
        Some((guild_id, _)) if excluded.contains(&guild_id) => ChannelAction::Skip,
        Some((_, false)) => ChannelAction::Clear,
        Some((_, true)) => ChannelAction::Post,
    }
}

/// Finds the bot's autopost webhook in the channel, replacing stray copies with a fresh one.
async fn webhook_for(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    bot_id: serenity::UserId,
) -> serenity::Result<serenity::Webhook> {
    let webhooks = channel_id.webhooks(http).await?;
    if let Some(webhook) = webhooks.iter().find(|webhook| {
        webhook.name.as_deref() == Some(WEBHOOK_NAME)
            && webhook.user.as_ref().map(|user| user.id) == Some(bot_id)
    }) {
        return Ok(webhook.clone());
    }

    for stray in webhooks
        .iter()
        .filter(|webhook| webhook.name.as_deref() == Some(WEBHOOK_NAME))
    {
        if let Err(e) = stray.delete(http).await {
            debug!("unable to delete stray webhook in {channel_id}: {e}");
        }
    }
    channel_id
        .create_webhook(http, serenity::CreateWebhook::new(WEBHOOK_NAME))
        .await
}

async fn post(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    bot_id: serenity::UserId,
    avatar: &str,
    embed: serenity::CreateEmbed,
) -> serenity::Result<()> {
    match webhook_for(http, channel_id, bot_id).await {
        Ok(webhook) => {
            webhook
                .execute(
                    http,
                    false,
                    serenity::ExecuteWebhook::new().embed(embed).avatar_url(avatar),
                )
                .await?;
        }
        Err(e) => {
            debug!("no webhook in {channel_id}, sending directly: {e}");
            channel_id
                .send_message(http, serenity::CreateMessage::new().embed(embed))
                .await?;
        }
    }
    Ok(())
}

/// Outcome counts of one posting cycle.
#[derive(Debug, Default, PartialEq, Eq)]
struct Batch {
    posted: usize,
    failed: usize,
}

impl Batch {
    fn record<T>(&mut self, result: &serenity::Result<T>) {
        match result {
            Ok(_) => self.posted += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub struct Autoposter {
    pub http: Arc<serenity::Http>,
    pub cache: Arc<serenity::Cache>,
    pub client: reqwest::Client,
    pub data_manager: DataManager,
    pub config: Arc<BotConfig>,
}

impl Autoposter {
    /// Starts the posting loop. Does nothing unless an image api is configured.
    pub fn spawn(self) {
        let AutopostConfig {
            api_base, interval, ..
        } = &self.config.autopost;
        let Some(api_base) = api_base.clone() else {
            info!("autoposting is disabled, no image api configured");
            return;
        };
        let interval = *interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.cycle(&api_base).await;
            }
        });
    }

    async fn image_url(&self, api_base: &str) -> Option<String> {
        let endpoints = &self.config.autopost.endpoints;
        match fetch_image_url(&self.client, api_base, endpoints).await {
            Ok(url) => return Some(url),
            Err(e) => error!("autoposting: unable to fetch an image, retrying: {e}"),
        }
        match fetch_image_url(&self.client, api_base, endpoints).await {
            Ok(url) => Some(url),
            Err(e) => {
                error!("autoposting: unable to fetch an image, skipping this cycle: {e}");
                None
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn cycle(&self, api_base: &str) {
        info!("starting autoposting");
        let Some(image_url) = self.image_url(api_base).await else {
            return;
        };
        let slow_note = rand::thread_rng().gen_range(1..=10) == 3;
        let embed = autopost_embed(
            &self.config.links,
            self.config.embed_colour,
            slow_note,
            &image_url,
        );

        let settings = self.data_manager.guild_settings();
        let channels = match settings.autopost_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                error!("autoposting: unable to read channels: {e}");
                return;
            }
        };
        let (bot_id, avatar) = {
            let user = self.cache.current_user();
            (user.id, user.face())
        };

        let mut batch = Batch::default();
        for channel_id in channels {
            let cached = self
                .cache
                .channel(channel_id)
                .map(|channel| (channel.guild_id, channel.nsfw));
            match channel_action(cached, &self.config.autopost.excluded_guilds) {
                ChannelAction::Skip => continue,
                ChannelAction::Clear => {
                    if let Err(e) = settings.clear_autopost_channel(channel_id).await {
                        error!("autoposting: unable to clear {channel_id}: {e}");
                    } else if let Some((guild_id, _)) = cached {
                        warn!("{guild_id} is no longer age restricted, removed its autopost channel");
                    }
                }
                ChannelAction::Post => {
                    let result = post(&self.http, channel_id, bot_id, &avatar, embed.clone()).await;
                    if let Err(e) = &result {
                        error!("autoposting error in {channel_id}: {e}");
                    }
                    batch.record(&result);
                    tokio::time::sleep(POST_SPACING).await;
                }
            }
        }
        info!(
            "autoposting - posted batch: {} ({} failed)",
            batch.posted, batch.failed
        );
    }
}

/// Manage autoposting in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("set", "clear"),
    subcommand_required,
    required_permissions = "MANAGE_GUILD",
    category = "Autoposting"
)]
pub async fn autopost(_ctx: Context<'_>) -> CommandResult {
    Ok(())
}

/// Post images into an age restricted channel.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    check = "voter_only",
    category = "Autoposting"
)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "An age restricted text channel"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> CommandResult {
    let guild_id = get_guild_id(ctx)?;
    if ctx.data().config.autopost.api_base.is_none() {
        return Err(BotError::NotConfigured("AUTOPOST_API_BASE"));
    }
    if !channel.nsfw {
        return Err(BotError::ChannelNotAgeRestricted(channel.id));
    }

    ctx.data()
        .data_manager
        .guild_settings()
        .set_autopost_channel(guild_id, Some(channel.id))
        .await?;
    info!("autoposting set to {} in guild {guild_id}", channel.id);
    ctx.reply(format!("Autoposting will now happen in <#{}>.", channel.id))
        .await?;
    Ok(())
}

/// Stop autoposting in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    check = "voter_only",
    category = "Autoposting"
)]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    let guild_id = get_guild_id(ctx)?;
    ctx.data()
        .data_manager
        .guild_settings()
        .set_autopost_channel(guild_id, None)
        .await?;
    ctx.reply("Autoposting has been turned off.").await?;
    Ok(())
}
