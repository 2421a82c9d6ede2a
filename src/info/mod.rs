//! General information and utility commands.
use std::time::Instant;

use poise::serenity_prelude::{self as serenity, Mentionable};
use serde::Deserialize;
use time::{macros::format_description, PrimitiveDateTime};
use tracing::debug;

use crate::{
    error::BotError,
    utils::{draw_box, thousands},
    CommandResult, Commands, Context,
};

pub mod profile;

pub fn info_commands() -> Commands {
    vec![
        ping(),
        about(),
        invite(),
        support(),
        vote(),
        policy(),
        weather(),
        f2c(),
        c2f(),
        timestamp(),
        say(),
        servers(),
        profile::profile(),
        profile::bio(),
    ]
}

const FILLED_CELL: &str = ":blue_square:";
const EMPTY_CELL: &str = ":black_large_square:";

/// The standard embed: bot name and avatar as author, configured colour.
fn base_embed(ctx: Context<'_>) -> serenity::CreateEmbed {
    let (name, avatar) = {
        let user = ctx.cache().current_user();
        (user.name.clone(), user.face())
    };
    serenity::CreateEmbed::new()
        .colour(ctx.data().config.embed_colour)
        .author(serenity::CreateEmbedAuthor::new(name).icon_url(avatar))
        .timestamp(serenity::Timestamp::now())
}

fn link(url: &Option<String>, key: &'static str) -> Result<String, BotError> {
    url.clone().ok_or(BotError::NotConfigured(key))
}

fn made_by(ctx: Context<'_>) -> String {
    ctx.data()
        .config
        .owners
        .iter()
        .map(|owner| owner.mention().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pong! Shows REST and gateway latency.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 5)]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let before = Instant::now();
    let handle = ctx.say("Ping ").await?;
    let rest = before.elapsed();
    let gateway = ctx.ping().await;

    let embed = base_embed(ctx)
        .field("REST", format!("{}ms", rest.as_millis()), true)
        .field("WS", format!("{}ms", gateway.as_millis()), true);
    handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .content("Ping \u{af}\\_(\u{30c4})_/\u{af}")
                .embed(embed),
        )
        .await?;
    Ok(())
}

/// Process memory in megabytes and global cpu usage in percent.
async fn usage(ctx: Context<'_>) -> (f64, f32) {
    {
        let mut system = ctx.data().system_info();
        system.refresh_cpu_usage();
    }
    // cpu usage is measured between two refreshes
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

    let mut system = ctx.data().system_info();
    system.refresh_cpu_usage();
    let memory = match sysinfo::get_current_pid() {
        Ok(pid) => {
            system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
            system.process(pid).map(|p| p.memory()).unwrap_or_default()
        }
        Err(e) => {
            debug!("unable to find own pid: {e}");
            0
        }
    };
    (memory as f64 / 1024.0 / 1024.0, system.global_cpu_usage())
}

/// About the bot.
#[poise::command(
    slash_command,
    prefix_command,
    aliases("info", "stats", "status"),
    category = "Information",
    user_cooldown = 5
)]
pub async fn about(ctx: Context<'_>) -> CommandResult {
    ctx.defer().await?;
    let (ram, cpu) = usage(ctx).await;
    let (guilds, users) = {
        let cache = ctx.cache();
        (cache.guild_count(), cache.user_count())
    };
    let commands = ctx.framework().options().commands.len();
    let links = &ctx.data().config.links;

    let performance = format!(
        "`RAM Usage: {ram:.2}MB / 1GB scale`\n{}\n`CPU Usage: {cpu:.1}%`\n{}",
        draw_box(ram / 10.0, FILLED_CELL, EMPTY_CELL),
        draw_box(f64::from(cpu), FILLED_CELL, EMPTY_CELL)
    );
    let mut embed = base_embed(ctx)
        .field("Programmers", made_by(ctx), true)
        .field("Performance Overview", performance, false)
        .field(
            "Guild Information",
            format!(
                "```py\n{guilds} Guilds are visible,\nI can see {} users.\n```",
                thousands(users as i64)
            ),
            false,
        )
        .field(
            "Bot Information",
            format!(
                "```py\nLatency: {}ms\nLoaded CMDs: {commands}\n```",
                ctx.ping().await.as_millis()
            ),
            false,
        );
    if let (Some(invite), Some(support), Some(vote)) = (&links.invite, &links.support, &links.vote)
    {
        embed = embed.field(
            "\u{2800}",
            format!("[Add me]({invite}) | [Support]({support}) | [Vote]({vote})"),
            false,
        );
    }

    let bot_name = ctx.cache().current_user().name.clone();
    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "\u{2139} About **{bot_name}** | **{}**",
                env!("CARGO_PKG_VERSION")
            ))
            .embed(embed),
    )
    .await?;
    Ok(())
}

/// Invite the bot to your server.
#[poise::command(
    slash_command,
    prefix_command,
    aliases("joinme", "botinvite"),
    category = "Information",
    user_cooldown = 5
)]
pub async fn invite(ctx: Context<'_>) -> CommandResult {
    let links = &ctx.data().config.links;
    let invite = link(&links.invite, "INVITE_URL")?;
    let mut embed = base_embed(ctx).field("Bot Invite", format!("[Invite Me!]({invite})"), true);
    if let Some(support) = &links.support {
        embed = embed.field("Support Server", format!("[Join Our Server!!]({support})"), true);
    }
    embed = embed.field("Made with love by:", made_by(ctx), false);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Join the support server.
#[poise::command(
    slash_command,
    prefix_command,
    aliases("supportserver", "feedbackserver"),
    category = "Information",
    user_cooldown = 5
)]
pub async fn support(ctx: Context<'_>) -> CommandResult {
    let support = link(&ctx.data().config.links.support, "SUPPORT_URL")?;
    let embed = base_embed(ctx).field("You can join here:", format!("[Click Here.]({support})"), false);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Vote for the bot.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 3)]
pub async fn vote(ctx: Context<'_>) -> CommandResult {
    let vote = link(&ctx.data().config.links.vote, "VOTE_URL")?;
    let embed = base_embed(ctx)
        .field("Thank You!", format!("[Click Me]({vote})"), true)
        .field("Made with love by:", made_by(ctx), false);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Read the privacy policy.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 5)]
pub async fn policy(ctx: Context<'_>) -> CommandResult {
    let links = &ctx.data().config.links;
    let policy = link(&links.policy, "POLICY_URL")?;
    let mut embed = base_embed(ctx).field(
        "Direct Link To The Privacy Policy",
        format!("[Click Here]({policy})"),
        false,
    );
    if let Some(support) = &links.support {
        embed = embed.field(
            "Support If You Have More Questions",
            format!("[Click Here To Join]({support})"),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: Option<WeatherMain>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct WeatherMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    feels_like: f64,
}

fn weather_embed(
    location: &str,
    main: Option<&WeatherMain>,
    colour: serenity::Colour,
) -> serenity::CreateEmbed {
    match main {
        Some(main) => serenity::CreateEmbed::new()
            .title(format!("{location} Weather"))
            .description(format!("Here is the weather data for {location}."))
            .colour(colour)
            .field("Temperature", format!("{}\u{b0} F", main.temp), false)
            .field("Minimum temperature", format!("{}\u{b0} F", main.temp_min), false)
            .field("Maximum temperature", format!("{}\u{b0} F", main.temp_max), false)
            .field("Feels like", format!("{}\u{b0} F", main.feels_like), false),
        None => serenity::CreateEmbed::new()
            .title("Error caught!")
            .description(format!(
                "There was an error finding weather data for {location}."
            ))
            .colour(serenity::Colour::RED),
    }
}

/// Current weather for a location.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id))]
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 3)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "City name"]
    #[rest]
    location: String,
) -> CommandResult {
    let data = ctx.data();
    let key = data
        .config
        .weather_api_key
        .as_deref()
        .ok_or(BotError::NotConfigured("WEATHER_API_KEY"))?;
    ctx.defer().await?;

    let response = data
        .http
        .get("http://api.openweathermap.org/data/2.5/weather")
        .query(&[
            ("q", location.to_lowercase().as_str()),
            ("appid", key),
            ("units", "imperial"),
        ])
        .send()
        .await
        .map_err(|error| BotError::HttpError {
            service: "OpenWeatherMap",
            error,
        })?;
    let weather = response
        .json::<WeatherResponse>()
        .await
        .map_err(|error| BotError::HttpError {
            service: "OpenWeatherMap",
            error,
        })?;

    let embed = weather_embed(&location, weather.main.as_ref(), data.config.embed_colour);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    round2((fahrenheit - 32.0) * 5.0 / 9.0)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round2(celsius * 9.0 / 5.0 + 32.0)
}

/// Convert fahrenheit to celsius.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 3)]
pub async fn f2c(ctx: Context<'_>, #[description = "Temperature in \u{b0}F"] temp: f64) -> CommandResult {
    ctx.say(format!("{temp}\u{b0}F is {}\u{b0}C", fahrenheit_to_celsius(temp)))
        .await?;
    Ok(())
}

/// Convert celsius to fahrenheit.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 3)]
pub async fn c2f(ctx: Context<'_>, #[description = "Temperature in \u{b0}C"] temp: f64) -> CommandResult {
    ctx.say(format!("{temp}\u{b0}C is {}\u{b0}F", celsius_to_fahrenheit(temp)))
        .await?;
    Ok(())
}

/// Unix timestamp of `MM/DD/YYYY` and an optional `HH:MM:SS`, read as UTC. Midnight without a
/// time.
pub fn parse_timestamp(date: &str, time: Option<&str>) -> Result<i64, BotError> {
    let input = format!("{date} {}", time.unwrap_or("00:00:00"));
    let format = format_description!(
        "[month padding:none]/[day padding:none]/[year] [hour padding:none]:[minute]:[second]"
    );
    PrimitiveDateTime::parse(&input, format)
        .map(|datetime| datetime.assume_utc().unix_timestamp())
        .map_err(|_| BotError::InvalidTimestamp(input))
}

pub fn timestamp_styles(unix: i64) -> String {
    [
        ("Short Time", 't'),
        ("Long Time", 'T'),
        ("Short Date", 'd'),
        ("Long Date", 'D'),
        ("Short Date/Time", 'f'),
        ("Long Date/Time", 'F'),
        ("Relative Time", 'R'),
    ]
    .iter()
    .map(|(name, style)| format!("{name}: <t:{unix}:{style}> | \\<t:{unix}:{style}>"))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Show a date in every Discord timestamp format. Example: 12/22/2005 02:20:00
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 5)]
pub async fn timestamp(
    ctx: Context<'_>,
    #[description = "MM/DD/YYYY"] date: String,
    #[description = "HH:MM:SS, midnight when left out"] time: Option<String>,
) -> CommandResult {
    let unix = parse_timestamp(&date, time.as_deref())?;
    let embed = serenity::CreateEmbed::new()
        .title("Here's the timestamp you asked for")
        .colour(ctx.data().config.embed_colour)
        .description(timestamp_styles(unix));
    ctx.send(poise::CreateReply::default().embed(embed).reply(true))
        .await?;
    Ok(())
}

/// Make the bot say something.
#[poise::command(slash_command, prefix_command, category = "Information", user_cooldown = 4)]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What to say"]
    #[rest]
    message: String,
) -> CommandResult {
    ctx.send(
        poise::CreateReply::default()
            .content(message)
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;
    Ok(())
}

/// Lists every guild the bot is in. Owner only.
#[poise::command(
    prefix_command,
    slash_command,
    owners_only,
    hide_in_help,
    aliases("guilds"),
    category = "Owner Commands"
)]
pub async fn servers(ctx: Context<'_>) -> CommandResult {
    let listing = {
        let cache = ctx.cache();
        cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| {
                cache.guild(guild_id).map(|guild| {
                    let bots = guild.members.values().filter(|m| m.user.bot).count();
                    format!(
                        "Guild Name:{}, Guild ID:{}, Server Members:{}, Bots: {bots}",
                        guild.name, guild.id, guild.member_count
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    ctx.send(
        poise::CreateReply::default()
            .content("Here is a list of all the servers I am in.")
            .attachment(serenity::CreateAttachment::bytes(
                listing.into_bytes(),
                "servers.txt",
            )),
    )
    .await?;
    Ok(())
}
