use poise::serenity_prelude as serenity;

use crate::{BotError, Context};

pub trait OptionExt<String> {
    fn unwrap_or_unknown(self) -> String;
}

impl OptionExt<String> for Option<String> {
    fn unwrap_or_unknown(self) -> String {
        self.unwrap_or_else(|| "Unknown".to_string())
    }
}

pub fn get_guild_id(ctx: Context<'_>) -> Result<serenity::GuildId, BotError> {
    ctx.guild_id().ok_or(BotError::NoGuildId)
}

pub fn get_guild_name(ctx: Context<'_>) -> Result<String, BotError> {
    Ok(get_guild_id(ctx)?
        .name(ctx)
        .unwrap_or("Unknown Guild".to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct GuildInfo {
    pub guild_name: String,
    pub guild_id: serenity::GuildId,
}

impl GuildInfo {
    pub fn from_ctx(ctx: Context<'_>) -> Result<Self, BotError> {
        let guild_id = get_guild_id(ctx)?;
        let guild_name = get_guild_name(ctx)?;
        Ok(Self {
            guild_name,
            guild_id,
        })
    }
}

/// Guild wide permissions of the invoking member, empty outside of guilds.
pub async fn author_permissions(ctx: Context<'_>) -> serenity::Permissions {
    let Some(member) = ctx.author_member().await else {
        return serenity::Permissions::empty();
    };
    ctx.guild()
        .map(|guild| guild.member_permissions(&member))
        .unwrap_or_else(serenity::Permissions::empty)
}

/// A row of ten emoji cells with `percent` rounded down to the nearest ten filled in.
pub fn draw_box(percent: f64, filled: &str, empty: &str) -> String {
    let cells = (percent.clamp(0.0, 100.0) / 10.0).floor() as usize;
    format!("{}{}", filled.repeat(cells), empty.repeat(10 - cells))
}

/// Formats a number with `,` as the thousands separator.
pub fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
