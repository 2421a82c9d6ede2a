//! Profile commands.

use poise::serenity_prelude as serenity;

use crate::{data::profile::Profile, utils::thousands, CommandResult, Context};

/// The profile embed body.
pub fn profile_description(profile: &Profile) -> String {
    let badges = profile
        .badges
        .iter()
        .map(|badge| badge.emoji())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{badges}\n\n**\u{1F4B0} Economy Info**\n`Balance`: **${}**\n`Bank`: **${}**\n\n\
         **\u{1F4DC} Misc Info**\n`Commands Used`: **{}**\n\n**Overview**\n`User Bio`\n```{}```",
        thousands(profile.balance),
        thousands(profile.bank),
        profile.commands_used,
        profile.bio.as_deref().unwrap_or("No bio set.")
    )
}

/// Show your profile, or someone else's.
#[tracing::instrument(skip(ctx), fields(user_id = %ctx.author().id))]
#[poise::command(slash_command, prefix_command, category = "Profile", user_cooldown = 5)]
pub async fn profile(
    ctx: Context<'_>,
    #[description = "Whose profile to show"] user: Option<serenity::User>,
) -> CommandResult {
    ctx.defer().await?;
    let user = user.as_ref().unwrap_or_else(|| ctx.author());
    let profile = ctx.data().data_manager.profiles().get_profile(user.id).await?;

    let embed = serenity::CreateEmbed::new()
        .title(user.tag())
        .colour(ctx.data().config.embed_colour)
        .thumbnail(user.face())
        .description(profile_description(&profile));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set your profile bio.
#[poise::command(slash_command, prefix_command, category = "Profile", user_cooldown = 6)]
pub async fn bio(
    ctx: Context<'_>,
    #[description = "Your new bio"]
    #[rest]
    bio: Option<String>,
) -> CommandResult {
    let Some(bio) = bio.filter(|b| !b.trim().is_empty()) else {
        ctx.say(format!(
            "Please specify a bio. Usage: `{}bio <text>`",
            ctx.prefix()
        ))
        .await?;
        return Ok(());
    };

    ctx.data()
        .data_manager
        .profiles()
        .set_bio(ctx.author().id, bio.clone())
        .await?;
    let embed = serenity::CreateEmbed::new()
        .title("User Bio")
        .colour(ctx.data().config.embed_colour)
        .description(format!("Your bio has been set to: `{bio}`"));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
