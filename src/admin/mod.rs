//! Commands reserved for server managers.
use tracing::info;

use crate::{utils::get_guild_id, CommandResult, Commands, Context};

pub fn admin_commands() -> Commands {
    vec![command()]
}

/// Commands that must always stay usable.
const PROTECTED_COMMANDS: &[&str] = &["command", "help"];

/// The registered command name `name` refers to, aliases included.
fn resolve_command(ctx: Context<'_>, name: &str) -> Option<String> {
    let name = name.trim().to_lowercase();
    ctx.framework()
        .options()
        .commands
        .iter()
        .find(|command| command.name == name || command.aliases.iter().any(|alias| *alias == name))
        .map(|command| command.name.clone())
}

/// Turn commands on or off in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("disable", "enable"),
    subcommand_required,
    required_permissions = "MANAGE_GUILD",
    category = "Admin Commands"
)]
pub async fn command(_ctx: Context<'_>) -> CommandResult {
    Ok(())
}

/// Disable a command in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Admin Commands"
)]
pub async fn disable(ctx: Context<'_>, #[description = "Command name"] name: String) -> CommandResult {
    let guild_id = get_guild_id(ctx)?;
    let Some(command) = resolve_command(ctx, &name) else {
        ctx.reply(format!("There is no command called `{name}`.")).await?;
        return Ok(());
    };
    if PROTECTED_COMMANDS.contains(&command.as_str()) {
        ctx.reply(format!("`{command}` cannot be disabled.")).await?;
        return Ok(());
    }

    let disabled = ctx
        .data()
        .data_manager
        .guild_settings()
        .disable_command(guild_id, &command)
        .await?;
    if disabled {
        info!("command {command} disabled in guild {guild_id}");
        ctx.reply(format!("`{command}` has been disabled.")).await?;
    } else {
        ctx.reply(format!("`{command}` is already disabled.")).await?;
    }
    Ok(())
}

/// Enable a previously disabled command in this server.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    category = "Admin Commands"
)]
pub async fn enable(ctx: Context<'_>, #[description = "Command name"] name: String) -> CommandResult {
    let guild_id = get_guild_id(ctx)?;
    let command = resolve_command(ctx, &name).unwrap_or(name);

    let enabled = ctx
        .data()
        .data_manager
        .guild_settings()
        .enable_command(guild_id, &command)
        .await?;
    if enabled {
        info!("command {command} enabled in guild {guild_id}");
        ctx.reply(format!("`{command}` has been enabled.")).await?;
    } else {
        ctx.reply(format!("`{command}` is not disabled.")).await?;
    }
    Ok(())
}
