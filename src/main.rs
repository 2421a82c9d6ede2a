use agb_discord_bot::{client, config::BotConfig};
use anyhow::Context as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // DISCORD_TOKEN_FILE is searched first, then DISCORD_TOKEN. Same for DATABASE_URL.
    let config = BotConfig::from_env().context("Invalid configuration")?;

    let mut client = client(config).await?;
    client
        .start_autosharded()
        .await
        .context("Client stopped with an error")
}
