use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context as _, Result};
use poise::serenity_prelude as serenity;
use reqwest::Client as HttpClient;
use time::UtcOffset;
use tracing::{error, info, level_filters::LevelFilter, subscriber::set_global_default};
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt::time::OffsetTime, layer::SubscriberExt, EnvFilter};

use crate::{
    autopost::Autoposter,
    config::BotConfig,
    data::DataManager,
    voice::{
        engine::SongbirdEngine, events, gateway::SerenityGateway, session::SessionManager,
    },
};

pub mod admin;
pub mod autopost;
pub mod checks;
pub mod config;
#[cfg(test)]
pub mod constants;
pub mod data;
pub mod error;
pub mod info;
pub mod utils;
pub mod voice;

pub use error::BotError;

pub type Context<'a> = poise::Context<'a, Data, BotError>;
pub type Commands = Vec<poise::Command<Data, BotError>>;
pub type CommandResult = Result<(), BotError>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub config: Arc<BotConfig>,
    pub data_manager: DataManager,
    pub sessions: SessionManager,
    pub http: HttpClient,
    system_info: Mutex<sysinfo::System>,
}

impl Data {
    pub fn system_info(&self) -> MutexGuard<'_, sysinfo::System> {
        self.system_info
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn commands() -> Commands {
    let mut commands = vec![help()];
    commands.extend(voice::music_commands());
    commands.extend(info::info_commands());
    commands.extend(admin::admin_commands());
    commands.extend(autopost::autopost_commands());
    commands
}

/// Builds the discord client. Connects to the database on the way.
pub async fn client(config: BotConfig) -> Result<serenity::Client> {
    setup_logging()?;

    let data_manager = DataManager::new(&config.database_url)
        .await
        .context("Error connecting to the database")?;
    let config = Arc::new(config);
    let token = config.token.clone();

    let manager = songbird::Songbird::serenity();
    let manager_clone = manager.clone();
    let setup_config = config.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands(),
            owners: config.owners.iter().copied().collect(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                mention_as_prefix: true,
                case_insensitive_commands: true,
                ..Default::default()
            },
            pre_command: |ctx: Context<'_>| {
                Box::pin(async move {
                    let command_name = ctx.command().qualified_name.clone();
                    let author = ctx.author();
                    let channel_id = ctx.channel_id();
                    let guild_id = ctx.guild_id();
                    info!("Command \"{command_name}\" called from channel {channel_id} in guild {guild_id:?} by {} ({})", author.name, author.id);

                    if let Err(e) = ctx
                        .data()
                        .data_manager
                        .log_command_call(author.id, &command_name)
                        .await
                    {
                        error!("Error logging command call: {e}");
                    }
                })
            },
            command_check: Some(|ctx| Box::pin(checks::check_command_enabled(ctx))),
            on_error: |error| Box::pin(error::error_handler(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Setup...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let http = HttpClient::new();
                let gateway = SerenityGateway::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    setup_config.embed_colour,
                );
                let (engine, track_end) = SongbirdEngine::new(manager_clone, http.clone());
                let sessions = SessionManager::new(Arc::new(engine), Arc::new(gateway));
                sessions.listen_track_end(track_end);

                Autoposter {
                    http: ctx.http.clone(),
                    cache: ctx.cache.clone(),
                    client: http.clone(),
                    data_manager: data_manager.clone(),
                    config: setup_config.clone(),
                }
                .spawn();

                Ok(Data {
                    config: setup_config,
                    data_manager,
                    sessions,
                    http,
                    system_info: Mutex::new(sysinfo::System::new()),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    serenity::Client::builder(&token, intents)
        .voice_manager_arc(manager)
        .framework(framework)
        .await
        .context("Error creating client")
}

fn setup_logging() -> Result<()> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(OffsetTime::new(
                    offset,
                    time::format_description::well_known::Rfc3339,
                ))
                .with_thread_ids(true),
        )
        .with(ErrorLayer::default())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );
    set_global_default(registry)?;

    info!("log initialized with time offset {offset}");
    Ok(())
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, BotError>,
    data: &Data,
) -> Result<(), BotError> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            let bot_user_name = &data_about_bot.user.name;
            let session_id = &data_about_bot.session_id;
            info!(
                "Logged in as {} with session id {}.",
                bot_user_name, session_id
            );
        }
        serenity::FullEvent::CacheReady { guilds } => {
            info!("Cached guild info is ready for {} guilds.", guilds.len());
        }
        serenity::FullEvent::VoiceStateUpdate { new, .. } => {
            events::handle_voice_state_update(ctx, data, new).await;
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            events::handle_reaction_add(ctx, data, add_reaction).await;
        }
        _ => {}
    }
    Ok(())
}

/// Show the command list, or help for one command.
#[poise::command(slash_command, prefix_command, track_edits, category = "Information")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"] command: Option<String>,
) -> CommandResult {
    let configuration = poise::builtins::HelpConfiguration {
        extra_text_at_bottom: "Disabled commands reply with a notice instead of running.",
        ..Default::default()
    };
    poise::builtins::help(ctx, command.as_deref(), configuration).await?;
    Ok(())
}
