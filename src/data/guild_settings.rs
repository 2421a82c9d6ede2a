//! Per guild settings: the autopost channel and disabled commands.

use entity::prelude::*;
use poise::serenity_prelude as serenity;
use sea_orm::{
    prelude::*, ActiveValue, DatabaseConnection, IntoActiveModel, QuerySelect,
};

use super::{error::DataError, DataResult};

#[derive(Debug, Clone)]
pub struct GuildSettingsManager {
    db: DatabaseConnection,
}

impl GuildSettingsManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All distinct channels configured for autoposting.
    pub async fn autopost_channels(&self) -> DataResult<Vec<serenity::ChannelId>> {
        const OP: &str = "autopost_channels";
        use entity::guild_settings;

        let channels: Vec<Option<i64>> = GuildSettings::find()
            .select_only()
            .column(guild_settings::Column::AutopostChannel)
            .filter(guild_settings::Column::AutopostChannel.is_not_null())
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(DataError::op(OP))?;

        Ok(channels
            .into_iter()
            .flatten()
            .filter(|id| *id != 0)
            .map(|id| serenity::ChannelId::new(id as u64))
            .collect())
    }

    pub async fn autopost_channel(
        &self,
        guild_id: serenity::GuildId,
    ) -> DataResult<Option<serenity::ChannelId>> {
        const OP: &str = "autopost_channel";
        let settings = GuildSettings::find_by_id(guild_id.get() as i64)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        Ok(settings
            .and_then(|s| s.autopost_channel)
            .filter(|id| *id != 0)
            .map(|id| serenity::ChannelId::new(id as u64)))
    }

    pub async fn set_autopost_channel(
        &self,
        guild_id: serenity::GuildId,
        channel_id: Option<serenity::ChannelId>,
    ) -> DataResult<()> {
        const OP: &str = "set_autopost_channel";
        use entity::guild_settings;

        let channel = channel_id.map(|c| c.get() as i64);
        let settings = GuildSettings::find_by_id(guild_id.get() as i64)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;

        if let Some(settings) = settings {
            let mut model = settings.into_active_model();
            model.autopost_channel = ActiveValue::set(channel);
            model.save(&self.db).await.map_err(DataError::op(OP))?;
        } else {
            guild_settings::ActiveModel {
                guild_id: ActiveValue::Set(guild_id.get() as i64),
                autopost_channel: ActiveValue::Set(channel),
            }
            .insert(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        }
        Ok(())
    }

    /// Clears the autopost setting of every guild pointing at `channel_id`.
    pub async fn clear_autopost_channel(&self, channel_id: serenity::ChannelId) -> DataResult<u64> {
        const OP: &str = "clear_autopost_channel";
        use entity::guild_settings;

        let result = GuildSettings::update_many()
            .col_expr(
                guild_settings::Column::AutopostChannel,
                Expr::value(Option::<i64>::None),
            )
            .filter(guild_settings::Column::AutopostChannel.eq(channel_id.get() as i64))
            .exec(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        Ok(result.rows_affected)
    }

    pub async fn is_command_disabled(
        &self,
        guild_id: serenity::GuildId,
        command: &str,
    ) -> DataResult<bool> {
        const OP: &str = "is_command_disabled";
        let found = DisabledCommands::find_by_id((guild_id.get() as i64, command.to_string()))
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        Ok(found.is_some())
    }

    /// Returns `false` if the command was already disabled.
    pub async fn disable_command(
        &self,
        guild_id: serenity::GuildId,
        command: &str,
    ) -> DataResult<bool> {
        const OP: &str = "disable_command";
        use entity::disabled_commands;

        if self.is_command_disabled(guild_id, command).await? {
            return Ok(false);
        }
        disabled_commands::ActiveModel {
            guild_id: ActiveValue::Set(guild_id.get() as i64),
            command: ActiveValue::Set(command.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(DataError::op(OP))?;
        Ok(true)
    }

    /// Returns `false` if the command was not disabled.
    pub async fn enable_command(
        &self,
        guild_id: serenity::GuildId,
        command: &str,
    ) -> DataResult<bool> {
        const OP: &str = "enable_command";
        let result = DisabledCommands::delete_by_id((guild_id.get() as i64, command.to_string()))
            .exec(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        Ok(result.rows_affected > 0)
    }
}
