//! Manage the database connection.
//!
//! The manager owns the connection pool and hands out the smaller managers for each concern.
pub mod guild_settings;
pub mod profile;

use guild_settings::GuildSettingsManager;
use migration::{Migrator, MigratorTrait};
use poise::serenity_prelude as serenity;
use profile::ProfileManager;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::debug;

use error::DataError;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Clone, Debug)]
pub struct DataManager {
    profiles: ProfileManager,
    guild_settings: GuildSettingsManager,
}

impl DataManager {
    /// Connects to the database and upgrades it to the latest schema.
    pub async fn new(db_url: &str) -> DataResult<Self> {
        let mut connect_options = ConnectOptions::new(db_url);
        connect_options.sqlx_logging(false);
        let db: DatabaseConnection = Database::connect(connect_options)
            .await
            .map_err(|error| DataError::DatabaseConnectionError { error })?;
        Migrator::up(&db, None)
            .await
            .map_err(|error| DataError::MigrationError { error })?; // always upgrade db to the latest version

        Ok(Self {
            profiles: ProfileManager::new(db.clone()),
            guild_settings: GuildSettingsManager::new(db),
        })
    }

    pub fn profiles(&self) -> ProfileManager {
        self.profiles.clone()
    }

    pub fn guild_settings(&self) -> GuildSettingsManager {
        self.guild_settings.clone()
    }

    /// Log a command call. Increments the user's command counter.
    pub async fn log_command_call(
        &self,
        user_id: serenity::UserId,
        command_name: &str,
    ) -> DataResult<()> {
        debug!("logging call of {command_name} by {user_id}");
        self.profiles.increment_commands_used(user_id).await
    }
}

pub mod error {
    use sea_orm::DbErr;

    use crate::error::ErrorName;

    #[derive(thiserror::Error, miette::Diagnostic, Debug)]
    pub enum DataError {
        #[error("Error connecting to database: {error}")]
        DatabaseConnectionError { error: DbErr },
        #[error("Error performing migration: {error}")]
        MigrationError { error: DbErr },
        #[error("Database error in operation {operation}: {error}")]
        DatabaseError { operation: String, error: DbErr },
    }

    impl ErrorName for DataError {
        fn name(&self) -> String {
            let name = match self {
                DataError::DatabaseConnectionError { .. } => "database_connection_error",
                DataError::MigrationError { .. } => "migration_error",
                DataError::DatabaseError { .. } => "database_error",
            };
            format!("data::{name}")
        }
    }

    impl DataError {
        pub(crate) fn op(operation: &str) -> impl FnOnce(DbErr) -> DataError + '_ {
            move |error| DataError::DatabaseError {
                operation: operation.to_string(),
                error,
            }
        }
    }
}
