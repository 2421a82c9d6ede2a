use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GuildSettings::Table)
                    .if_not_exists()
                    .col(big_integer(GuildSettings::GuildId).primary_key())
                    .col(big_integer_null(GuildSettings::AutopostChannel))
                    .to_owned(),
            )
            .await?;

        // commands turned off by guild managers
        manager
            .create_table(
                Table::create()
                    .table(DisabledCommands::Table)
                    .if_not_exists()
                    .col(big_integer(DisabledCommands::GuildId))
                    .col(string(DisabledCommands::Command))
                    .primary_key(
                        Index::create()
                            .col(DisabledCommands::GuildId)
                            .col(DisabledCommands::Command),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuildSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DisabledCommands::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GuildSettings {
    Table,
    GuildId,
    AutopostChannel,
}

#[derive(DeriveIden)]
enum DisabledCommands {
    Table,
    GuildId,
    Command,
}
