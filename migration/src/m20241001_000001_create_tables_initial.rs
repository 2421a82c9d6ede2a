use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(big_integer(Users::UserId).primary_key())
                    .col(big_integer(Users::CommandsUsed).default(0))
                    .col(string_null(Users::Bio))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserEconomy::Table)
                    .if_not_exists()
                    .col(big_integer(UserEconomy::UserId).primary_key())
                    .col(big_integer(UserEconomy::Balance).default(0))
                    .col(big_integer(UserEconomy::Bank).default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Badges::Table)
                    .if_not_exists()
                    .col(big_integer(Badges::UserId).primary_key())
                    .col(boolean(Badges::Developer).default(false))
                    .col(boolean(Badges::Admin).default(false))
                    .col(boolean(Badges::Moderator).default(false))
                    .col(boolean(Badges::Partner).default(false))
                    .col(boolean(Badges::Support).default(false))
                    .col(boolean(Badges::Friend).default(false))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserEconomy::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Badges::Table).to_owned())
            .await
    }
}

/// Per user profile data
#[derive(DeriveIden)]
enum Users {
    Table,
    UserId,
    CommandsUsed,
    Bio,
}

#[derive(DeriveIden)]
enum UserEconomy {
    Table,
    UserId,
    Balance,
    Bank,
}

/// Badges shown on profiles
#[derive(DeriveIden)]
enum Badges {
    Table,
    UserId,
    Developer,
    Admin,
    Moderator,
    Partner,
    Support,
    Friend,
}
