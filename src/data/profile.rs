//! User profiles: command counter, bio, economy and badges.

use entity::prelude::*;
use poise::serenity_prelude as serenity;
use sea_orm::{prelude::*, sea_query::OnConflict, ActiveValue, DatabaseConnection, IntoActiveModel};
use strum::{EnumIter, IntoEnumIterator};

use super::{error::DataError, DataResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum Badge {
    Developer,
    Admin,
    Moderator,
    Partner,
    Support,
    Friend,
}

impl Badge {
    pub fn emoji(&self) -> &'static str {
        match self {
            Badge::Developer => "\u{1F6E0}\u{FE0F}",
            Badge::Admin => "\u{1F6E1}\u{FE0F}",
            Badge::Moderator => "\u{1F528}",
            Badge::Partner => "\u{1F91D}",
            Badge::Support => "\u{1F4AC}",
            Badge::Friend => "\u{1F496}",
        }
    }

    fn held_in(&self, model: &entity::badges::Model) -> bool {
        match self {
            Badge::Developer => model.developer,
            Badge::Admin => model.admin,
            Badge::Moderator => model.moderator,
            Badge::Partner => model.partner,
            Badge::Support => model.support,
            Badge::Friend => model.friend,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub commands_used: i64,
    pub bio: Option<String>,
    pub balance: i64,
    pub bank: i64,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone)]
pub struct ProfileManager {
    db: DatabaseConnection,
}

impl ProfileManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Bumps the counter in a single upsert, creating the row on first use.
    pub async fn increment_commands_used(&self, user_id: serenity::UserId) -> DataResult<()> {
        const OP: &str = "increment_commands_used";
        use entity::users;

        let user = users::ActiveModel {
            user_id: ActiveValue::Set(user_id.get() as i64),
            commands_used: ActiveValue::Set(1),
            bio: ActiveValue::Set(None),
        };
        Users::insert(user)
            .on_conflict(
                OnConflict::column(users::Column::UserId)
                    .value(
                        users::Column::CommandsUsed,
                        Expr::col(users::Column::CommandsUsed).add(1),
                    )
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        Ok(())
    }

    pub async fn set_bio(&self, user_id: serenity::UserId, bio: String) -> DataResult<()> {
        const OP: &str = "set_bio";
        use entity::users;

        let user = Users::find_by_id(user_id.get() as i64)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;

        if let Some(user) = user {
            let mut model = user.into_active_model();
            model.bio = ActiveValue::set(Some(bio));
            model.save(&self.db).await.map_err(DataError::op(OP))?;
        } else {
            users::ActiveModel {
                user_id: ActiveValue::Set(user_id.get() as i64),
                commands_used: ActiveValue::Set(0),
                bio: ActiveValue::Set(Some(bio)),
            }
            .insert(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        }
        Ok(())
    }

    /// Collects the profile of a user. Missing rows read as zeroes.
    pub async fn get_profile(&self, user_id: serenity::UserId) -> DataResult<Profile> {
        const OP: &str = "get_profile";
        let id = user_id.get() as i64;

        let user = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        let economy = UserEconomy::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;
        let badges = Badges::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(DataError::op(OP))?;

        let mut profile = Profile::default();
        if let Some(user) = user {
            profile.commands_used = user.commands_used;
            profile.bio = user.bio;
        }
        if let Some(economy) = economy {
            profile.balance = economy.balance;
            profile.bank = economy.bank;
        }
        if let Some(badges) = badges {
            profile.badges = Badge::iter().filter(|b| b.held_in(&badges)).collect();
        }
        Ok(profile)
    }
}
