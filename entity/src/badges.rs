//! handwritten

use sea_orm::entity::prelude::*;

/// Profile badges granted by the bot staff
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "badges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub developer: bool,
    pub admin: bool,
    pub moderator: bool,
    pub partner: bool,
    pub support: bool,
    pub friend: bool,
}

#[derive(Clone, Copy, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
