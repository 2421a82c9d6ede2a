//! Database entities for the bot. Ids are stored as `i64` since SQLite has no unsigned 64 bit
//! integer type.

pub mod prelude;

pub mod badges;
pub mod disabled_commands;
pub mod guild_settings;
pub mod user_economy;
pub mod users;
