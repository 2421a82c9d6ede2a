//! Constants for testing.
#![allow(dead_code, reason = "These may be used at any times")]

use poise::serenity_prelude as serenity;

pub const GUILD_ID_1: serenity::GuildId = serenity::GuildId::new(594465820151644180);
pub const GUILD_ID_2: serenity::GuildId = serenity::GuildId::new(594465820151644190);
pub const GUILD_ID_3: serenity::GuildId = serenity::GuildId::new(594465820151644200);
pub const CHANNEL_ID_1: serenity::ChannelId = serenity::ChannelId::new(888730479770091571);
pub const CHANNEL_ID_2: serenity::ChannelId = serenity::ChannelId::new(888730479770091572);
pub const VOICE_CHANNEL_ID_1: serenity::ChannelId = serenity::ChannelId::new(888730479770091581);
pub const BOT_ID: serenity::UserId = serenity::UserId::new(594465820151644170);
pub const USER_ID_1: serenity::UserId = serenity::UserId::new(594465820151644181);
pub const USER_ID_2: serenity::UserId = serenity::UserId::new(594465820151644182);
pub const USER_ID_3: serenity::UserId = serenity::UserId::new(594465820151644183);
pub const USER_ID_4: serenity::UserId = serenity::UserId::new(594465820151644184);
pub const COMMAND_1: &str = "test_command";
