pub use super::badges::Entity as Badges;
pub use super::disabled_commands::Entity as DisabledCommands;
pub use super::guild_settings::Entity as GuildSettings;
pub use super::user_economy::Entity as UserEconomy;
pub use super::users::Entity as Users;
