pub mod evidence;
pub mod job;
pub mod revoked_token;
pub mod summary;
pub mod user;
pub mod user_settings;
