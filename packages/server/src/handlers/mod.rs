pub mod account;
pub mod auth;
pub mod evidence;
pub mod job;
pub mod meta;
pub mod summary;
