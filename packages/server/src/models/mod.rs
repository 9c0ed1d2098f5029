pub mod account;
pub mod auth;
pub mod evidence;
pub mod job;
pub mod shared;
pub mod summary;
