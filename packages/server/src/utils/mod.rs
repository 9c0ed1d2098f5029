pub mod evidence;
pub mod export;
pub mod hash;
pub mod jwt;
pub mod synthesis;
