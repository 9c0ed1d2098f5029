//! Persistence for users, summaries, evidence and jobs.
//!
//! Every accessor that touches user-owned data takes the owner's id and
//! treats a row owned by someone else exactly like a missing row.

pub mod database;
pub mod entity;
pub mod error;
pub mod jobs;
pub mod stats;
pub mod summaries;
pub mod users;

pub use database::{connect, init_db};
pub use error::StoreError;
