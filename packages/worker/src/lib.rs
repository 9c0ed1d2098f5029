//! Job execution: claim, summarize under a heartbeat, record the outcome.
//!
//! The same [`JobRunner`] serves the standalone worker binary, the server's
//! in-process consumer and the server's inline fallback.

pub mod config;
pub mod consumer;
pub mod error;
pub mod runner;

pub use error::{Result, WorkerError};
pub use runner::{JobRunner, RunOutcome};
