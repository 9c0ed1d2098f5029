pub mod broker;
pub mod error;
pub mod memory;
pub mod queue;

pub use broker::{BroccoliError, BrokerMessage, Mq, connect};
pub use error::MqError;
pub use memory::{MemoryQueue, MemoryReceiver};
pub use queue::{BroccoliJobQueue, JobQueue};
