use async_trait::async_trait;
use common::SummarizeJob;
use tokio::sync::mpsc;

use crate::error::MqError;
use crate::queue::JobQueue;

/// In-process queue for single-binary deployments and tests.
#[derive(Clone)]
pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<SummarizeJob>,
}

/// Consumer half of a [`MemoryQueue`].
pub struct MemoryReceiver {
    rx: mpsc::UnboundedReceiver<SummarizeJob>,
}

impl MemoryQueue {
    pub fn new() -> (MemoryQueue, MemoryReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MemoryQueue { tx }, MemoryReceiver { rx })
    }
}

impl MemoryReceiver {
    /// Waits for the next job id. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<SummarizeJob> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SummarizeJob> {
        self.rx.try_recv().ok()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: SummarizeJob) -> Result<(), MqError> {
        self.tx
            .send(job)
            .map_err(|_| MqError::Unavailable("in-memory consumer has stopped".into()))
    }
}
