//! Work submission into the compositor's serialized execution context
//!
//! Surface observer callbacks arrive on whatever thread the shell delivers
//! them on. They are queued here and executed one at a time by the
//! compositor side, either from an async task (`run`) or by draining the
//! queue from its own event loop (`drain`).

use tokio::sync::mpsc;
use tracing::{debug, warn};

type Work = Box<dyn FnOnce() + Send>;

/// Sending half, cloned into every surface observer
#[derive(Clone)]
pub struct CompositorQueue {
    sender: mpsc::UnboundedSender<Work>,
}

/// Receiving half, owned by the compositor
pub struct CompositorQueueRunner {
    receiver: mpsc::UnboundedReceiver<Work>,
}

pub fn compositor_queue() -> (CompositorQueue, CompositorQueueRunner) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (CompositorQueue { sender }, CompositorQueueRunner { receiver })
}

impl CompositorQueue {
    /// Queue `work`; returns false if the compositor side has shut down
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) -> bool {
        if self.sender.send(Box::new(work)).is_err() {
            warn!("Compositor queue closed, dropping work");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl CompositorQueueRunner {
    /// Execute work until every sender has been dropped
    pub async fn run(mut self) {
        while let Some(work) = self.receiver.recv().await {
            work();
        }
        debug!("Compositor queue drained, all senders gone");
    }

    /// Execute everything queued so far without waiting; returns the number of items run
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Ok(work) = self.receiver.try_recv() {
            work();
            count += 1;
        }
        count
    }
}

impl std::fmt::Debug for CompositorQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorQueue")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}
