use std::fmt;

use reelmatch_model::{ProgressEvent, ProgressStatus};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receives batch progress in processing order.
///
/// Delivery is fire-and-forget; a slow or gone receiver never stalls the
/// batch.
pub trait ProgressReporter: Send + Sync + fmt::Debug {
    fn report(&self, event: ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event.status {
            ProgressStatus::Error => warn!(
                current = event.current,
                total = event.total,
                "{}",
                event.message
            ),
            _ => info!(
                status = %event.status,
                current = event.current,
                total = event.total,
                "{}",
                event.message
            ),
        }
    }
}

/// Forwards events to an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Adapts a closure into a reporter.
pub struct FnProgress<F>(pub F);

impl<F> fmt::Debug for FnProgress<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProgress")
    }
}

impl<F> ProgressReporter for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}
