use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AgentResult;
use crate::outbound::{FlushOutcome, OutboundBuffer, OutboundSink};

/// Drains the outbound buffer when a connection (re)appears, so queued
/// history reaches the server before fresh reports.
pub struct BufferFlusher {
    buffer: Arc<OutboundBuffer>,
}

impl BufferFlusher {
    pub fn new(buffer: Arc<OutboundBuffer>) -> Self {
        Self { buffer }
    }

    pub async fn drain(&self, sink: &dyn OutboundSink) -> AgentResult<FlushOutcome> {
        let outcome = self.buffer.flush(sink).await?;
        if outcome.sent > 0 {
            info!(sent = outcome.sent, "Delivered buffered messages");
        }
        if let Some(err) = &outcome.send_error {
            warn!(error = %err, "Buffer drain stopped early, remaining entries kept for next pass");
        }
        Ok(outcome)
    }
}
