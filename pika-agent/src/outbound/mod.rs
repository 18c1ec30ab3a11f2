//! Outbound delivery pipeline: a durable on-disk queue, a per-cycle writer
//! that falls back to the queue when the connection is down, and a flusher
//! that drains queued history when the connection comes back.

mod buffer;
mod flusher;
mod writer;

pub use buffer::OutboundBuffer;
pub use flusher::BufferFlusher;
pub use writer::OutboundWriter;

use async_trait::async_trait;
use pika_protocol::OutboundMessage;

use crate::error::{AgentError, AgentResult};

/// Where outbound messages go when a connection is up. Implemented over the
/// actual transport by the binary that owns the connection.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> AgentResult<()>;
}

/// Result of one buffer drain pass.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Messages actually handed to the sink (and deleted from the queue).
    pub sent: usize,
    /// The send failure that stopped the pass, if any. Entries from the
    /// failing one onward stay queued for the next pass.
    pub send_error: Option<AgentError>,
}
