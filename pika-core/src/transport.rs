use async_trait::async_trait;
use pika_protocol::OutboundMessage;

use crate::error::PikaResult;

/// Delivery of server-initiated messages to connected agents.
///
/// The connection layer implements this; services only see the seam, so a
/// push target can be a live socket, a queue, or a test double.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Pushes one message to the named agent.
    ///
    /// Fails when the agent has no live connection or the send itself fails.
    async fn send_to_agent(&self, agent_id: &str, message: &OutboundMessage) -> PikaResult<()>;
}
