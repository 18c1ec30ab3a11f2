use std::sync::Arc;

use tracing::warn;

use pika_protocol::OutboundMessage;

use crate::error::{AgentError, AgentResult};
use crate::outbound::{OutboundBuffer, OutboundSink};

/// One reporting cycle's view of the transport.
///
/// While the connection is up, messages go straight to the sink. The moment
/// a send fails (or when there is no connection at all), this and every
/// later message of the cycle are diverted to the durable buffer instead of
/// hammering a dead connection out of order.
pub struct OutboundWriter {
    sink: Option<Arc<dyn OutboundSink>>,
    buffer: Arc<OutboundBuffer>,
    buffered: bool,
    send_error: Option<AgentError>,
}

impl OutboundWriter {
    pub fn new(sink: Option<Arc<dyn OutboundSink>>, buffer: Arc<OutboundBuffer>) -> Self {
        Self {
            sink,
            buffer,
            buffered: false,
            send_error: None,
        }
    }

    /// Sends directly when possible, otherwise appends to the buffer.
    ///
    /// A send failure is remembered, not returned: delivery will catch up
    /// from the buffer once the connection is back. A buffering failure is
    /// returned, because at that point the message is gone.
    pub async fn write(&mut self, message: &OutboundMessage) -> AgentResult<()> {
        let sink = match (&self.sink, &self.send_error) {
            (Some(sink), None) => Arc::clone(sink),
            _ => {
                self.buffer.append(message).await?;
                self.buffered = true;
                return Ok(());
            }
        };

        if let Err(err) = sink.send(message).await {
            warn!(error = %err, "Direct send failed, diverting to outbound buffer");
            self.send_error = Some(err);
            self.buffer.append(message).await?;
            self.buffered = true;
        }
        Ok(())
    }

    /// True if any message of this cycle went to the buffer.
    pub fn buffered(&self) -> bool {
        self.buffered
    }

    /// The first send failure of this cycle, if any.
    pub fn send_error(&self) -> Option<&AgentError> {
        self.send_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pika_protocol::MessageType;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlakySink {
        fail: AtomicBool,
        sent: std::sync::Mutex<Vec<OutboundMessage>>,
    }

    impl FlakySink {
        fn new(fail: bool) -> Self {
            Self {
                fail: AtomicBool::new(fail),
                sent: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OutboundSink for FlakySink {
        async fn send(&self, message: &OutboundMessage) -> AgentResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AgentError::send("broken pipe"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn msg(seq: i64) -> OutboundMessage {
        OutboundMessage::new(MessageType::MetricReport, serde_json::json!({ "seq": seq })).unwrap()
    }

    #[tokio::test]
    async fn test_write_without_sink_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(OutboundBuffer::new(dir.path().join("outbound")));
        let mut writer = OutboundWriter::new(None, Arc::clone(&buffer));

        writer.write(&msg(1)).await.unwrap();

        assert!(writer.buffered());
        assert!(writer.send_error().is_none());
        assert_eq!(buffer.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_with_healthy_sink_sends_directly() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(OutboundBuffer::new(dir.path().join("outbound")));
        let sink = Arc::new(FlakySink::new(false));
        let mut writer = OutboundWriter::new(Some(sink.clone()), Arc::clone(&buffer));

        writer.write(&msg(1)).await.unwrap();
        writer.write(&msg(2)).await.unwrap();

        assert!(!writer.buffered());
        assert_eq!(sink.sent.lock().unwrap().len(), 2);
        assert_eq!(buffer.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_diverts_rest_of_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(OutboundBuffer::new(dir.path().join("outbound")));
        let sink = Arc::new(FlakySink::new(true));
        let mut writer = OutboundWriter::new(Some(sink.clone()), Arc::clone(&buffer));

        writer.write(&msg(1)).await.unwrap();
        // connection "recovers", but the cycle stays diverted for ordering
        sink.fail.store(false, Ordering::SeqCst);
        writer.write(&msg(2)).await.unwrap();

        assert!(writer.buffered());
        assert!(writer.send_error().is_some());
        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(buffer.len().await.unwrap(), 2);
    }
}
