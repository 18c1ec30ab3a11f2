use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pika_protocol::{MetricReport, OutboundMessage};

use crate::collector::Collector;
use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::outbound::{BufferFlusher, OutboundBuffer, OutboundSink, OutboundWriter};

/// Periodically collects every metric and writes the reports out, buffering
/// whatever cannot be delivered. The transport is attached and detached by
/// whoever manages the connection; the reporter keeps working either way.
pub struct Reporter {
    agent_id: String,
    interval: Duration,
    collectors: Vec<Arc<dyn Collector>>,
    buffer: Arc<OutboundBuffer>,
    sink: Arc<RwLock<Option<Arc<dyn OutboundSink>>>>,
    is_running: Arc<AtomicBool>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl Reporter {
    pub fn new(
        config: &AgentConfig,
        collectors: Vec<Arc<dyn Collector>>,
        buffer: Arc<OutboundBuffer>,
    ) -> Self {
        Self {
            agent_id: config.agent_id.clone(),
            interval: Duration::from_secs(config.report_interval_secs),
            collectors,
            buffer,
            sink: Arc::new(RwLock::new(None)),
            is_running: Arc::new(AtomicBool::new(false)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Makes a live connection available. Queued history is drained into it
    /// first so it reaches the server ahead of fresh reports.
    pub async fn attach_sink(&self, sink: Arc<dyn OutboundSink>) {
        let flusher = BufferFlusher::new(Arc::clone(&self.buffer));
        if let Err(err) = flusher.drain(sink.as_ref()).await {
            error!(error = %err, "Failed to drain outbound buffer");
        }
        *self.sink.write().await = Some(sink);
        info!("Transport attached");
    }

    pub async fn detach_sink(&self) {
        *self.sink.write().await = None;
        info!("Transport detached, reports will be buffered");
    }

    /// Runs one collection cycle immediately.
    pub async fn report_once(&self) -> AgentResult<()> {
        let sink = self.sink.read().await.clone();
        run_cycle(&self.agent_id, &self.collectors, &self.buffer, sink).await
    }

    pub async fn start(&self) {
        if self.is_running.load(Ordering::SeqCst) {
            warn!("Reporter is already running");
            return;
        }
        self.is_running.store(true, Ordering::SeqCst);
        info!(
            interval_secs = self.interval.as_secs(),
            collectors = self.collectors.len(),
            "Starting reporter background task"
        );

        let agent_id = self.agent_id.clone();
        let collectors = self.collectors.clone();
        let buffer = Arc::clone(&self.buffer);
        let sink = Arc::clone(&self.sink);
        let is_running = Arc::clone(&self.is_running);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            // Don't immediately tick - wait for first interval
            interval_timer.tick().await;

            while is_running.load(Ordering::SeqCst) {
                interval_timer.tick().await;

                if !is_running.load(Ordering::SeqCst) {
                    break;
                }

                let current_sink = sink.read().await.clone();
                if let Err(err) = run_cycle(&agent_id, &collectors, &buffer, current_sink).await {
                    error!(error = %err, "Reporting cycle failed");
                }
            }

            info!("Reporter background task stopped");
        });

        *self.task_handle.write().await = Some(handle);
    }

    pub async fn stop(&self) {
        if !self.is_running.load(Ordering::SeqCst) {
            warn!("Reporter is not running");
            return;
        }

        info!("Stopping reporter...");
        self.is_running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.task_handle.write().await.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "Error waiting for reporter task to stop");
            }
        }

        info!("Reporter stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.is_running.load(Ordering::SeqCst) {
            self.is_running.store(false, Ordering::SeqCst);
        }
    }
}

async fn run_cycle(
    agent_id: &str,
    collectors: &[Arc<dyn Collector>],
    buffer: &Arc<OutboundBuffer>,
    sink: Option<Arc<dyn OutboundSink>>,
) -> AgentResult<()> {
    let mut writer = OutboundWriter::new(sink, Arc::clone(buffer));

    for collector in collectors {
        let metric_type = collector.metric_type();
        let data = match collector.collect().await {
            Ok(data) => data,
            Err(err) => {
                warn!(metric_type = %metric_type, error = %err, "Collection failed, skipping");
                continue;
            }
        };

        let report = MetricReport::new(agent_id, metric_type, data)?;
        let message = OutboundMessage::metric_report(&report)?;
        writer.write(&message).await?;
    }

    if writer.buffered() {
        debug!("One or more reports buffered for later delivery");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pika_protocol::MetricType;

    struct StaticCollector;

    #[async_trait]
    impl Collector for StaticCollector {
        fn metric_type(&self) -> MetricType {
            MetricType::Cpu
        }

        async fn collect(&self) -> AgentResult<serde_json::Value> {
            Ok(serde_json::json!({ "usagePercent": 42.0, "logicalCores": 4, "physicalCores": 2 }))
        }
    }

    struct RecordingSink {
        sent: std::sync::Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl OutboundSink for RecordingSink {
        async fn send(&self, message: &OutboundMessage) -> AgentResult<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn test_config(dir: &std::path::Path) -> AgentConfig {
        AgentConfig {
            agent_id: "agent-1".to_string(),
            buffer_path: dir.join("outbound"),
            ..AgentConfig::default()
        }
    }

    #[tokio::test]
    async fn test_report_without_sink_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let buffer = Arc::new(OutboundBuffer::new(config.buffer_path.clone()));
        let reporter = Reporter::new(&config, vec![Arc::new(StaticCollector)], Arc::clone(&buffer));

        reporter.report_once().await.unwrap();

        assert_eq!(buffer.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_attach_drains_then_delivers_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let buffer = Arc::new(OutboundBuffer::new(config.buffer_path.clone()));
        let reporter = Reporter::new(&config, vec![Arc::new(StaticCollector)], Arc::clone(&buffer));

        // offline cycle queues the report
        reporter.report_once().await.unwrap();
        assert_eq!(buffer.len().await.unwrap(), 1);

        let sink = Arc::new(RecordingSink {
            sent: std::sync::Mutex::new(Vec::new()),
        });
        reporter.attach_sink(sink.clone()).await;

        // history was drained on attach, next cycle goes direct
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
        assert!(buffer.is_empty().await.unwrap());

        reporter.report_once().await.unwrap();
        assert_eq!(sink.sent.lock().unwrap().len(), 2);
        assert!(buffer.is_empty().await.unwrap());

        let report: MetricReport = sink.sent.lock().unwrap()[1].decode_data().unwrap();
        assert_eq!(report.agent_id, "agent-1");
        assert_eq!(report.metric_type, "cpu");
    }
}
