//! Tamper-protection config distribution and event intake.
//!
//! The server owns each agent's full protected-path set; agents only ever
//! receive incremental diffs. Event rows age out after a retention window.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use pika_protocol::{OutboundMessage, TamperConfigPush};

use crate::config::TamperSettings;
use crate::error::PikaResult;
use crate::models::{TamperEvent, TamperOperation, TamperProtectConfig};
use crate::repo::{AgentRepository, TamperEventRepository};
use crate::transport::AgentTransport;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct TamperService {
    agent_repo: AgentRepository,
    event_repo: TamperEventRepository,
    transport: Arc<dyn AgentTransport>,
    settings: TamperSettings,
    cleanup_running: Arc<AtomicBool>,
    cleanup_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl TamperService {
    pub fn new(
        agent_repo: AgentRepository,
        event_repo: TamperEventRepository,
        transport: Arc<dyn AgentTransport>,
        settings: TamperSettings,
    ) -> Self {
        Self {
            agent_repo,
            event_repo,
            transport,
            settings,
            cleanup_running: Arc::new(AtomicBool::new(false)),
            cleanup_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns `None` when the agent does not exist. An absent config is not
    /// an error.
    pub async fn get_config(&self, agent_id: &str) -> PikaResult<Option<TamperProtectConfig>> {
        Ok(self.agent_repo.get_tamper_protect_config(agent_id).await?)
    }

    /// Replaces the agent's protected-path set and pushes the difference to
    /// the agent.
    ///
    /// The full config is persisted first; the push carries only what
    /// changed, and a delivery failure never rolls the save back.
    pub async fn update_config(
        &self,
        agent_id: &str,
        enabled: bool,
        paths: Vec<String>,
    ) -> PikaResult<TamperProtectConfig> {
        let old = self
            .agent_repo
            .get_tamper_protect_config(agent_id)
            .await?
            .unwrap_or_default();

        let (added, removed) = path_diff(&old.paths, &paths);

        let config = TamperProtectConfig { enabled, paths };
        let updated = self
            .agent_repo
            .update_tamper_protect_config(agent_id, &config)
            .await?;
        if !updated {
            warn!(agent_id, "Tamper config update for unknown agent, nothing persisted");
        }

        let push = TamperConfigPush { added, removed };
        if !push.is_empty() {
            match self.push_config(agent_id, &push).await {
                Ok(()) => info!(
                    agent_id,
                    added = push.added.len(),
                    removed = push.removed.len(),
                    total_paths = config.paths.len(),
                    "Pushed tamper config diff to agent"
                ),
                Err(err) => warn!(
                    agent_id,
                    added = ?push.added,
                    removed = ?push.removed,
                    error = %err,
                    "Failed to push tamper config diff to agent"
                ),
            }
        }

        Ok(config)
    }

    async fn push_config(&self, agent_id: &str, push: &TamperConfigPush) -> PikaResult<()> {
        let message = OutboundMessage::tamper_protect_config(push)?;
        self.transport.send_to_agent(agent_id, &message).await
    }

    /// Stores one watcher observation reported by an agent.
    pub async fn record_event(
        &self,
        agent_id: &str,
        path: &str,
        operation: TamperOperation,
        details: &str,
        timestamp: i64,
    ) -> PikaResult<TamperEvent> {
        let event = TamperEvent::new(agent_id, path, operation, details, timestamp);
        Ok(self.event_repo.create(&event).await?)
    }

    /// Newest-first page of events plus the total count for the agent.
    ///
    /// Page numbers below 1 become 1; sizes below 1 fall back to 20 and cap
    /// at 100.
    pub async fn events(
        &self,
        agent_id: &str,
        page_num: i64,
        page_size: i64,
    ) -> PikaResult<(Vec<TamperEvent>, i64)> {
        let (page_num, page_size) = clamp_page(page_num, page_size);
        let offset = (page_num - 1) * page_size;

        let events = self
            .event_repo
            .get_page_by_agent(agent_id, page_size, offset)
            .await?;
        let total = self.event_repo.count_by_agent(agent_id).await?;

        Ok((events, total))
    }

    /// Deletes events older than the configured retention window. Returns
    /// the number removed.
    pub async fn cleanup_old_events(&self) -> PikaResult<u64> {
        let threshold = retention_threshold_ms(
            Utc::now().timestamp_millis(),
            self.settings.event_retention_days,
        );
        Ok(self.event_repo.delete_before(threshold).await?)
    }

    /// Starts the daily cleanup task. No-op when already running.
    pub async fn start_cleanup(&self) {
        if self.cleanup_running.load(Ordering::SeqCst) {
            warn!("Tamper event cleanup task is already running");
            return;
        }

        self.cleanup_running.store(true, Ordering::SeqCst);
        info!(
            retention_days = self.settings.event_retention_days,
            "Starting tamper event cleanup background task"
        );

        let is_running = Arc::clone(&self.cleanup_running);
        let event_repo = TamperEventRepository::new(self.event_repo.pool().clone());
        let retention_days = self.settings.event_retention_days;

        let handle = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(CLEANUP_INTERVAL);

            // Don't immediately tick - wait for first interval
            interval_timer.tick().await;

            while is_running.load(Ordering::SeqCst) {
                interval_timer.tick().await;

                if !is_running.load(Ordering::SeqCst) {
                    break;
                }

                let threshold =
                    retention_threshold_ms(Utc::now().timestamp_millis(), retention_days);
                match event_repo.delete_before(threshold).await {
                    Ok(removed) if removed > 0 => {
                        info!(removed, "Cleaned up expired tamper events");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Failed to clean up tamper events"),
                }
            }

            info!("Tamper event cleanup background task stopped");
        });

        *self.cleanup_handle.write().await = Some(handle);
    }

    /// Stops the cleanup task. The next tick can be up to a day away, so the
    /// task is aborted rather than awaited.
    pub async fn stop_cleanup(&self) {
        if !self.cleanup_running.load(Ordering::SeqCst) {
            warn!("Tamper event cleanup task is not running");
            return;
        }

        self.cleanup_running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.cleanup_handle.write().await.take() {
            handle.abort();
        }

        info!("Tamper event cleanup stopped");
    }

    pub fn cleanup_is_running(&self) -> bool {
        self.cleanup_running.load(Ordering::SeqCst)
    }
}

/// Set difference in both directions. Order follows the source lists: added
/// paths in new-config order, removed paths in old-config order.
fn path_diff(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
    let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();

    let added = new
        .iter()
        .filter(|path| !old_set.contains(path.as_str()))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|path| !new_set.contains(path.as_str()))
        .cloned()
        .collect();

    (added, removed)
}

fn clamp_page(page_num: i64, page_size: i64) -> (i64, i64) {
    let page_num = page_num.max(1);
    let page_size = if page_size < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    };
    (page_num, page_size)
}

fn retention_threshold_ms(now_ms: i64, retention_days: u32) -> i64 {
    now_ms - i64::from(retention_days) * 24 * 60 * 60 * 1000
}
