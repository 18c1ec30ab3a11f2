use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tokio::sync::Mutex;
use tracing::warn;

use pika_protocol::OutboundMessage;

use crate::error::AgentResult;
use crate::outbound::{FlushOutcome, OutboundSink};

/// Queued messages older than this are dropped instead of delivered; the
/// server has no use for day-old samples.
const RETENTION_MS: i64 = 24 * 60 * 60 * 1000;

/// Durable FIFO queue for messages that could not be delivered.
///
/// Entries are stored in an embedded [`sled`] tree under 8-byte big-endian
/// sequence keys, so iteration order is append order. A single mutex
/// serializes every operation in-process; sled's exclusive file lock makes a
/// second agent instance pointed at the same path fail fast instead of
/// corrupting the queue.
///
/// The store is created lazily on first append. An agent that never buffers
/// anything never touches the disk.
pub struct OutboundBuffer {
    path: PathBuf,
    state: Mutex<Option<sled::Db>>,
}

/// On-disk entry format: the append timestamp plus the message exactly as it
/// would have gone over the wire. Older agents wrote bare messages with no
/// wrapper; those still decode (`ts` 0, no payload) and are handled as
/// legacy entries.
#[derive(Serialize, Deserialize)]
struct BufferedEntry {
    #[serde(default)]
    ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Box<RawValue>>,
}

enum StoredEntry {
    Wrapped { ts: i64, payload: Box<RawValue> },
    Legacy,
}

impl OutboundBuffer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a message to the end of the queue and prunes entries that
    /// have outlived the retention window from the front.
    pub async fn append(&self, message: &OutboundMessage) -> AgentResult<()> {
        let payload = RawValue::from_string(serde_json::to_string(message)?)?;
        let entry = BufferedEntry {
            ts: Utc::now().timestamp_millis(),
            payload: Some(payload),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let mut state = self.state.lock().await;
        let db = open_store(&self.path, &mut state)?;

        let seq = db.generate_id()?;
        db.insert(seq.to_be_bytes(), bytes)?;

        prune_expired(&db, Utc::now().timestamp_millis() - RETENTION_MS)?;
        db.flush_async().await?;
        Ok(())
    }

    /// Drains the queue into `sink`, oldest first.
    ///
    /// Each entry is deleted only after the sink accepted it, so delivery is
    /// at-least-once. A send failure stops the pass immediately and leaves
    /// the failing entry and everything behind it queued. Entries that
    /// expired or cannot be decoded are dropped without being counted.
    ///
    /// Returns `{0, None}` without creating the store when nothing was ever
    /// buffered.
    pub async fn flush(&self, sink: &dyn OutboundSink) -> AgentResult<FlushOutcome> {
        let mut state = self.state.lock().await;
        if state.is_none() && !self.path.exists() {
            return Ok(FlushOutcome::default());
        }
        let db = open_store(&self.path, &mut state)?;

        let cutoff = Utc::now().timestamp_millis() - RETENTION_MS;
        let mut outcome = FlushOutcome::default();

        while let Some((key, value)) = db.first()? {
            match decode_stored(&value) {
                StoredEntry::Wrapped { ts, .. } if ts > 0 && ts < cutoff => {
                    db.remove(key)?;
                }
                StoredEntry::Wrapped { payload, .. } => {
                    match serde_json::from_str::<OutboundMessage>(payload.get()) {
                        Ok(message) => match sink.send(&message).await {
                            Ok(()) => {
                                db.remove(key)?;
                                outcome.sent += 1;
                            }
                            Err(err) => {
                                outcome.send_error = Some(err);
                                break;
                            }
                        },
                        Err(err) => {
                            warn!(error = %err, "Dropping undecodable buffered message");
                            db.remove(key)?;
                        }
                    }
                }
                StoredEntry::Legacy => match serde_json::from_slice::<OutboundMessage>(&value) {
                    Ok(message) => match sink.send(&message).await {
                        Ok(()) => {
                            db.remove(key)?;
                            outcome.sent += 1;
                        }
                        Err(err) => {
                            outcome.send_error = Some(err);
                            break;
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "Dropping undecodable buffered entry");
                        db.remove(key)?;
                    }
                },
            }
        }

        db.flush_async().await?;
        Ok(outcome)
    }

    /// Number of queued entries. Opens the store if it exists on disk.
    pub async fn len(&self) -> AgentResult<usize> {
        let mut state = self.state.lock().await;
        if state.is_none() && !self.path.exists() {
            return Ok(0);
        }
        let db = open_store(&self.path, &mut state)?;
        Ok(db.len())
    }

    pub async fn is_empty(&self) -> AgentResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Test seam: insert raw bytes as a stored value, bypassing the wrapper.
    #[cfg(test)]
    async fn insert_raw(&self, value: Vec<u8>) -> AgentResult<()> {
        let mut state = self.state.lock().await;
        let db = open_store(&self.path, &mut state)?;
        let seq = db.generate_id()?;
        db.insert(seq.to_be_bytes(), value)?;
        db.flush_async().await?;
        Ok(())
    }

    /// Test seam: insert a wrapped entry with a chosen timestamp, as if it
    /// had been appended then aged in place.
    #[cfg(test)]
    async fn insert_entry(&self, ts: i64, message: &OutboundMessage) -> AgentResult<()> {
        let payload = RawValue::from_string(serde_json::to_string(message)?)?;
        let entry = BufferedEntry {
            ts,
            payload: Some(payload),
        };
        self.insert_raw(serde_json::to_vec(&entry)?).await
    }
}

fn open_store(path: &Path, state: &mut Option<sled::Db>) -> AgentResult<sled::Db> {
    if let Some(db) = state {
        return Ok(db.clone());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = sled::open(path)?;
    *state = Some(db.clone());
    Ok(db)
}

/// Walks expired entries off the front of the queue. Stops at the first
/// fresh entry. A value that does not decode, or decodes without a
/// timestamp, also stops the walk; flush deals with those.
fn prune_expired(db: &sled::Db, cutoff: i64) -> AgentResult<()> {
    while let Some((key, value)) = db.first()? {
        let entry: BufferedEntry = match serde_json::from_slice(&value) {
            Ok(entry) => entry,
            Err(_) => break,
        };
        if entry.ts == 0 || entry.ts >= cutoff {
            break;
        }
        db.remove(key)?;
    }
    Ok(())
}

fn decode_stored(value: &[u8]) -> StoredEntry {
    match serde_json::from_slice::<BufferedEntry>(value) {
        Ok(BufferedEntry {
            ts,
            payload: Some(payload),
        }) => StoredEntry::Wrapped { ts, payload },
        _ => StoredEntry::Legacy,
    }
}
