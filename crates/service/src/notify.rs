#![forbid(unsafe_code)]

use crate::time::ts_ms_to_rfc3339;
use pf_storage::EventRow;
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const NOTIFICATIONS_FILE: &str = "plantflow_notifications.jsonl";

/// Receives committed workflow events. Delivery is fire-and-forget: a failing sink never
/// fails the operation that produced the events.
pub trait NotificationSink {
    fn publish(&mut self, event: &EventRow) -> Result<(), String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&mut self, _event: &EventRow) -> Result<(), String> {
        Ok(())
    }
}

/// Shared in-memory sink; clones observe the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<EventRow>>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<EventRow> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for MemorySink {
    fn publish(&mut self, event: &EventRow) -> Result<(), String> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| "notification buffer poisoned".to_string())?;
        guard.push(event.clone());
        Ok(())
    }
}

/// Appends one JSON object per event to a file that a dispatcher tails.
#[derive(Clone, Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(storage_dir: &Path) -> Self {
        Self {
            path: storage_dir.join(NOTIFICATIONS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for JsonLinesSink {
    fn publish(&mut self, event: &EventRow) -> Result<(), String> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| format!("open {}: {err}", self.path.display()))?;
        writeln!(file, "{}", notification_json(event))
            .map_err(|err| format!("write {}: {err}", self.path.display()))
    }
}

pub fn notification_json(event: &EventRow) -> Value {
    let payload = serde_json::from_str::<Value>(&event.payload_json).unwrap_or(Value::Null);
    json!({
        "event_id": event.event_id(),
        "type": event.event_type,
        "ts": ts_ms_to_rfc3339(event.ts_ms),
        "ts_ms": event.ts_ms,
        "post_id": event.post_id,
        "task_id": event.task_id,
        "payload": payload,
    })
}
