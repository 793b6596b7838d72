use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use shared::domain::{push_history, HistoryEntry, LastInputs, PredictionRequest};
use storage::{Storage, HISTORY_KEY, LAST_INPUTS_KEY};
use tokio::sync::Mutex;

/// Client-local persisted state used by the controller.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_last_inputs(&self) -> Result<Option<LastInputs>>;
    async fn save_last_inputs(&self, request: &PredictionRequest) -> Result<()>;
    async fn load_history(&self) -> Result<Vec<HistoryEntry>>;
    async fn append_history(&self, entry: HistoryEntry, limit: usize)
        -> Result<Vec<HistoryEntry>>;
}

#[async_trait]
impl StateStore for Storage {
    async fn load_last_inputs(&self) -> Result<Option<LastInputs>> {
        Storage::load_last_inputs(self).await
    }

    async fn save_last_inputs(&self, request: &PredictionRequest) -> Result<()> {
        Storage::save_last_inputs(self, request).await
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        Storage::load_history(self).await
    }

    async fn append_history(
        &self,
        entry: HistoryEntry,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        Storage::append_history(self, entry, limit).await
    }
}

/// JSON documents kept in memory. Used by tests and when no database could be
/// opened.
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail_writes: true,
        }
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    pub async fn put_raw(&self, key: &str, value_json: impl Into<String>) {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value_json.into());
    }

    async fn write(&self, key: &str, value_json: String) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("memory store rejects writes for '{key}'"));
        }
        self.values.lock().await.insert(key.to_string(), value_json);
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_last_inputs(&self) -> Result<Option<LastInputs>> {
        let Some(raw) = self.raw(LAST_INPUTS_KEY).await else {
            return Ok(None);
        };
        let last = serde_json::from_str(&raw).context("last_inputs is not a number map")?;
        Ok(Some(last))
    }

    async fn save_last_inputs(&self, request: &PredictionRequest) -> Result<()> {
        self.write(LAST_INPUTS_KEY, serde_json::to_string(request)?)
            .await
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = self.raw(HISTORY_KEY).await else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(history) => Ok(history),
            Err(err) => {
                tracing::warn!("store: discarding unreadable history: {err}");
                Ok(Vec::new())
            }
        }
    }

    async fn append_history(
        &self,
        entry: HistoryEntry,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let mut history = self.load_history().await?;
        push_history(&mut history, entry, limit);
        self.write(HISTORY_KEY, serde_json::to_string(&history)?)
            .await?;
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::PredictionResult;

    use super::*;

    fn entry(ts: i64) -> HistoryEntry {
        HistoryEntry {
            ts,
            result: PredictionResult {
                predicted_label: "Sorghum".to_string(),
                predicted_label_index: None,
                confidence: None,
                top3: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn unreadable_history_reads_as_empty_and_is_replaced() {
        let store = MemoryStateStore::new();
        store.put_raw(HISTORY_KEY, "{not a list").await;

        assert!(store.load_history().await.expect("history").is_empty());

        let history = store.append_history(entry(7), 50).await.expect("append");
        assert_eq!(history.len(), 1);
        let stored: Vec<HistoryEntry> =
            serde_json::from_str(&store.raw(HISTORY_KEY).await.expect("raw")).expect("json");
        assert_eq!(stored, vec![entry(7)]);
    }

    #[tokio::test]
    async fn failing_store_rejects_history_writes() {
        let store = MemoryStateStore::failing_writes();
        assert!(store.append_history(entry(1), 50).await.is_err());
        assert!(store.raw(HISTORY_KEY).await.is_none());
    }
}
