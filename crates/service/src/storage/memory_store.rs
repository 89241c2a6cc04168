use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{SlotInfo, SnapshotStore};
use crate::errors::RelayError;
use crate::tier::Tier;

/// In-memory snapshot storage backed by a `RwLock<HashMap>`. Not durable.
#[derive(Default)]
pub struct MemorySnapshotStore {
    data: RwLock<HashMap<Tier, (Value, u64, DateTime<Utc>)>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&self, tier: Tier, document: &Value) -> Result<SlotInfo, RelayError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| RelayError::storage("encode snapshot", e))?
            .len() as u64;
        let now = Utc::now();
        let mut data = self.data.write().await;
        data.insert(tier, (document.clone(), bytes, now));
        Ok(SlotInfo::new(tier, bytes, now))
    }

    async fn get(&self, tier: Tier) -> Result<Value, RelayError> {
        let data = self.data.read().await;
        data.get(&tier)
            .map(|(doc, _, _)| doc.clone())
            .ok_or(RelayError::NotFound(tier))
    }

    async fn list(&self) -> Result<Vec<SlotInfo>, RelayError> {
        let data = self.data.read().await;
        let mut slots: Vec<SlotInfo> = data
            .iter()
            .map(|(tier, (_, bytes, at))| SlotInfo::new(*tier, *bytes, *at))
            .collect();
        slots.sort_by_key(|s| s.tier);
        Ok(slots)
    }
}
