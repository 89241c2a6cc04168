//! Snapshot storage
//!
//! One live JSON document per tier. Implementations must be thread-safe and a
//! concurrent `get` must never observe a half-written `put`.

pub mod file_store;
pub mod memory_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::RelayError;
use crate::tier::Tier;

pub use file_store::FileSnapshotStore;
pub use memory_store::MemorySnapshotStore;

/// Describes a populated slot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotInfo {
    pub tier: Tier,
    pub file: &'static str,
    pub bytes: u64,
    pub updated_at: DateTime<Utc>,
}

impl SlotInfo {
    pub fn new(tier: Tier, bytes: u64, updated_at: DateTime<Utc>) -> Self {
        Self { tier, file: tier.file_name(), bytes, updated_at }
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the slot for `tier` with `document`.
    async fn put(&self, tier: Tier, document: &Value) -> Result<SlotInfo, RelayError>;

    /// Current document for `tier`, `RelayError::NotFound` if never written.
    async fn get(&self, tier: Tier) -> Result<Value, RelayError>;

    /// Populated slots, in tier order.
    async fn list(&self) -> Result<Vec<SlotInfo>, RelayError>;
}
