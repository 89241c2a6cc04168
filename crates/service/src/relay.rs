use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::errors::RelayError;
use crate::payload::UploadRequest;
use crate::storage::{SlotInfo, SnapshotStore};
use crate::tier::Tier;

/// Body returned for an accepted upload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadReceipt {
    pub status: &'static str,
    pub tier: Tier,
    pub file: &'static str,
}

/// Write-authorizing front for a [`SnapshotStore`].
///
/// Stateless per call: every upload/fetch is an independent transaction
/// against the store.
#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn SnapshotStore>,
    upload_key: Option<String>,
}

impl RelayService {
    /// `upload_key` of `None` (or empty) rejects every upload.
    pub fn new(store: Arc<dyn SnapshotStore>, upload_key: Option<String>) -> Self {
        let upload_key = upload_key.filter(|k| !k.is_empty());
        if upload_key.is_none() {
            warn!("no upload key configured; uploads are disabled");
        }
        Self { store, upload_key }
    }

    pub fn writes_enabled(&self) -> bool {
        self.upload_key.is_some()
    }

    /// Check a caller-provided key against the configured one.
    pub fn authorize(&self, provided: Option<&str>) -> Result<(), RelayError> {
        let Some(expected) = self.upload_key.as_deref() else {
            return Err(RelayError::Unauthorized);
        };
        match provided {
            Some(p) if bool::from(p.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(RelayError::Unauthorized),
        }
    }

    /// Authorize, validate, and replace one tier's snapshot.
    ///
    /// The key is checked before the body is looked at, so a rejected caller
    /// cannot mutate or inspect anything.
    pub async fn upload(
        &self,
        provided_key: Option<&str>,
        body: &[u8],
    ) -> Result<UploadReceipt, RelayError> {
        if let Err(e) = self.authorize(provided_key) {
            warn!(key_present = provided_key.is_some(), "upload rejected: bad key");
            return Err(e);
        }
        let request = UploadRequest::from_slice(body).map_err(|e| {
            warn!(error = %e, "upload rejected: invalid payload");
            e
        })?;
        self.store_request(request).await
    }

    async fn store_request(&self, request: UploadRequest) -> Result<UploadReceipt, RelayError> {
        let UploadRequest { tier, document } = request;
        let slot = self.store.put(tier, &document).await?;
        info!(%tier, bytes = slot.bytes, "snapshot stored");
        Ok(UploadReceipt { status: "ok", tier, file: slot.file })
    }

    pub async fn fetch(&self, tier: Tier) -> Result<Value, RelayError> {
        let doc = self.store.get(tier).await?;
        debug!(%tier, "snapshot served");
        Ok(doc)
    }

    /// Fetch by tier name as it appears in a path segment.
    pub async fn fetch_named(&self, tier: &str) -> Result<Value, RelayError> {
        self.fetch(tier.parse()?).await
    }

    /// Fetch by slot file name. Only the fixed slot names resolve; anything
    /// else is `NotFound` without touching the filesystem.
    pub async fn fetch_file(&self, file_name: &str) -> Result<Value, RelayError> {
        match Tier::from_file_name(file_name) {
            Some(tier) => self.fetch(tier).await,
            None => Err(RelayError::UnknownSlot(file_name.to_string())),
        }
    }

    pub async fn list_available(&self) -> Result<Vec<SlotInfo>, RelayError> {
        self.store.list().await
    }
}
