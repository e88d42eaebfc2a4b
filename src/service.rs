//! # Inventory service
//!
//! The operations behind the HTTP surface. [`InventoryService`] is the seam
//! the daemon is written against; [`InventoryServiceImpl`] backs it with a
//! [`TableStore`].
//!
//! A mutation goes through two phases that may run on different devices:
//!
//! ```text
//! request_mutation  ->  QR code  ->  (scan)  ->  apply_mutation
//!   checks amount > 0                              decodes fields,
//!                                                  checks bin and sku,
//!                                                  decrements and persists
//! ```
//!
//! Nothing is retried. A rejected request has to be issued again.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    codec::{self, MutationRequest, ScanFields, ScannableArtifact},
    error::{ServiceError, ServiceResult},
    store::{DecrementOutcome, TableStore},
    table::Row,
};

/// Outcome of an applied scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    #[serde(rename = "binNo")]
    pub bin: String,
    pub sku: String,
    pub previous_value: u64,
    pub new_value: u64,
    pub subtracted: u64,
}

/// Liveness summary of the backing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub bins: usize,
    pub skus: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait InventoryService: Send + Sync {
    /// SKU column names in file order; empty when the table has no rows.
    async fn list_skus(&self) -> ServiceResult<Vec<String>>;

    /// Bins holding strictly more than `threshold` of `sku`.
    async fn search_bins(&self, sku: &str, threshold: i64) -> ServiceResult<Vec<Row>>;

    /// Every row in file order.
    async fn list_inventory(&self) -> ServiceResult<Vec<Row>>;

    /// Build the scannable code for a pending decrement. Only the amount is
    /// checked here; bin and SKU are checked when the code is applied.
    async fn request_mutation(
        &self,
        req: MutationRequest,
        base_url: &str,
    ) -> ServiceResult<ScannableArtifact>;

    /// Decode scanned fields and apply the decrement.
    async fn apply_mutation(&self, fields: &ScanFields) -> ServiceResult<MutationResult>;

    async fn health(&self) -> HealthReport;
}

pub struct InventoryServiceImpl {
    store: TableStore,
}

impl InventoryServiceImpl {
    pub fn new(store: TableStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }
}

#[async_trait]
impl InventoryService for InventoryServiceImpl {
    async fn list_skus(&self) -> ServiceResult<Vec<String>> {
        Ok(self.store.load()?.skus())
    }

    async fn search_bins(&self, sku: &str, threshold: i64) -> ServiceResult<Vec<Row>> {
        let table = self.store.load()?;
        let hits = table.search(sku, threshold);
        tracing::debug!(
            "service: search sku={} threshold={} hits={}",
            sku,
            threshold,
            hits.len()
        );
        Ok(hits)
    }

    async fn list_inventory(&self) -> ServiceResult<Vec<Row>> {
        Ok(self.store.load()?.rows().to_vec())
    }

    async fn request_mutation(
        &self,
        req: MutationRequest,
        base_url: &str,
    ) -> ServiceResult<ScannableArtifact> {
        if req.amount == 0 {
            tracing::warn!(
                "service: rejected at encode bin={} sku={}: amount must be positive",
                req.bin,
                req.sku
            );
            return Err(ServiceError::Validation(
                "value must be a positive integer".into(),
            ));
        }
        let artifact = codec::encode(&req, base_url).inspect_err(|e| {
            tracing::warn!("service: rejected at encode bin={} sku={}: {}", req.bin, req.sku, e)
        })?;
        tracing::info!("service: issued scan url {}", artifact.url);
        Ok(artifact)
    }

    async fn apply_mutation(&self, fields: &ScanFields) -> ServiceResult<MutationResult> {
        let req = codec::decode(fields).inspect_err(|e| {
            tracing::warn!("service: rejected at decode: {}", e);
        })?;

        match self.store.decrement(&req.bin, &req.sku, req.amount).await? {
            DecrementOutcome::Applied(change) => Ok(MutationResult {
                bin: req.bin,
                sku: req.sku,
                previous_value: change.previous,
                new_value: change.updated,
                subtracted: req.amount,
            }),
            DecrementOutcome::NotFound(missing) => {
                tracing::warn!(
                    "service: rejected scan bin={} sku={}: {:?}",
                    req.bin,
                    req.sku,
                    missing
                );
                Err(missing.into())
            }
        }
    }

    async fn health(&self) -> HealthReport {
        match self.store.load() {
            Ok(table) => HealthReport {
                status: "ok",
                bins: table.len(),
                skus: table.columns().len() - 1,
                error: None,
            },
            Err(e) => HealthReport {
                status: "degraded",
                bins: 0,
                skus: 0,
                error: Some(e.to_string()),
            },
        }
    }
}
