//! # Binscan
//!
//! Binscan tracks how much of each SKU sits in each warehouse bin and lets a
//! picker subtract a quantity by scanning a QR code with a phone.
//!
//! The ledger is a CSV file: one row per bin, one column per SKU. A desk
//! client asks for a QR code for `(bin, sku, amount)`; the code holds a URL
//! with those three values. The phone opens the URL, posts the values back,
//! and the daemon subtracts the amount from the cell, never going below zero,
//! and rewrites the file.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use binscan::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     binscan::config::init_config("binscan.toml")?;
//!
//!     let store = TableStore::new(binscan::config::data_file());
//!     let service = Arc::new(InventoryServiceImpl::new(store));
//!
//!     let daemon = InventoryDaemon::new(service, binscan::config::scan_base_url());
//!     daemon.serve(binscan::config::listen_addr()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Using the Service Directly
//!
//! ```rust,ignore
//! use binscan::prelude::*;
//!
//! # async fn demo() -> Result<(), ServiceError> {
//! let service = InventoryServiceImpl::new(TableStore::new("inventory_data.csv"));
//!
//! let skus = service.list_skus().await?;
//! let stocked = service.search_bins("WIDGET", 5).await?;
//!
//! let code = service
//!     .request_mutation(
//!         MutationRequest::new("A1", "WIDGET", 3),
//!         "http://192.168.1.20:3000/scan.html",
//!     )
//!     .await?;
//! println!("scan me: {}", code.url);
//!
//! let fields = ScanFields {
//!     bin_no: Some("A1".into()),
//!     sku: Some("WIDGET".into()),
//!     value: Some("3".into()),
//! };
//! let applied = service.apply_mutation(&fields).await?;
//! println!("{} -> {}", applied.previous_value, applied.new_value);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Components
//!
//! - [`table`]: the bins-by-SKUs table and its CSV form
//! - [`store`]: the backing file and the writer lock
//! - [`codec`]: scan URL and QR code encoding, scanned field decoding
//! - [`service`]: the inventory operations
//! - [`daemon`]: HTTP endpoints
//! - [`config`]: configuration

pub mod codec;
pub mod config;
pub mod daemon;
pub mod error;
pub mod service;
pub mod store;
pub mod table;

/// Commonly used types and traits.
///
/// ```rust,ignore
/// use binscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::{MutationRequest, ScanFields, ScannableArtifact};
    pub use crate::daemon::{ApiError, ErrorBody, InventoryDaemon};
    pub use crate::error::{
        CellError, DecodeError, EncodeError, NotFound, ServiceError, ServiceResult, StorageError,
    };
    pub use crate::service::{HealthReport, InventoryService, InventoryServiceImpl, MutationResult};
    pub use crate::store::TableStore;
    pub use crate::table::{Row, Table};
}

pub use service::{InventoryService, InventoryServiceImpl};
pub use store::TableStore;
pub use table::Table;
