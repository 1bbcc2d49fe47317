//! # reqsheet-store
//!
//! Request documents and their persistence.
//!
//! - [`Request`] - The JSON document a data request is stored as
//! - [`RequestStore`] - Async store contract with per-request write locking
//! - [`MemoryStore`] - In-process store
//! - `PgRequestStore` - Postgres store (feature `postgres`)
//! - [`notice`] - Recipient parsing and e-mail notice rendering
//!
//! ## Example
//!
//! ```rust
//! use reqsheet_store::{MemoryStore, Request, RequestStore, Submission};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! let request = store
//!     .create(Request::new("Laptops", ["Model", "Qty"]), "ops")
//!     .await
//!     .unwrap();
//! assert_eq!(request.id, "REQ-001");
//!
//! let mut row = serde_json::Map::new();
//! row.insert("Model".into(), "X1".into());
//! store
//!     .add_submission(&request.id, Submission::new("IT", vec![row]))
//!     .await
//!     .unwrap();
//!
//! let grid = store.get(&request.id).await.unwrap().to_grid().unwrap();
//! assert_eq!(grid.get(0, "Model").unwrap(), "X1");
//! # });
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod notice;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use config::{NoticeConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use model::{
    next_request_id, ReminderFrequency, Reminders, Request, RequestFormat, RequestStatus, RowData,
    Submission, TemplateFile,
};
pub use notice::{Delivery, EmailSender, Notice};
#[cfg(feature = "postgres")]
pub use postgres::PgRequestStore;
pub use store::RequestStore;
