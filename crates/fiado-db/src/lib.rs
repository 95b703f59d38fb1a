//! # fiado-db: Database Layer for Fiado POS
//!
//! SQLite persistence for the catalog, sales, quotes, and crediário.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           fiado-db                                      │
//! │                                                                         │
//! │  ┌──────────────┐      ┌───────────────────────────────────────┐       │
//! │  │   Database   │─────►│           Repositories                │       │
//! │  │  (SqlitePool)│      │  products  customers  sales  quotes   │       │
//! │  └──────────────┘      │  receivables  users  dashboard        │       │
//! │         │              └───────────────────────────────────────┘       │
//! │         ▼                                                               │
//! │  ┌──────────────┐      Multi-table writes (finalize, convert,          │
//! │  │  Migrations  │      apply_allocation) run in ONE transaction.       │
//! │  │  (embedded)  │                                                      │
//! │  └──────────────┘                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use fiado_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./fiado.db")).await?;
//! let pending = db.receivables().list_pending(&customer_id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CustomerRepository, DashboardRepository, DashboardSummary, ProductRepository, QuoteRepository,
    ReceivableRepository, SaleRepository, TopProduct, UserRepository,
};
