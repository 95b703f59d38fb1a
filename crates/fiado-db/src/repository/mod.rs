//! # Repository Layer
//!
//! One repository per aggregate. Repositories own the SQL; callers deal
//! only in domain types from `fiado-core`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Repository Pattern                                │
//! │                                                                         │
//! │  Handler / Service                                                      │
//! │       │ domain types (Product, Sale, Receivable, ...)                   │
//! │       ▼                                                                 │
//! │  Repository  ── SQL + transactions ──►  SQLite                          │
//! │                                                                         │
//! │  Multi-table writes (sale finalization, quote conversion, payment       │
//! │  allocation) happen inside ONE transaction owned by the repository.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod dashboard;
pub mod product;
pub mod quote;
pub mod receivable;
pub mod sale;
pub mod user;

pub use customer::CustomerRepository;
pub use dashboard::{DashboardRepository, DashboardSummary, TopProduct};
pub use product::ProductRepository;
pub use quote::QuoteRepository;
pub use receivable::ReceivableRepository;
pub use sale::SaleRepository;
pub use user::UserRepository;
