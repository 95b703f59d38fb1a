//! # Fiado POS HTTP API
//!
//! JSON API over the POS, quotes, crediário, and dashboard.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         fiado-server                                    │
//! │                                                                         │
//! │  Client ───► axum Router ───► handlers ───► fiado-core (rules)         │
//! │                  │                │                                     │
//! │                  │                └────────► fiado-db (SQLite)          │
//! │                  ▼                                                      │
//! │            AuthUser extractor (JWT + role capabilities)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::ServerConfig;
pub use handlers::router;
pub use state::AppState;
