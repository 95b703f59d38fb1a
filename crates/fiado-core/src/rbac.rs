//! # Role-Based Access Control
//!
//! Closed enumeration of operator roles with capability checks.
//!
//! Roles are a fixed enum, not a string list: an operator always has exactly
//! one role, membership checks are exhaustive `match` arms, and a role that
//! the code does not know about cannot exist in a running system.
//!
//! ## Capability Matrix
//! ```text
//! ┌────────────────────┬───────┬─────────┬─────────┐
//! │ Capability         │ Admin │ Manager │ Cashier │
//! ├────────────────────┼───────┼─────────┼─────────┤
//! │ Sell               │  ✓    │   ✓     │   ✓     │
//! │ SettleCredit       │  ✓    │   ✓     │   ✓     │
//! │ ManageQuotes       │  ✓    │   ✓     │   ✓     │
//! │ ManageProducts     │  ✓    │   ✓     │         │
//! │ ViewDashboard      │  ✓    │   ✓     │         │
//! │ ManageUsers        │  ✓    │         │         │
//! └────────────────────┴───────┴─────────┴─────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operator role. Every user account carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// An action a role may or may not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Ring sales at the register.
    Sell,
    /// Receive crediário payments.
    SettleCredit,
    /// Create, look up, and convert quotes.
    ManageQuotes,
    /// Create and edit the product catalog.
    ManageProducts,
    /// View the financial dashboard.
    ViewDashboard,
    /// Create and deactivate operator accounts.
    ManageUsers,
}

impl Role {
    /// Whether this role is allowed to perform `capability`.
    pub fn can(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Manager => !matches!(capability, ManageUsers),
            Role::Cashier => matches!(capability, Sell | SettleCredit | ManageQuotes),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
