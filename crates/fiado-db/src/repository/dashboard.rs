//! # Dashboard Repository
//!
//! Read-only aggregate queries for the financial overview screen.
//!
//! Timestamps are stored as RFC3339 TEXT; day filters compare the date
//! prefix against an ISO date, so no timezone math happens in SQL. The
//! application treats the UTC date as the business day.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;

/// A point-in-time financial summary.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// ISO date the summary covers.
    pub date: NaiveDate,
    /// Revenue from completed sales on `date`, in centavos.
    pub revenue_today_cents: i64,
    /// Number of completed sales on `date`.
    pub sales_today: i64,
    /// Total outstanding crediário balance, all customers.
    pub outstanding_total_cents: i64,
    /// Pending receivables past their due date.
    pub overdue_count: i64,
    /// Quotes still open (convertible).
    pub open_quotes: i64,
    /// Best-selling products on `date`, by quantity.
    pub top_products: Vec<TopProduct>,
}

/// A best-selling product line for the day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Repository for dashboard aggregate queries.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    /// Creates a new DashboardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Computes the summary for the given business day.
    pub async fn summary(&self, date: NaiveDate) -> DbResult<DashboardSummary> {
        let day = date.to_string();

        let (revenue_today_cents, sales_today): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM sales
            WHERE status = 'completed' AND substr(completed_at, 1, 10) = ?
            "#,
        )
        .bind(&day)
        .fetch_one(&self.pool)
        .await?;

        let outstanding_total_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents - amount_paid_cents), 0)
            FROM receivables
            WHERE status = 'pending'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let overdue_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM receivables WHERE status = 'pending' AND due_date < ?",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let open_quotes: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quotes WHERE status = 'open'")
                .fetch_one(&self.pool)
                .await?;

        // Line items keep name snapshots, so renamed products still report
        // under the name they sold as.
        let top_products: Vec<TopProduct> = sqlx::query_as(
            r#"
            SELECT si.product_id,
                   si.name_snapshot AS name,
                   SUM(si.quantity) AS quantity_sold,
                   SUM(si.line_total_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE s.status = 'completed' AND substr(s.completed_at, 1, 10) = ?
            GROUP BY si.product_id, si.name_snapshot
            ORDER BY quantity_sold DESC, revenue_cents DESC
            LIMIT 5
            "#,
        )
        .bind(&day)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardSummary {
            date,
            revenue_today_cents,
            sales_today,
            outstanding_total_cents,
            overdue_count,
            open_quotes,
            top_products,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
