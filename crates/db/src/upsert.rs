//! Transactional executor for [`UpsertPlan`].
//!
//! Statement order inside the single transaction:
//!
//! 1. delete retracted (unconfirmed) orders, cascading to their lines
//! 2. insert missing clients
//! 3. upsert confirmed orders
//! 4. insert missing items
//! 5. upsert lines by `(order_id, line_no)`
//! 6. prune lines past each resubmitted order's new item count
//!
//! Any store failure rolls the whole batch back.

use salesbot_core::batch::{IngestBatch, UpsertPlan};
use salesbot_core::error::CoreError;
use serde::Serialize;
use sqlx::PgPool;

use crate::repositories::{ClientRepo, ItemRepo, LineItemRepo, OrderRepo};
use crate::schema::SalesSchema;

/// Row counts from one applied plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub orders_deleted: u64,
    pub clients_created: u64,
    pub orders_upserted: u64,
    pub items_created: u64,
    pub lines_upserted: u64,
    pub lines_pruned: u64,
}

impl UpsertSummary {
    pub fn merge(&mut self, other: UpsertSummary) {
        self.orders_deleted += other.orders_deleted;
        self.clients_created += other.clients_created;
        self.orders_upserted += other.orders_upserted;
        self.items_created += other.items_created;
        self.lines_upserted += other.lines_upserted;
        self.lines_pruned += other.lines_pruned;
    }
}

/// Execute a plan in one transaction.
///
/// Store failures surface as [`CoreError::Transport`] and nothing is
/// committed.
pub async fn apply_plan(
    pool: &PgPool,
    schema: &SalesSchema,
    plan: &UpsertPlan,
) -> Result<UpsertSummary, CoreError> {
    if plan.is_empty() {
        return Ok(UpsertSummary::default());
    }
    let summary = execute(pool, schema, plan).await.map_err(|e| {
        tracing::error!(error = %e, table = schema.orders(), "Upsert rolled back");
        CoreError::Transport(format!("upsert into '{}' failed: {e}", schema.orders()))
    })?;
    tracing::info!(
        table = schema.orders(),
        deleted = summary.orders_deleted,
        orders = summary.orders_upserted,
        lines = summary.lines_upserted,
        clients_created = summary.clients_created,
        items_created = summary.items_created,
        pruned = summary.lines_pruned,
        "Upsert committed"
    );
    Ok(summary)
}

/// Plan and apply an already validated batch.
pub async fn ingest(
    pool: &PgPool,
    schema: &SalesSchema,
    batch: &IngestBatch,
) -> Result<UpsertSummary, CoreError> {
    apply_plan(pool, schema, &batch.plan()).await
}

async fn execute(
    pool: &PgPool,
    schema: &SalesSchema,
    plan: &UpsertPlan,
) -> Result<UpsertSummary, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut summary = UpsertSummary {
        orders_deleted: OrderRepo::delete_many(&mut tx, schema, &plan.deletions).await?,
        clients_created: ClientRepo::insert_missing(&mut tx, &plan.clients).await?,
        ..UpsertSummary::default()
    };

    for order in &plan.orders {
        OrderRepo::upsert(&mut tx, schema, order).await?;
        summary.orders_upserted += 1;
    }

    summary.items_created = ItemRepo::insert_missing(&mut tx, &plan.items).await?;

    for line in &plan.lines {
        LineItemRepo::upsert(&mut tx, schema, line).await?;
        summary.lines_upserted += 1;
    }

    for prune in &plan.prunes {
        summary.lines_pruned += LineItemRepo::prune(&mut tx, schema, prune).await?;
    }

    tx.commit().await?;
    Ok(summary)
}
