//! Repository layer.
//!
//! Each repository is a zero-sized struct. Reads accept `&PgPool`; writes
//! used by the upsert executor accept an open transaction so a whole batch
//! commits or rolls back together.

pub mod client_repo;
pub mod item_repo;
pub mod line_item_repo;
pub mod order_repo;

pub use client_repo::ClientRepo;
pub use item_repo::ItemRepo;
pub use line_item_repo::LineItemRepo;
pub use order_repo::OrderRepo;

/// Transaction handle accepted by the write helpers.
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
