//! HTTP ingestion service for sales batches.
//!
//! Accepts order batches over HTTP, validates them against the ingestion
//! contract and upserts them into Postgres one batch at a time.

pub mod backup;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
