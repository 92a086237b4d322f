//! Row structs for the sales tables.
//!
//! Write-side rows come from [`salesbot_core::batch::UpsertPlan`]; these are
//! the read-side shapes. `NUMERIC` columns are selected as `float8`.

pub mod line_item;
pub mod order;
