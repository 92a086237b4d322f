pub mod aliases;
pub mod batch;
pub mod error;
pub mod fake;
pub mod normalize;
pub mod params;
pub mod registry;
pub mod report;
pub mod reports;
pub mod runner;
pub mod sales;
pub mod source;
pub mod table;
pub mod types;
pub mod window;
