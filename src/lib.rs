//! Synthetic customer and order feeder for a change-data-capture source database.
//!
//! Two recurring jobs insert small batches of generated customers and orders.
//! Orders reference products and customers that already exist in the database,
//! so the downstream CDC stream sees referentially consistent changes.

pub mod config;
pub mod connector;
pub mod db;
pub mod error;
pub mod generator;
pub mod inserter;
pub mod model;
pub mod reference;
pub mod retry;
pub mod scheduler;
pub mod shutdown;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::FeederConfig;
pub use error::{FeedError, FeedResult};
pub use inserter::{InsertJob, Inserter, RecordKind};
pub use scheduler::{Job, Scheduler};
