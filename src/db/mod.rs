//! Boundary with the source database.
//!
//! The feeder only needs four operations from the database: read the product
//! catalogue, sample existing customers, and write a batch of customers or
//! orders in a single committed statement. [`postgres`] implements them with
//! sqlx; tests substitute in-memory doubles.

pub mod postgres;

use async_trait::async_trait;

use crate::error::FeedResult;
use crate::model::{Customer, CustomerId, Order, ProductRef};

/// Opens new connections to the source database.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    /// Establishes a fresh connection.
    ///
    /// Fails with [`crate::error::FeedError::Connection`] when the host is
    /// unreachable or the credentials are rejected.
    async fn connect(&self) -> FeedResult<Self::Conn>;
}

/// A single exclusively-owned database connection.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Returns every `(product_id, price)` pair in the catalogue.
    async fn fetch_products(&mut self) -> FeedResult<Vec<ProductRef>>;

    /// Returns at most `limit` customer ids from an approximate `percent` sample.
    async fn fetch_customer_sample(
        &mut self,
        limit: u32,
        percent: f64,
    ) -> FeedResult<Vec<CustomerId>>;

    /// Inserts `rows` with one statement and commits. Returns the affected row count.
    async fn insert_customers(&mut self, rows: &[Customer]) -> FeedResult<u64>;

    /// Inserts `rows` with one statement and commits. Returns the affected row count.
    async fn insert_orders(&mut self, rows: &[Order]) -> FeedResult<u64>;
}
