//! Reference snapshot read before every order batch.
//!
//! Products and a bounded customer sample supply the foreign keys that keep
//! generated orders referentially valid. Errors from the connection are
//! returned unchanged; retrying is the caller's business.

use tracing::debug;

use crate::db::Connection;
use crate::error::FeedResult;
use crate::model::{CustomerId, ProductRef};

/// Default upper bound on sampled customer ids.
pub const DEFAULT_SAMPLE_LIMIT: u32 = 20;

/// Products and customers that orders may reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub products: Vec<ProductRef>,
    pub customer_ids: Vec<CustomerId>,
}

impl ReferenceData {
    /// Reads the product catalogue and a customer sample from `conn`.
    pub async fn fetch<C>(conn: &mut C, sample_limit: u32, sample_percent: f64) -> FeedResult<Self>
    where
        C: Connection + ?Sized,
    {
        let products = fetch_products(conn).await?;
        let customer_ids = fetch_customer_sample(conn, sample_limit, sample_percent).await?;

        debug!(
            products = products.len(),
            customers = customer_ids.len(),
            "fetched reference data"
        );

        Ok(Self {
            products,
            customer_ids,
        })
    }
}

/// Returns all `(product_id, price)` pairs.
pub async fn fetch_products<C>(conn: &mut C) -> FeedResult<Vec<ProductRef>>
where
    C: Connection + ?Sized,
{
    conn.fetch_products().await
}

/// Returns an approximate random sample of at most `limit` customer ids.
///
/// The sample is percentage based, so fewer than `limit` ids is a valid result.
pub async fn fetch_customer_sample<C>(
    conn: &mut C,
    limit: u32,
    percent: f64,
) -> FeedResult<Vec<CustomerId>>
where
    C: Connection + ?Sized,
{
    let mut ids = conn.fetch_customer_sample(limit, percent).await?;
    ids.truncate(limit as usize);
    Ok(ids)
}
