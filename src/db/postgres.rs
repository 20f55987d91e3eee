use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgConnection, Postgres};
use sqlx::Connection as _;
use sqlx::QueryBuilder;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::db::{Connection, Connector};
use crate::error::{FeedError, FeedResult};
use crate::model::{Customer, CustomerId, Order, ProductRef};

const INSERT_CUSTOMERS: &str =
    "INSERT INTO customers (customer_id, first_name, last_name, email, modified_date) ";

const INSERT_ORDERS: &str = "INSERT INTO orders (order_id, product_id, customer_id, order_date, quantity, total_amount, modified_date) ";

const SELECT_PRODUCTS: &str =
    "SELECT product_id::int8 AS product_id, price::float8 AS price FROM products";

const SAMPLE_CUSTOMERS: &str = "SELECT customer_id::int8 FROM customers TABLESAMPLE BERNOULLI ($1::real) LIMIT $2";

/// Returns `true` when `err` means the connection itself is unusable.
///
/// SQLSTATE class `08` covers connection exceptions; `57P01`..`57P03` are
/// server shutdown and startup conditions.
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code.starts_with("08") || matches!(&*code, "57P01" | "57P02" | "57P03")
        }),
        _ => false,
    }
}

fn query_error(err: sqlx::Error) -> FeedError {
    if is_connection_error(&err) {
        FeedError::Connection(Box::new(err))
    } else {
        FeedError::Query(Box::new(err))
    }
}

fn insert_error(err: sqlx::Error) -> FeedError {
    if is_connection_error(&err) {
        FeedError::Connection(Box::new(err))
    } else {
        FeedError::Insert(Box::new(err))
    }
}

/// Connects to Postgres with the configured host, port, credentials and database.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(config.password.expose_secret())
            .database(&config.name)
            .application_name(env!("CARGO_PKG_NAME"));

        Self { options }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Conn = PgSourceConnection;

    async fn connect(&self) -> FeedResult<PgSourceConnection> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|err| FeedError::Connection(Box::new(err)))?;

        Ok(PgSourceConnection { conn })
    }
}

pub struct PgSourceConnection {
    conn: PgConnection,
}

#[async_trait]
impl Connection for PgSourceConnection {
    async fn fetch_products(&mut self) -> FeedResult<Vec<ProductRef>> {
        sqlx::query_as::<_, ProductRef>(SELECT_PRODUCTS)
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error)
    }

    async fn fetch_customer_sample(
        &mut self,
        limit: u32,
        percent: f64,
    ) -> FeedResult<Vec<CustomerId>> {
        sqlx::query_scalar::<_, CustomerId>(SAMPLE_CUSTOMERS)
            .bind(percent)
            .bind(i64::from(limit))
            .fetch_all(&mut self.conn)
            .await
            .map_err(query_error)
    }

    async fn insert_customers(&mut self, rows: &[Customer]) -> FeedResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.conn.begin().await.map_err(insert_error)?;
        let result = QueryBuilder::<Postgres>::new(INSERT_CUSTOMERS)
            .push_values(rows, |mut b, customer| {
                b.push_bind(customer.customer_id)
                    .push_bind(customer.first_name.clone())
                    .push_bind(customer.last_name.clone())
                    .push_bind(customer.email.clone())
                    .push_bind(customer.modified_date);
            })
            .build()
            .execute(&mut *tx)
            .await
            .map_err(insert_error)?;
        tx.commit().await.map_err(insert_error)?;

        debug!(rows = result.rows_affected(), "committed customers batch");
        Ok(result.rows_affected())
    }

    async fn insert_orders(&mut self, rows: &[Order]) -> FeedResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.conn.begin().await.map_err(insert_error)?;
        let result = QueryBuilder::<Postgres>::new(INSERT_ORDERS)
            .push_values(rows, |mut b, order| {
                b.push_bind(order.order_id)
                    .push_bind(order.product_id)
                    .push_bind(order.customer_id)
                    .push_bind(order.order_date)
                    .push_bind(order.quantity)
                    .push_bind(order.total_amount)
                    .push_unseparated("::numeric")
                    .push_bind(order.modified_date);
            })
            .build()
            .execute(&mut *tx)
            .await
            .map_err(insert_error)?;
        tx.commit().await.map_err(insert_error)?;

        debug!(rows = result.rows_affected(), "committed orders batch");
        Ok(result.rows_affected())
    }
}
