//! Insertion service: generates batches and writes them over one shared connection.
//!
//! Both jobs go through the same connection, guarded by a mutex so that
//! statements from the customer and order jobs never interleave. A connection
//! failure drops the connection, reconnects and regenerates the whole batch,
//! up to [`RetryConfig::max_attempts`](crate::retry::RetryConfig) attempts.
//! Data failures are not retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::FeederConfig;
use crate::db::{Connection, Connector};
use crate::error::{FeedError, FeedResult};
use crate::generator::{generate_customers, generate_orders};
use crate::reference::ReferenceData;
use crate::scheduler::Job;
use crate::shutdown::{wait_for_shutdown, ShutdownRx};

/// Kind of record a job writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Customers,
    Orders,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Customers => "customers",
            RecordKind::Orders => "orders",
        }
    }
}

pub struct Inserter<C: Connector> {
    connector: C,
    conn: Mutex<Option<C::Conn>>,
    config: Arc<FeederConfig>,
    shutdown_rx: Option<ShutdownRx>,
}

impl<C: Connector> Inserter<C> {
    /// Creates an inserter without connecting; the first operation connects lazily.
    pub fn new(connector: C, config: Arc<FeederConfig>) -> Self {
        Self {
            connector,
            conn: Mutex::new(None),
            config,
            shutdown_rx: None,
        }
    }

    /// Cuts retry backoff short once `shutdown_rx` reports shutdown.
    pub fn with_shutdown(mut self, shutdown_rx: ShutdownRx) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Establishes a fresh connection, replacing any previous one.
    ///
    /// The previous connection is dropped even if establishing the new one fails.
    pub async fn connect(&self) -> FeedResult<()> {
        let mut conn = self.conn.lock().await;
        *conn = None;
        *conn = Some(self.connector.connect().await?);

        info!(
            host = %self.config.database.host,
            database = %self.config.database.name,
            "connected to source database"
        );
        Ok(())
    }

    /// Generates and inserts one batch of customers.
    pub async fn insert_customers(&self) -> FeedResult<u64> {
        self.insert_with_retry(RecordKind::Customers).await
    }

    /// Fetches reference data, generates and inserts one batch of orders.
    pub async fn insert_orders(&self) -> FeedResult<u64> {
        self.insert_with_retry(RecordKind::Orders).await
    }

    async fn insert_with_retry(&self, kind: RecordKind) -> FeedResult<u64> {
        let retry = &self.config.retry;
        let mut attempt = 1;
        let mut result = self.try_insert(kind).await;

        loop {
            let err = match result {
                Ok(rows) => {
                    counter!("feeder.rows.inserted", "table" => kind.table()).increment(rows);
                    info!(
                        table = kind.table(),
                        rows,
                        attempt,
                        "successfully inserted {rows} records into {} table",
                        kind.table()
                    );
                    return Ok(rows);
                }
                Err(err) => err,
            };

            if !retry.should_retry(attempt, &err) {
                counter!("feeder.insert.failure", "table" => kind.table()).increment(1);

                if err.is_connection_retryable() {
                    error!(table = kind.table(), attempt, %err, "giving up on batch insert");
                    return Err(FeedError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }

                error!(table = kind.table(), %err, "batch insert rejected, skipping tick");
                return Err(err);
            }

            let delay = retry.backoff(attempt);
            warn!(
                table = kind.table(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                %err,
                "batch insert failed, reconnecting"
            );
            if self.backoff_interrupted(delay).await {
                warn!(table = kind.table(), attempt, "shutdown requested, abandoning retries");
                return Err(err);
            }

            attempt += 1;
            result = match self.connect().await {
                Ok(()) => self.try_insert(kind).await,
                Err(err) => Err(err),
            };
        }
    }

    /// Sleeps for `delay`. Returns `true` if shutdown was requested first.
    async fn backoff_interrupted(&self, delay: Duration) -> bool {
        let Some(shutdown_rx) = &self.shutdown_rx else {
            tokio::time::sleep(delay).await;
            return false;
        };

        let mut shutdown_rx = shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = wait_for_shutdown(&mut shutdown_rx) => true,
        }
    }

    async fn try_insert(&self, kind: RecordKind) -> FeedResult<u64> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connector.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(FeedError::Connection("no connection established".into()));
        };

        let result = self.insert_batch(conn, kind).await;
        if matches!(&result, Err(err) if err.is_connection_retryable()) {
            // A dead connection is never reused; the next attempt or tick reconnects.
            *guard = None;
        }
        result
    }

    async fn insert_batch(&self, conn: &mut C::Conn, kind: RecordKind) -> FeedResult<u64> {
        let count = self.config.batch_size;
        match kind {
            RecordKind::Customers => {
                let batch = generate_customers(count, &mut rand::thread_rng());
                conn.insert_customers(&batch).await
            }
            RecordKind::Orders => {
                let reference = ReferenceData::fetch(
                    &mut *conn,
                    self.config.customer_sample_limit,
                    self.config.customer_sample_percent,
                )
                .await?;
                let batch = generate_orders(
                    count,
                    &reference.products,
                    &reference.customer_ids,
                    &mut rand::thread_rng(),
                )?;
                conn.insert_orders(&batch).await
            }
        }
    }
}

/// Scheduler job inserting one batch of `kind` per tick.
pub struct InsertJob<C: Connector> {
    inserter: Arc<Inserter<C>>,
    kind: RecordKind,
}

impl<C: Connector> InsertJob<C> {
    pub fn new(inserter: Arc<Inserter<C>>, kind: RecordKind) -> Self {
        Self { inserter, kind }
    }
}

#[async_trait]
impl<C: Connector> Job for InsertJob<C> {
    fn name(&self) -> &str {
        match self.kind {
            RecordKind::Customers => "insert_customers",
            RecordKind::Orders => "insert_orders",
        }
    }

    async fn run(&self) -> FeedResult<()> {
        match self.kind {
            RecordKind::Customers => self.inserter.insert_customers().await?,
            RecordKind::Orders => self.inserter.insert_orders().await?,
        };
        Ok(())
    }
}
