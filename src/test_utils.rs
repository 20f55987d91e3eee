//! In-memory database doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::db::{Connection, Connector};
use crate::error::{FeedError, FeedResult};
use crate::model::{Customer, CustomerId, Order, ProductRef};

/// Failure injected into the next insert call.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Connection,
    Data,
}

impl Failure {
    fn into_error(self) -> FeedError {
        match self {
            Failure::Connection => FeedError::Connection("connection reset by peer".into()),
            Failure::Data => FeedError::Insert("duplicate key value violates unique constraint".into()),
        }
    }
}

/// One call to an insert method and which connection served it.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertAttempt {
    pub connection_id: u32,
    pub table: &'static str,
    pub committed: bool,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub products: Vec<ProductRef>,
    pub customer_ids: Vec<CustomerId>,
    pub connects: u32,
    pub failing_connects: u32,
    pub insert_failures: VecDeque<Failure>,
    pub attempts: Vec<InsertAttempt>,
    /// Connections that hit a connection failure and stay unusable.
    pub broken_connections: Vec<u32>,
    /// Connection id serving each `fetch_products` call.
    pub product_fetches: Vec<u32>,
    /// Connection id serving each `fetch_customer_sample` call.
    pub customer_samples: Vec<u32>,
    pub customers: Vec<Customer>,
    pub orders: Vec<Order>,
    pub rejected_customers: Vec<Customer>,
    pub rejected_orders: Vec<Order>,
}

impl MockState {
    pub fn commits(&self) -> usize {
        self.attempts.iter().filter(|a| a.committed).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn with_reference(products: Vec<ProductRef>, customer_ids: Vec<CustomerId>) -> Self {
        let connector = Self::default();
        {
            let mut state = connector.state.lock().unwrap();
            state.products = products;
            state.customer_ids = customer_ids;
        }
        connector
    }

    pub fn fail_next_inserts(&self, failures: impl IntoIterator<Item = Failure>) {
        self.state.lock().unwrap().insert_failures.extend(failures);
    }

    /// Clears every connection failure, as if the database came back.
    pub fn recover(&self) {
        let mut state = self.state.lock().unwrap();
        state.insert_failures.clear();
        state.failing_connects = 0;
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().unwrap().failing_connects = count;
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn connect(&self) -> FeedResult<MockConnection> {
        let mut state = self.state.lock().unwrap();
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(FeedError::Connection("password authentication failed".into()));
        }

        state.connects += 1;
        Ok(MockConnection {
            id: state.connects,
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    pub id: u32,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn ensure_usable(&self) -> FeedResult<()> {
        if self.state.lock().unwrap().broken_connections.contains(&self.id) {
            return Err(Failure::Connection.into_error());
        }
        Ok(())
    }

    fn record_insert(&self, table: &'static str) -> FeedResult<()> {
        let mut state = self.state.lock().unwrap();
        let failure = if state.broken_connections.contains(&self.id) {
            Some(Failure::Connection)
        } else {
            state.insert_failures.pop_front()
        };
        if let Some(Failure::Connection) = failure {
            state.broken_connections.push(self.id);
        }
        state.attempts.push(InsertAttempt {
            connection_id: self.id,
            table,
            committed: failure.is_none(),
        });

        match failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn fetch_products(&mut self) -> FeedResult<Vec<ProductRef>> {
        self.ensure_usable()?;
        let mut state = self.state.lock().unwrap();
        state.product_fetches.push(self.id);
        Ok(state.products.clone())
    }

    async fn fetch_customer_sample(
        &mut self,
        limit: u32,
        _percent: f64,
    ) -> FeedResult<Vec<CustomerId>> {
        self.ensure_usable()?;
        let mut state = self.state.lock().unwrap();
        state.customer_samples.push(self.id);
        Ok(state
            .customer_ids
            .iter()
            .copied()
            .take(limit as usize)
            .collect())
    }

    async fn insert_customers(&mut self, rows: &[Customer]) -> FeedResult<u64> {
        if let Err(err) = self.record_insert("customers") {
            self.state.lock().unwrap().rejected_customers.extend_from_slice(rows);
            return Err(err);
        }
        self.state.lock().unwrap().customers.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn insert_orders(&mut self, rows: &[Order]) -> FeedResult<u64> {
        if let Err(err) = self.record_insert("orders") {
            self.state.lock().unwrap().rejected_orders.extend_from_slice(rows);
            return Err(err);
        }
        self.state.lock().unwrap().orders.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}
