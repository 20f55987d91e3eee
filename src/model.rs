//! Row types written to and read from the source database.

use chrono::NaiveDateTime;

pub type CustomerId = i64;
pub type ProductId = i64;
pub type OrderId = i64;

/// A synthetic row for the `customers` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub modified_date: NaiveDateTime,
}

/// A synthetic row for the `orders` table.
///
/// `product_id` and `customer_id` always come from the reference snapshot the
/// order was generated against, and `total_amount` is `quantity * price` of that
/// product at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDateTime,
    pub quantity: i32,
    pub total_amount: f64,
    pub modified_date: NaiveDateTime,
}

/// `(id, unit price)` pair read from the `products` table.
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct ProductRef {
    pub product_id: ProductId,
    pub price: f64,
}

impl ProductRef {
    pub fn new(product_id: ProductId, price: f64) -> Self {
        Self { product_id, price }
    }
}
