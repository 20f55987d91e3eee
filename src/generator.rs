//! Synthetic customer and order rows.
//!
//! Identifiers are built from a base value plus a random offset drawn from
//! [`ID_OFFSET_RANGE`]. They are collision resistant, not unique: two customers
//! generated within the same second collide with probability roughly
//! `1 / 990_000`. A collision surfaces as a data-class insert failure and the
//! tick is skipped.

use std::ops::Range;

use chrono::{Local, NaiveDateTime, Utc};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::Rng;

use crate::error::{FeedError, FeedResult};
use crate::model::{Customer, CustomerId, Order, ProductRef};

/// Random offset added to every generated identifier.
pub const ID_OFFSET_RANGE: Range<i64> = 10_000..1_000_000;

/// Mail providers used for generated email addresses.
pub const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "outlook.com",
    "hotmail.com",
    "proton.me",
    "protonmail.com",
    "yahoo.com",
    "icloud.com",
    "aol.com",
    "tutamail.com",
    "tuta.io",
    "tuta.com",
    "yandex.com",
    "example.com",
];

/// Separators placed between first and last name in generated email addresses.
pub const EMAIL_SEPARATORS: &[&str] = &["", "-", "_", ".", "--", "__"];

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Builds `<first><separator><last>@<domain>` with both names lowercased.
pub fn build_email(first_name: &str, last_name: &str, separator: &str, domain: &str) -> String {
    format!(
        "{}{separator}{}@{domain}",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    )
}

/// Generates `count` customers.
///
/// Each id is the current unix time plus a fresh random offset, recomputed per
/// record so that rows of the same batch differ even within one second.
pub fn generate_customers<R>(count: usize, rng: &mut R) -> Vec<Customer>
where
    R: Rng + ?Sized,
{
    (0..count)
        .map(|_| {
            let modified_date = now();
            let customer_id = Utc::now().timestamp() + rng.gen_range(ID_OFFSET_RANGE);

            let first_name: String = FirstName().fake_with_rng(rng);
            let last_name: String = LastName().fake_with_rng(rng);
            // Both slices are non-empty constants.
            let separator = EMAIL_SEPARATORS[rng.gen_range(0..EMAIL_SEPARATORS.len())];
            let domain = EMAIL_DOMAINS[rng.gen_range(0..EMAIL_DOMAINS.len())];
            let email = build_email(&first_name, &last_name, separator, domain);

            Customer {
                customer_id,
                first_name,
                last_name,
                email,
                modified_date,
            }
        })
        .collect()
}

/// Generates `count` orders referencing the given products and customers.
///
/// Fails with [`FeedError::InvalidReferenceData`] when either reference set is
/// empty, regardless of `count`.
pub fn generate_orders<R>(
    count: usize,
    products: &[ProductRef],
    customers: &[CustomerId],
    rng: &mut R,
) -> FeedResult<Vec<Order>>
where
    R: Rng + ?Sized,
{
    if products.is_empty() {
        return Err(FeedError::InvalidReferenceData(
            "product reference set is empty".to_string(),
        ));
    }
    if customers.is_empty() {
        return Err(FeedError::InvalidReferenceData(
            "customer reference set is empty".to_string(),
        ));
    }

    let mut orders = Vec::with_capacity(count);
    for _ in 0..count {
        let customer_id = customers[rng.gen_range(0..customers.len())];
        let product = products[rng.gen_range(0..products.len())];

        let order_id = customer_id + product.product_id + rng.gen_range(ID_OFFSET_RANGE);
        let quantity: i32 = rng.gen_range(1..=9);
        let date = now();

        orders.push(Order {
            order_id,
            product_id: product.product_id,
            customer_id,
            order_date: date,
            quantity,
            total_amount: f64::from(quantity) * product.price,
            modified_date: date,
        });
    }

    Ok(orders)
}
