//! Shared in-memory fixture: a small commerce schema plus a cyclic
//! three-table graph keyed by UUIDs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dbslice_catalog::{MockCatalog, MockTable};
use dbslice_core::SqlValue;

pub fn ts(s: &str) -> SqlValue {
    SqlValue::Timestamp(DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
}

pub fn uuid(s: &str) -> SqlValue {
    SqlValue::Uuid(uuid::Uuid::from_str(s).unwrap())
}

pub fn numeric(s: &str) -> SqlValue {
    SqlValue::Numeric(rust_decimal::Decimal::from_str(s).unwrap())
}

/// Commerce schema: `user_payment_methods` references `users` and
/// `orders`, `orders` references `users`, and two satellite tables
/// (`user_addresses`, `user_preferences`) reference `users` as well.
/// Rows for user 3 exist only to prove filtering excludes them.
pub fn sample_catalog() -> MockCatalog {
    MockCatalog::new("alpha")
        .table(
            MockTable::new("users", "id")
                .columns(&["id", "username", "email", "created_at", "status"])
                .row(vec![
                    SqlValue::Int(1),
                    SqlValue::from("john_doe"),
                    SqlValue::from("john@example.com"),
                    ts("2025-01-01T10:00:00.928501Z"),
                    SqlValue::from("active"),
                ])
                .row(vec![
                    SqlValue::Int(2),
                    SqlValue::from("jane_smith"),
                    SqlValue::from("jane@example.com"),
                    ts("2025-01-02T10:00:00.928502Z"),
                    SqlValue::from("active"),
                ])
                .row(vec![
                    SqlValue::Int(3),
                    SqlValue::from("bob_brown"),
                    SqlValue::from("bob@example.com"),
                    ts("2025-01-03T10:00:00Z"),
                    SqlValue::from("inactive"),
                ]),
        )
        .table(
            MockTable::new("orders", "id")
                .columns(&["id", "user_id", "order_date", "total_amount", "status"])
                .row(vec![
                    SqlValue::Int(1),
                    SqlValue::Int(1),
                    ts("2025-01-01T10:00:00Z"),
                    numeric("99.99"),
                    SqlValue::from("completed"),
                ])
                .row(vec![
                    SqlValue::Int(2),
                    SqlValue::Int(3),
                    ts("2025-01-05T10:00:00Z"),
                    numeric("49.99"),
                    SqlValue::from("pending"),
                ])
                .row(vec![
                    SqlValue::Int(3),
                    SqlValue::Int(2),
                    ts("2025-01-01T10:00:00Z"),
                    numeric("199.99"),
                    SqlValue::from("completed"),
                ]),
        )
        .table(
            MockTable::new("user_payment_methods", "id")
                .columns(&[
                    "id",
                    "user_id",
                    "order_id",
                    "payment_type",
                    "card_number",
                    "expiry_date",
                    "is_default",
                    "created_at",
                ])
                .row(vec![
                    SqlValue::Int(1),
                    SqlValue::Int(1),
                    SqlValue::Int(1),
                    SqlValue::from("credit_card"),
                    SqlValue::from("4111111111111111"),
                    ts("2025-12-01T00:00:00Z"),
                    SqlValue::Bool(true),
                    ts("2025-01-01T10:00:00Z"),
                ])
                .row(vec![
                    SqlValue::Int(2),
                    SqlValue::Int(1),
                    SqlValue::Null,
                    SqlValue::from("paypal"),
                    SqlValue::Null,
                    SqlValue::Null,
                    SqlValue::Bool(false),
                    ts("2025-01-02T11:00:00Z"),
                ])
                .row(vec![
                    SqlValue::Int(3),
                    SqlValue::Int(2),
                    SqlValue::Int(3),
                    SqlValue::from("credit_card"),
                    SqlValue::from("4222222222222222"),
                    ts("2024-10-01T00:00:00Z"),
                    SqlValue::Bool(true),
                    ts("2025-01-03T12:00:00Z"),
                ])
                .row(vec![
                    SqlValue::Int(4),
                    SqlValue::Int(3),
                    SqlValue::Int(2),
                    SqlValue::from("credit_card"),
                    SqlValue::from("4333333333333333"),
                    ts("2026-01-01T00:00:00Z"),
                    SqlValue::Bool(false),
                    ts("2025-01-04T09:00:00Z"),
                ]),
        )
        .table(
            MockTable::new("user_addresses", "id")
                .columns(&["id", "user_id", "city"])
                .row(vec![SqlValue::Int(1), SqlValue::Int(1), SqlValue::from("Berlin")])
                .row(vec![SqlValue::Int(2), SqlValue::Int(2), SqlValue::from("Paris")])
                .row(vec![SqlValue::Int(3), SqlValue::Int(3), SqlValue::from("Oslo")]),
        )
        .table(
            MockTable::new("user_preferences", "id")
                .columns(&["id", "user_id", "theme"])
                .row(vec![SqlValue::Int(1), SqlValue::Int(1), SqlValue::from("dark")])
                .row(vec![SqlValue::Int(2), SqlValue::Int(2), SqlValue::from("light")])
                .row(vec![SqlValue::Int(3), SqlValue::Int(3), SqlValue::from("dark")]),
        )
        .foreign_key("user_payment_methods", "user_id", "users", "id")
        .foreign_key("user_payment_methods", "order_id", "orders", "id")
        .foreign_key("orders", "user_id", "users", "id")
        .foreign_key("user_addresses", "user_id", "users", "id")
        .foreign_key("user_preferences", "user_id", "users", "id")
}

pub const ONE: &str = "11111111-1111-1111-1111-111111111111";
pub const TWO: &str = "22222222-2222-2222-2222-222222222222";
pub const THREE: &str = "33333333-3333-3333-3333-333333333333";

/// Mutually referencing tables: one -> two -> three -> one.
pub fn cyclic_catalog() -> MockCatalog {
    MockCatalog::new("alpha")
        .table(
            MockTable::new("table_one", "id")
                .columns(&["id", "two_id"])
                .row(vec![uuid(ONE), uuid(TWO)]),
        )
        .table(
            MockTable::new("table_two", "id")
                .columns(&["id", "three_id"])
                .row(vec![uuid(TWO), uuid(THREE)]),
        )
        .table(
            MockTable::new("table_three", "id")
                .columns(&["id", "one_id"])
                .row(vec![uuid(THREE), uuid(ONE)]),
        )
        .foreign_key("table_one", "two_id", "table_two", "id")
        .foreign_key("table_two", "three_id", "table_three", "id")
        .foreign_key("table_three", "one_id", "table_one", "id")
}
