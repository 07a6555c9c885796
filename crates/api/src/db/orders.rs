//! Order repository for database operations.
//!
//! Orders are stored as a header row plus one `order_items` row per line.
//! History queries populate each line with its product and each order with
//! its address.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use greenbasket_core::{AddressId, OrderId, PaymentType, UserId, order_status};

use super::RepositoryError;
use super::addresses::{ADDRESS_COLUMNS, AddressRow};
use super::products::ProductRow;
use crate::models::address::Address;
use crate::models::order::{NewOrder, Order, OrderDetails, OrderLine};
use crate::models::product::Product;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for order header queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    amount: Decimal,
    address_id: i32,
    payment_type: PaymentType,
    is_paid: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// An order line joined with its product.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: i32,
    quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

const ORDER_COLUMNS: &str =
    "id, user_id, amount, address_id, payment_type, is_paid, status, created_at, updated_at";

fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity).map_err(|_| {
        RepositoryError::DataCorruption(format!("invalid order quantity in database: {quantity}"))
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order and its lines in one transaction.
    ///
    /// New orders are unpaid with status `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either insert fails.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders (user_id, amount, address_id, payment_type, is_paid, status)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.amount)
        .bind(order.address)
        .bind(order.payment_type)
        .bind(order_status::PENDING)
        .fetch_one(&mut *tx)
        .await?;

        let product_ids: Vec<i32> = order.items.iter().map(|i| i.product.as_i32()).collect();
        let quantities = order
            .items
            .iter()
            .map(|i| i32::try_from(i.quantity).map_err(|e| sqlx::Error::Encode(e.into())))
            .collect::<Result<Vec<i32>, _>>()?;

        sqlx::query(
            r"
            INSERT INTO shop.order_items (order_id, product_id, quantity)
            SELECT $1, item.product_id, item.quantity
            FROM UNNEST($2::int4[], $3::int4[]) AS item(product_id, quantity)
            ",
        )
        .bind(row.id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Order {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: order.items.clone(),
            amount: row.amount,
            address: AddressId::new(row.address_id),
            payment_type: row.payment_type,
            is_paid: row.is_paid,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// A user's orders, newest first, with products and address populated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// Every order, newest first, with products and address populated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn list_all(&self) -> Result<Vec<OrderDetails>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.populate(rows).await
    }

    /// Mark an order paid and completed and empty the buyer's cart, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if an update fails.
    pub async fn mark_paid(&self, id: OrderId, user_id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE shop.orders
            SET is_paid = TRUE, status = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(order_status::COMPLETED)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE shop.users SET cart_items = '{}'::jsonb, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete an order and its lines. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach lines and addresses to order header rows, keeping row order.
    async fn populate(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderDetails>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let address_ids: Vec<i32> = rows.iter().map(|r| r.address_id).collect();

        let line_rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT oi.order_id, oi.quantity,
                   p.id, p.name, p.description, p.category, p.price, p.offer_price,
                   p.image, p.in_stock, p.created_at, p.updated_at
            FROM shop.order_items oi
            JOIN shop.products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;

        let address_rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses WHERE id = ANY($1)"
        ))
        .bind(&address_ids)
        .fetch_all(self.pool)
        .await?;

        let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            lines.entry(row.order_id).or_default().push(OrderLine {
                quantity: quantity_from_db(row.quantity)?,
                product: Product::from(row.product),
            });
        }

        let mut addresses: HashMap<AddressId, Address> = HashMap::new();
        for row in address_rows {
            let address = Address::try_from(row)?;
            addresses.insert(address.id, address);
        }

        rows.into_iter()
            .map(|row| {
                let address_id = AddressId::new(row.address_id);
                let address = addresses.get(&address_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "order {} references missing address {address_id}",
                        row.id
                    ))
                })?;

                Ok(OrderDetails {
                    id: OrderId::new(row.id),
                    user_id: UserId::new(row.user_id),
                    items: lines.remove(&row.id).unwrap_or_default(),
                    amount: row.amount,
                    address,
                    payment_type: row.payment_type,
                    is_paid: row.is_paid,
                    status: row.status,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }
}
