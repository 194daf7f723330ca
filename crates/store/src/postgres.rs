use std::num::NonZeroU32;

use async_trait::async_trait;
use domain::{Order, OrderStatus, Product};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderId, ProductId, Result, StoreError,
    store::{OrderStore, ProductStore, StockDecrement},
};

const DECREMENT_STOCK: &str =
    "UPDATE products SET quantity = quantity - 1 WHERE id = $1 AND quantity > 0";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            price: row.try_get::<Decimal, _>("price")?,
            quantity: u32::try_from(quantity).map_err(|_| {
                StoreError::InvalidData(format!("negative quantity {quantity}"))
            })?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let qty: i64 = row.try_get("qty")?;
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            qty: u32::try_from(qty)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| StoreError::InvalidData(format!("order qty {qty}")))?,
            total_price: row.try_get("total_price")?,
            status: match status.as_str() {
                "PENDING" => OrderStatus::Pending,
                other => {
                    return Err(StoreError::InvalidData(format!("order status {other}")));
                }
            },
            created_at: row.try_get("created_at")?,
        })
    }

    fn map_insert_error(e: sqlx::Error, what: String) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StoreError::DuplicateKey(what);
        }
        StoreError::Database(e)
    }
}

#[async_trait]
impl ProductStore for PostgresStore {
    async fn create_product(&self, product: Product) -> Result<Product> {
        let quantity = i32::try_from(product.quantity).map_err(|_| {
            StoreError::InvalidData(format!("quantity {} too large", product.quantity))
        })?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, format!("product {}", product.id)))?;

        Ok(product)
    }

    async fn find_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price, quantity
            FROM products
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, name, price, quantity
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn decrement_stock(&self, id: ProductId) -> Result<u64> {
        let result = sqlx::query(DECREMENT_STOCK)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn decrement_stock_once(
        &self,
        id: ProductId,
        order_id: OrderId,
    ) -> Result<StockDecrement> {
        let mut tx = self.pool.begin().await?;

        // Concurrent deliveries of the same order serialize on the primary key.
        let recorded = sqlx::query(
            r#"
            INSERT INTO processed_orders (order_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if recorded == 0 {
            tracing::debug!(%order_id, "order already in processed ledger");
            tx.rollback().await?;
            return Ok(StockDecrement::AlreadyProcessed);
        }

        let updated = sqlx::query(DECREMENT_STOCK)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(if updated == 1 {
            StockDecrement::Applied
        } else {
            StockDecrement::NotApplied
        })
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: Order) -> Result<Order> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, product_id, qty, total_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.product_id.as_uuid())
        .bind(i64::from(order.qty.get()))
        .bind(order.total_price)
        .bind(order.status.to_string())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error(e, format!("order {}", order.id)))?;

        Ok(order)
    }

    async fn find_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, qty, total_price, status, created_at
            FROM orders
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn find_orders_for_product(&self, product_id: ProductId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, qty, total_price, status, created_at
            FROM orders
            WHERE product_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn delete_orders(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM orders")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
