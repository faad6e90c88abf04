//! MySQL inventory source (sqlx).
//!
//! Implements the `stockbot-core` [`InventorySource`] port against a shop
//! database where `goods` holds the catalog and `carmis` holds one row per
//! deliverable unit (`status = 1` means unsold).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions, MySqlRow},
    pool::PoolConnection,
    MySql, Row,
};
use tracing::debug;

use stockbot_core::{domain::InventoryItem, errors::Error, source::InventorySource, Result};

/// In-stock count per catalog item, only items with stock, ascending by id.
///
/// Price is read as text so the decimal column keeps its exact digits until
/// it is normalized on our side.
pub const IN_STOCK_QUERY: &str = r#"
SELECT
    CAST(g.id AS SIGNED) AS id,
    g.gd_name AS name,
    CAST(g.actual_price AS CHAR) AS price,
    CAST(COUNT(CASE WHEN c.status = 1 THEN 1 END) AS SIGNED) AS in_stock
FROM goods g
LEFT JOIN carmis c ON g.id = c.goods_id
GROUP BY g.id, g.gd_name, g.actual_price
HAVING in_stock > 0
ORDER BY g.id ASC
"#;

pub struct MySqlInventorySource {
    pool: MySqlPool,
}

impl MySqlInventorySource {
    /// Build a lazily-connecting pool; no connection is opened until the first poll.
    pub fn new(database_url: &str, connect_timeout: Duration) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .min_connections(0)
            .acquire_timeout(connect_timeout)
            .idle_timeout(Duration::from_secs(60))
            .connect_lazy(database_url)
            .map_err(|e| Error::Config(format!("invalid database url: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl InventorySource for MySqlInventorySource {
    type Connection = PoolConnection<MySql>;

    async fn connect(&self) -> Result<Self::Connection> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| Error::External(format!("mysql connect failed: {e}")))?;
        debug!("mysql connection acquired");
        Ok(conn)
    }

    async fn query_in_stock(&self, conn: &mut Self::Connection) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query(IN_STOCK_QUERY)
            .fetch_all(&mut **conn)
            .await
            .map_err(|e| Error::Query(e.to_string()))?;

        rows.iter().map(item_from_row).collect()
    }
}

fn item_from_row(row: &MySqlRow) -> Result<InventoryItem> {
    let id: i64 = row.try_get("id").map_err(query_err)?;
    let name: Option<String> = row.try_get("name").map_err(query_err)?;
    let price: Option<String> = row.try_get("price").map_err(query_err)?;
    let in_stock: i64 = row.try_get("in_stock").map_err(query_err)?;
    item_from_parts(id, name.unwrap_or_default(), price.as_deref(), in_stock)
}

fn item_from_parts(
    id: i64,
    name: String,
    price: Option<&str>,
    in_stock: i64,
) -> Result<InventoryItem> {
    let price = match price {
        Some(text) => parse_price(text)
            .ok_or_else(|| Error::Query(format!("item {id}: invalid price {text:?}")))?,
        None => 0.0,
    };
    let stock = u32::try_from(in_stock)
        .map_err(|_| Error::Query(format!("item {id}: invalid stock {in_stock}")))?;

    Ok(InventoryItem {
        id,
        name,
        price,
        stock,
    })
}

fn parse_price(text: &str) -> Option<f64> {
    let v = text.trim().parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

fn query_err(e: sqlx::Error) -> Error {
    Error::Query(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_text_is_normalized() {
        let item = item_from_parts(3, "Netflix".to_string(), Some("12.50"), 4).unwrap();
        assert_eq!(item.price, 12.5);
        assert_eq!(item.stock, 4);
        assert_eq!(item.key(), "3");
    }

    #[test]
    fn null_price_reads_as_zero() {
        let item = item_from_parts(1, "Free".to_string(), None, 1).unwrap();
        assert_eq!(item.price, 0.0);
    }

    #[test]
    fn bad_price_or_negative_stock_is_query_error() {
        assert!(matches!(
            item_from_parts(1, "x".to_string(), Some("abc"), 1),
            Err(Error::Query(_))
        ));
        assert!(matches!(
            item_from_parts(1, "x".to_string(), Some("1.00"), -2),
            Err(Error::Query(_))
        ));
        assert!(parse_price("NaN").is_none());
    }

    #[test]
    fn query_filters_and_orders_in_sql() {
        assert!(IN_STOCK_QUERY.contains("HAVING in_stock > 0"));
        assert!(IN_STOCK_QUERY.contains("ORDER BY g.id ASC"));
        assert!(IN_STOCK_QUERY.contains("c.status = 1"));
    }

    #[tokio::test]
    async fn lazy_pool_accepts_url_without_connecting() {
        let src = MySqlInventorySource::new(
            "mysql://user:pw@127.0.0.1:1/shop",
            Duration::from_millis(50),
        );
        assert!(src.is_ok());
    }
}
