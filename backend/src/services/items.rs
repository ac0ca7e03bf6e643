//! Storage of order-item snapshots for orders and proposal versions

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use shared::OrderItem;

use super::parse_stored;
use crate::error::AppResult;

/// Which table an item list belongs to
#[derive(Debug, Clone, Copy)]
pub enum ItemOwner {
    Order,
    Version,
}

impl ItemOwner {
    fn table(&self) -> &'static str {
        match self {
            ItemOwner::Order => "order_items",
            ItemOwner::Version => "vmi_version_items",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            ItemOwner::Order => "order_id",
            ItemOwner::Version => "version_id",
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    owner_id: Uuid,
    product_id: String,
    name: String,
    product_type: String,
    price: Decimal,
    order_qty: i32,
    line_total: Decimal,
    sku: String,
    category: String,
    business_unit: String,
}

impl ItemRow {
    fn into_item(self) -> AppResult<OrderItem> {
        Ok(OrderItem {
            business_unit: parse_stored(&self.business_unit, "items.business_unit")?,
            product_id: self.product_id,
            name: self.name,
            product_type: self.product_type,
            price: self.price,
            order_qty: self.order_qty,
            line_total: self.line_total,
            sku: self.sku,
            category: self.category,
        })
    }
}

/// Write `items` in list order under `owner_id`
pub async fn insert_items(
    conn: &mut PgConnection,
    owner: ItemOwner,
    owner_id: Uuid,
    items: &[OrderItem],
) -> AppResult<()> {
    let sql = format!(
        r#"
        INSERT INTO {} ({}, position, product_id, name, product_type, price,
                        order_qty, line_total, sku, category, business_unit)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        owner.table(),
        owner.owner_column()
    );

    for (position, item) in items.iter().enumerate() {
        sqlx::query(&sql)
            .bind(owner_id)
            .bind(position as i32)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(&item.product_type)
            .bind(item.price)
            .bind(item.order_qty)
            .bind(item.line_total)
            .bind(&item.sku)
            .bind(&item.category)
            .bind(item.business_unit.as_str())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Item lists of several owners, each in stored order
pub async fn load_items(
    conn: &mut PgConnection,
    owner: ItemOwner,
    owner_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
    let sql = format!(
        r#"
        SELECT {} AS owner_id, product_id, name, product_type, price,
               order_qty, line_total, sku, category, business_unit
        FROM {}
        WHERE {} = ANY($1)
        ORDER BY {}, position
        "#,
        owner.owner_column(),
        owner.table(),
        owner.owner_column(),
        owner.owner_column()
    );

    let rows = sqlx::query_as::<_, ItemRow>(&sql)
        .bind(owner_ids)
        .fetch_all(&mut *conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::with_capacity(owner_ids.len());
    for row in rows {
        let owner_id = row.owner_id;
        grouped.entry(owner_id).or_default().push(row.into_item()?);
    }

    Ok(grouped)
}
