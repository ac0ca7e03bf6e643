//! Catalog reads: price lookups for reconciliation and brand-filtered listings

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use shared::{
    admin_listing, catalog_scope, public_brand_scope, public_listing, BusinessUnit, CatalogEntry,
    CatalogProduct, CatalogView, FulfillmentUnit, InventoryThresholds, NotificationBucket,
};

use super::parse_stored;
use crate::error::AppResult;

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    sku: String,
    product_type: String,
    category: String,
    price: Decimal,
    business_unit: String,
    qty_in_stock: i32,
}

impl ProductRow {
    fn into_product(self) -> AppResult<CatalogProduct> {
        Ok(CatalogProduct {
            entry: CatalogEntry {
                business_unit: parse_stored(&self.business_unit, "products.business_unit")?,
                product_id: self.id,
                name: self.name,
                sku: self.sku,
                product_type: self.product_type,
                category: self.category,
                price: self.price,
            },
            qty_in_stock: self.qty_in_stock,
        })
    }
}

#[derive(Debug, FromRow)]
struct SettingRow {
    key: String,
    value: String,
}

const PRODUCT_COLUMNS: &str = r#"
    SELECT p.id, p.name, p.sku, pt.name AS product_type, pt.category, pt.price,
           p.business_unit, p.qty_in_stock
    FROM products p
    JOIN product_types pt ON pt.id = p.product_type_id
"#;

fn unit_names(units: &[BusinessUnit]) -> Vec<String> {
    units.iter().map(|u| u.as_str().to_string()).collect()
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current catalog entries for the given product ids, keyed by id.
    /// Ids with no product are simply absent from the map.
    pub async fn load_entries(
        conn: &mut PgConnection,
        product_ids: &[String],
    ) -> AppResult<HashMap<String, CatalogEntry>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{} WHERE p.id = ANY($1)", PRODUCT_COLUMNS))
            .bind(product_ids)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|row| -> AppResult<(String, CatalogEntry)> {
                let product = row.into_product()?;
                Ok((product.entry.product_id.clone(), product.entry))
            })
            .collect()
    }

    async fn products_in(&self, units: &[BusinessUnit]) -> AppResult<Vec<CatalogProduct>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{} WHERE p.business_unit = ANY($1) ORDER BY pt.category, p.name",
            PRODUCT_COLUMNS
        ))
        .bind(unit_names(units))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Products of an admin catalog view
    pub async fn admin_catalog(&self, view: CatalogView) -> AppResult<Vec<CatalogProduct>> {
        let products = self.products_in(catalog_scope(view)).await?;
        Ok(admin_listing(&products, view))
    }

    /// Products a dispensary sees on the storefront for a brand selection
    pub async fn public_catalog(
        &self,
        selection: FulfillmentUnit,
        defaults: InventoryThresholds,
    ) -> AppResult<Vec<CatalogProduct>> {
        let thresholds = self.inventory_thresholds(defaults).await?;
        let products = self.products_in(public_brand_scope(selection)).await?;
        Ok(public_listing(&products, selection, &thresholds))
    }

    /// Stored stock thresholds, falling back to `defaults` per bucket
    pub async fn inventory_thresholds(&self, defaults: InventoryThresholds) -> AppResult<InventoryThresholds> {
        let sunshine_key = InventoryThresholds::setting_key(NotificationBucket::Sunshine);
        let fairwinds_key = InventoryThresholds::setting_key(NotificationBucket::Fairwinds);

        let rows = sqlx::query_as::<_, SettingRow>(
            r#"
            SELECT key, value
            FROM application_settings
            WHERE key = ANY($1)
            "#,
        )
        .bind(vec![sunshine_key.clone(), fairwinds_key.clone()])
        .fetch_all(&self.db)
        .await?;

        let mut thresholds = defaults;
        for row in rows {
            let value = match row.value.trim().parse::<i32>() {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(key = %row.key, value = %row.value, "Ignoring non-numeric inventory threshold");
                    continue;
                }
            };
            if row.key == sunshine_key {
                thresholds.sunshine = value;
            } else if row.key == fairwinds_key {
                thresholds.fairwinds = value;
            }
        }

        Ok(thresholds)
    }
}
