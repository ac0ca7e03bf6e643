//! Catalog entries and the brand-filtered listings built from them

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::business_unit::{catalog_scope, public_brand_scope, BusinessUnit, CatalogView, FulfillmentUnit, NotificationBucket};

/// Current catalog data for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub product_type: String,
    pub category: String,
    pub price: Decimal,
    pub business_unit: BusinessUnit,
}

/// A catalog entry with its stock level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub qty_in_stock: i32,
}

/// Stock level at or below which a product is hidden from the storefront.
/// Passion Flower shares the Fairwinds threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryThresholds {
    pub sunshine: i32,
    pub fairwinds: i32,
}

impl InventoryThresholds {
    pub fn uniform(threshold: i32) -> Self {
        Self {
            sunshine: threshold,
            fairwinds: threshold,
        }
    }

    pub fn for_unit(&self, unit: BusinessUnit) -> i32 {
        match NotificationBucket::from(unit) {
            NotificationBucket::Sunshine => self.sunshine,
            NotificationBucket::Fairwinds => self.fairwinds,
        }
    }

    /// Settings key holding the threshold of a bucket
    pub fn setting_key(bucket: NotificationBucket) -> String {
        format!("inventory_threshold_{}", bucket)
    }
}

/// Products shown in an admin catalog view
pub fn admin_listing(products: &[CatalogProduct], view: CatalogView) -> Vec<CatalogProduct> {
    let scope = catalog_scope(view);
    products
        .iter()
        .filter(|p| scope.contains(&p.entry.business_unit))
        .cloned()
        .collect()
}

/// Products shown on the public storefront for a brand selection
pub fn public_listing(
    products: &[CatalogProduct],
    selection: FulfillmentUnit,
    thresholds: &InventoryThresholds,
) -> Vec<CatalogProduct> {
    let scope = public_brand_scope(selection);
    products
        .iter()
        .filter(|p| scope.contains(&p.entry.business_unit))
        .filter(|p| p.qty_in_stock > thresholds.for_unit(p.entry.business_unit))
        .cloned()
        .collect()
}
