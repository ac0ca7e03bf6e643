//! Business-unit partitioning
//!
//! Two groupings exist over [`BusinessUnit`] and they are deliberately not
//! the same:
//!
//! - catalog scope: Sunshine is alone, Fairwinds and Passion Flower are
//!   administered together but keep distinct tags on products;
//! - fulfillment scope: orders and proposals carry a coarser value where
//!   Passion Flower items fulfill under Fairwinds, while the public
//!   storefront toggle `sunshine-pf` shows Sunshine and Passion Flower.
//!
//! Every other module goes through the functions in this file instead of
//! branching on business units itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Brand tag on catalog data (products, categories, product types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessUnit {
    Sunshine,
    Fairwinds,
    PassionFlower,
}

impl BusinessUnit {
    pub const ALL: [BusinessUnit; 3] = [
        BusinessUnit::Sunshine,
        BusinessUnit::Fairwinds,
        BusinessUnit::PassionFlower,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessUnit::Sunshine => "sunshine",
            BusinessUnit::Fairwinds => "fairwinds",
            BusinessUnit::PassionFlower => "passion-flower",
        }
    }
}

impl fmt::Display for BusinessUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunshine" => Ok(BusinessUnit::Sunshine),
            "fairwinds" => Ok(BusinessUnit::Fairwinds),
            "passion-flower" => Ok(BusinessUnit::PassionFlower),
            other => Err(DomainError::UnknownBusinessUnit(other.to_string())),
        }
    }
}

/// Fulfillment value carried by orders and proposals.
///
/// The public storefront brand toggle uses the same two values, which is why
/// [`public_brand_scope`] takes this type as its selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FulfillmentUnit {
    #[serde(rename = "sunshine-pf")]
    SunshinePf,
    #[serde(rename = "fairwinds")]
    Fairwinds,
}

impl FulfillmentUnit {
    pub const ALL: [FulfillmentUnit; 2] = [FulfillmentUnit::SunshinePf, FulfillmentUnit::Fairwinds];

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentUnit::SunshinePf => "sunshine-pf",
            FulfillmentUnit::Fairwinds => "fairwinds",
        }
    }
}

impl fmt::Display for FulfillmentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunshine-pf" => Ok(FulfillmentUnit::SunshinePf),
            "fairwinds" => Ok(FulfillmentUnit::Fairwinds),
            other => Err(DomainError::UnknownBusinessUnit(other.to_string())),
        }
    }
}

/// Admin catalog selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogView {
    #[serde(rename = "sunshine")]
    Sunshine,
    #[serde(rename = "fairwinds-pf", alias = "fairwinds/pf")]
    FairwindsPf,
}

impl CatalogView {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogView::Sunshine => "sunshine",
            CatalogView::FairwindsPf => "fairwinds-pf",
        }
    }

    /// Catalog view an admin lands on when their active business unit is `unit`
    pub fn for_unit(unit: BusinessUnit) -> Self {
        match unit {
            BusinessUnit::Sunshine => CatalogView::Sunshine,
            BusinessUnit::Fairwinds | BusinessUnit::PassionFlower => CatalogView::FairwindsPf,
        }
    }
}

impl FromStr for CatalogView {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunshine" => Ok(CatalogView::Sunshine),
            "fairwinds-pf" | "fairwinds/pf" => Ok(CatalogView::FairwindsPf),
            other => Err(DomainError::UnknownBusinessUnit(other.to_string())),
        }
    }
}

/// Bucket used to count and clear notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationBucket {
    #[serde(rename = "sunshine")]
    Sunshine,
    #[serde(rename = "fairwinds", alias = "passion-flower")]
    Fairwinds,
}

impl NotificationBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationBucket::Sunshine => "sunshine",
            NotificationBucket::Fairwinds => "fairwinds",
        }
    }
}

impl fmt::Display for NotificationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationBucket {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sunshine" => Ok(NotificationBucket::Sunshine),
            "fairwinds" | "passion-flower" => Ok(NotificationBucket::Fairwinds),
            other => Err(DomainError::UnknownBusinessUnit(other.to_string())),
        }
    }
}

impl From<BusinessUnit> for NotificationBucket {
    fn from(unit: BusinessUnit) -> Self {
        match fulfillment_scope(unit) {
            FulfillmentUnit::SunshinePf => NotificationBucket::Sunshine,
            FulfillmentUnit::Fairwinds => NotificationBucket::Fairwinds,
        }
    }
}

impl From<FulfillmentUnit> for NotificationBucket {
    fn from(unit: FulfillmentUnit) -> Self {
        match unit {
            FulfillmentUnit::SunshinePf => NotificationBucket::Sunshine,
            FulfillmentUnit::Fairwinds => NotificationBucket::Fairwinds,
        }
    }
}

const SUNSHINE_ONLY: &[BusinessUnit] = &[BusinessUnit::Sunshine];
const FAIRWINDS_ONLY: &[BusinessUnit] = &[BusinessUnit::Fairwinds];
const FAIRWINDS_AND_PF: &[BusinessUnit] = &[BusinessUnit::Fairwinds, BusinessUnit::PassionFlower];
const SUNSHINE_AND_PF: &[BusinessUnit] = &[BusinessUnit::Sunshine, BusinessUnit::PassionFlower];

/// Catalog units visible in an admin catalog view
pub fn catalog_scope(view: CatalogView) -> &'static [BusinessUnit] {
    match view {
        CatalogView::Sunshine => SUNSHINE_ONLY,
        CatalogView::FairwindsPf => FAIRWINDS_AND_PF,
    }
}

/// Order/fulfillment tag for an item of the given catalog unit
pub fn fulfillment_scope(unit: BusinessUnit) -> FulfillmentUnit {
    match unit {
        BusinessUnit::Sunshine => FulfillmentUnit::SunshinePf,
        BusinessUnit::Fairwinds | BusinessUnit::PassionFlower => FulfillmentUnit::Fairwinds,
    }
}

/// Catalog units exposed by a public storefront brand selection
pub fn public_brand_scope(selection: FulfillmentUnit) -> &'static [BusinessUnit] {
    match selection {
        FulfillmentUnit::SunshinePf => SUNSHINE_AND_PF,
        FulfillmentUnit::Fairwinds => FAIRWINDS_ONLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_scope() {
        assert_eq!(catalog_scope(CatalogView::Sunshine), &[BusinessUnit::Sunshine]);
        assert_eq!(
            catalog_scope(CatalogView::FairwindsPf),
            &[BusinessUnit::Fairwinds, BusinessUnit::PassionFlower]
        );
    }

    #[test]
    fn test_fulfillment_scope() {
        assert_eq!(fulfillment_scope(BusinessUnit::Sunshine), FulfillmentUnit::SunshinePf);
        assert_eq!(fulfillment_scope(BusinessUnit::Fairwinds), FulfillmentUnit::Fairwinds);
        assert_eq!(fulfillment_scope(BusinessUnit::PassionFlower), FulfillmentUnit::Fairwinds);
    }

    #[test]
    fn test_public_brand_scope() {
        assert_eq!(
            public_brand_scope(FulfillmentUnit::SunshinePf),
            &[BusinessUnit::Sunshine, BusinessUnit::PassionFlower]
        );
        assert_eq!(public_brand_scope(FulfillmentUnit::Fairwinds), &[BusinessUnit::Fairwinds]);
    }

    #[test]
    fn test_passion_flower_asymmetry() {
        // Administered with Fairwinds, fulfilled under Fairwinds, but sold on the Sunshine/PF storefront.
        assert!(catalog_scope(CatalogView::FairwindsPf).contains(&BusinessUnit::PassionFlower));
        assert_eq!(fulfillment_scope(BusinessUnit::PassionFlower), FulfillmentUnit::Fairwinds);
        assert!(public_brand_scope(FulfillmentUnit::SunshinePf).contains(&BusinessUnit::PassionFlower));
        assert!(!public_brand_scope(FulfillmentUnit::Fairwinds).contains(&BusinessUnit::PassionFlower));
    }

    #[test]
    fn test_unknown_values_are_errors() {
        assert_eq!(
            "moonlight".parse::<BusinessUnit>(),
            Err(DomainError::UnknownBusinessUnit("moonlight".to_string()))
        );
        assert!("sunshine".parse::<FulfillmentUnit>().is_err());
        assert!("passion-flower".parse::<CatalogView>().is_err());
        assert!("".parse::<NotificationBucket>().is_err());
    }

    #[test]
    fn test_string_round_trip() {
        for unit in BusinessUnit::ALL {
            assert_eq!(unit.as_str().parse::<BusinessUnit>(), Ok(unit));
        }
        for unit in FulfillmentUnit::ALL {
            assert_eq!(unit.as_str().parse::<FulfillmentUnit>(), Ok(unit));
        }
    }

    #[test]
    fn test_serde_values() {
        assert_eq!(
            serde_json::to_string(&BusinessUnit::PassionFlower).unwrap(),
            "\"passion-flower\""
        );
        assert_eq!(
            serde_json::to_string(&FulfillmentUnit::SunshinePf).unwrap(),
            "\"sunshine-pf\""
        );
        let bucket: NotificationBucket = serde_json::from_str("\"passion-flower\"").unwrap();
        assert_eq!(bucket, NotificationBucket::Fairwinds);
        assert!(serde_json::from_str::<BusinessUnit>("\"unknown\"").is_err());
    }

    #[test]
    fn test_notification_bucket_follows_fulfillment() {
        assert_eq!(NotificationBucket::from(BusinessUnit::Sunshine), NotificationBucket::Sunshine);
        assert_eq!(NotificationBucket::from(BusinessUnit::PassionFlower), NotificationBucket::Fairwinds);
        assert_eq!(NotificationBucket::from(FulfillmentUnit::SunshinePf), NotificationBucket::Sunshine);
    }

    #[test]
    fn test_catalog_view_for_unit() {
        assert_eq!(CatalogView::for_unit(BusinessUnit::Sunshine), CatalogView::Sunshine);
        assert_eq!(CatalogView::for_unit(BusinessUnit::PassionFlower), CatalogView::FairwindsPf);
        assert_eq!("fairwinds/pf".parse::<CatalogView>(), Ok(CatalogView::FairwindsPf));
    }
}
