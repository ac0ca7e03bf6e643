//! HTTP handlers
//!
//! Handlers check capabilities, translate request shapes into service calls
//! and return JSON. Business rules live in `shared`, SQL lives in `services`.

use std::str::FromStr;

use shared::{fulfillment_scope, BusinessUnit, DomainError, FulfillmentUnit};

use crate::error::AppResult;

pub mod cart;
pub mod catalog;
pub mod health;
pub mod notification;
pub mod proposal;

pub use cart::*;
pub use catalog::*;
pub use health::*;
pub use notification::*;
pub use proposal::*;

/// Parse an optional query parameter with the domain's `FromStr`
pub(crate) fn parse_param<T>(value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = DomainError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(raw.parse()?)),
        None => Ok(None),
    }
}

/// Admin business-unit filter mapped onto the fulfillment value records carry
pub(crate) fn admin_unit_filter(value: Option<&str>) -> AppResult<Option<FulfillmentUnit>> {
    Ok(parse_param::<BusinessUnit>(value)?.map(fulfillment_scope))
}
