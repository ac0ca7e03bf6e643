//! Business logic services for the VMI proposal server
//!
//! Services own their SQL. Rules come from the `shared` crate; a service
//! loads state, asks `shared` what to do, and writes the result inside one
//! transaction.

use std::str::FromStr;

use shared::DomainError;

use crate::error::{AppError, AppResult};

pub mod catalog;
pub mod dispensary;
pub mod items;
pub mod notification;
pub mod order;
pub mod proposal;

pub use catalog::CatalogService;
pub use dispensary::DispensaryService;
pub use notification::NotificationService;
pub use order::OrderService;
pub use proposal::ProposalService;

/// Parse an enumerated value read back from a text column.
/// A bad value here means the row was written outside this service.
pub(crate) fn parse_stored<T>(value: &str, column: &str) -> AppResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value.parse().map_err(|_| {
        tracing::error!(column, value, "Unrecognized value in database");
        AppError::Internal(format!("Invalid {} '{}' in database", column, value))
    })
}
