//! Domain models for the ordering platform

mod business_unit;
mod catalog;
mod cart;
mod notification;
mod order;
mod permission;
mod proposal;

pub use business_unit::*;
pub use catalog::*;
pub use cart::*;
pub use notification::*;
pub use order::*;
pub use permission::*;
pub use proposal::*;
