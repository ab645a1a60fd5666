//! Shared newtype wrappers.
//!
//! Using distinct types for IDs, emails, and prices prevents the classic
//! bugs of passing a cart row id where a product id is expected, or doing
//! float arithmetic on money.

mod email;
mod id;
mod price;

pub use email::{Email, EmailError};
pub use id::{CartRowId, CustomerId, ProductId};
pub use price::Price;
