//! Data Transfer Objects for REST request/response serialization.
//!
//! Response bodies reuse the views in [`crate::domain::view`]; only request
//! shapes live here.

pub mod common_dto;
pub mod currency_dto;
pub mod offer_dto;
pub mod session_dto;
pub mod user_dto;

pub use common_dto::*;
pub use currency_dto::*;
pub use offer_dto::*;
pub use session_dto::*;
pub use user_dto::*;
