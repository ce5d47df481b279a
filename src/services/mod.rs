pub mod auth_service;
pub mod product_service;
pub mod user_service;
pub mod verification_store;

pub use auth_service::*;
pub use product_service::*;
pub use user_service::*;
pub use verification_store::*;
