pub mod admin;
pub mod auth;
pub mod product;

pub use admin::admin_config;
pub use auth::auth_config;
pub use product::product_config;
