pub mod common;
pub mod product;
pub mod user;

pub use common::*;
pub use product::*;
pub use user::*;
