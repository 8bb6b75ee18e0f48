pub mod models;
pub mod enums;
pub mod validate;

pub use models::*;
pub use enums::*;
pub use validate::*;
