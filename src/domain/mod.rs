pub mod models;
pub mod validation;
pub mod credit;
pub mod bank;
pub mod formatters;
pub mod errors;

pub use models::*;
pub use validation::*;
pub use credit::*;
pub use bank::*;
pub use formatters::*;
pub use errors::*;
