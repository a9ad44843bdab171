//! Infrastructure layer providing external service integrations.
//!
//! Session storage, the mock bank backend, configuration loading and CSV
//! export live here.

pub mod persistence;
pub mod mock_api;
pub mod config;
pub mod export;

pub use persistence::*;
pub use mock_api::*;
pub use config::*;
pub use export::*;
