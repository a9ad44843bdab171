//! Application layer: form state, step sequencing and the concrete flows.
//!
//! This module coordinates between the domain layer and the presentation
//! layer. The flows call out to the bank through the submit collaborator
//! seam and keep the session in whatever store they are given.

pub mod form_state;
pub mod step_controller;
pub mod submit;
pub mod flows;
pub mod session;
pub mod state;

pub use form_state::*;
pub use step_controller::*;
pub use submit::*;
pub use flows::*;
pub use session::*;
pub use state::*;
