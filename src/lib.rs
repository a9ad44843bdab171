//! bankform - Terminal Online Banking Forms
//!
//! Multi-step form engine (field rules, validation, step sequencing, async
//! submission) and the banking flows built on it: registration, card
//! applications with credit eligibility, and utility payments.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
