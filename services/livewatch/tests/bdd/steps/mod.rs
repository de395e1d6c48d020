//! BDD step definitions for livewatch

pub mod delivery_steps;
pub mod polling_steps;
pub mod source_steps;
