//! Client test support utilities
//!
//! This crate provides the unified logging initialization shared by the
//! planner client's unit and integration tests.

pub mod logging;
