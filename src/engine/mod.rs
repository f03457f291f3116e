//! Core engine — decision execution and portfolio tracking.

pub mod executor;
pub mod portfolio;
