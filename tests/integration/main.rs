//! Integration test harness.

mod cycle;
mod mock_source;
