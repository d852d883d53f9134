//! Store integration tests
//!
//! This module tests record merging, persistence through containers and the
//! main and shared store specializations.

mod legacy;
mod shared_store;
