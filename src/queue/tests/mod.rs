//! Test modules for the pending queue
//!
//! Tests are organized by functional area for better maintainability.

mod concurrent;
mod purge;
