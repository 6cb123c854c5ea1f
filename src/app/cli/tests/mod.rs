//! Tests for the CLI module
//!
//! Argument parsing and configuration layering.
