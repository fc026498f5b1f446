//! Common test utilities and fixtures for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: date helpers, seeded stores, and an isolated CLI command

pub mod fixtures;
