//! Integration test suite for dcgen
//!
//! End-to-end tests that run the `dcgen` binary against a temporary project
//! holding a definitions manifest, a user configuration and template files.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **generate**: writing documents, provider switches, overrides, dry runs
//! - **validate**: problem reporting, JSON output, strict mode
//! - **show**: masked inspection of the resolved arguments
//! - **manifest**: malformed manifests and configurations

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod generate;
mod manifest;
mod show;
mod validate;
