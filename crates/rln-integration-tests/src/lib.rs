//! Integration test crate for the RLN protocol engine.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end protocol flows across multiple workspace
//! crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p rln-integration-tests
//! ```
