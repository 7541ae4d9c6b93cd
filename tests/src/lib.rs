//! # Murmur Test Suite
//!
//! Unified test crate exercising the credential, claims, and
//! authorization crates together:
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Shared harness: keys, resolver, route sink
//! └── integration/      # Cross-crate authorization flows
//!     ├── auth_flows.rs
//!     ├── imports_exports.rs
//!     ├── limits.rs
//!     └── expiration.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p murmur-tests
//!
//! # By category
//! cargo test -p murmur-tests integration::auth_flows
//! cargo test -p murmur-tests integration::limits
//! ```
