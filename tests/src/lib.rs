//! # Milagro D-TA Test Suite
//!
//! Flows that need more than one node: every node gets its own local store,
//! order service and chain dispatcher, and they share one in-memory chain and
//! one content store.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── federation.rs    # node fixtures
//!     └── order_flows.rs   # deposit and redemption through the dispatchers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dta-tests
//! cargo test -p dta-tests integration::order_flows
//! ```

pub mod integration;
