//! # Node Runtime Library
//!
//! The pieces of the `dta-node` binary, exposed for tests.
//!
//! - `container/` - configuration, on-disk layout, wiring
//! - `bootstrap` - `init`: identity creation and first configuration
//! - `api/` - admin HTTP surface
//! - `runtime` - task supervision and shutdown
//! - `logging` - tracing subscriber setup

pub mod api;
pub mod bootstrap;
pub mod container;
pub mod logging;
pub mod runtime;

pub use bootstrap::{init_node, InitOptions};
pub use container::{Config, NodeContainer, NodeHome, NodeParts};
pub use runtime::{NodeRuntime, RunningNode};
