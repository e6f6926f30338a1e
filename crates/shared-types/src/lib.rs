//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the D-TA node.
//!
//! ## Contents
//!
//! - `entities` - `BlockChainTX`, the `Processor` routing tag, `NodeType`
//! - `identifiers` - CID syntax and the document timestamp window
//! - `errors` - parse errors for the closed vocabularies above

pub mod entities;
pub mod errors;
pub mod identifiers;

pub use entities::*;
pub use errors::*;
pub use identifiers::*;
