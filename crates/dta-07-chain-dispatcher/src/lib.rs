//! # Chain Dispatcher (dta-07)
//!
//! Feeds chain transactions addressed to this node into the order protocol.
//!
//! ## Startup Order
//!
//! 1. Subscribe, queueing live transactions (nothing is handled yet).
//! 2. Catch up: page through everything for this node above the stored
//!    cursor and handle it in chain order.
//! 3. Drain the queue; anything at or below the cursor is skipped.
//!
//! Subscribing before catching up leaves no gap between the two; the
//! cursor check removes the overlap.
//!
//! ## Failures
//!
//! | Disposition | Action |
//! |-------------|--------|
//! | Retry | back off and retry the same transaction; stop without advancing when the budget runs out |
//! | Drop | log, advance the cursor, continue |
//! | Fatal | stop the dispatcher |

pub mod config;
pub mod cursor;
pub mod dispatcher;
pub mod errors;

pub use config::{DispatcherConfig, RetryPolicy};
pub use cursor::DispatchLedger;
pub use dispatcher::{ChainDispatcher, Dispatched};
pub use errors::DispatchError;
