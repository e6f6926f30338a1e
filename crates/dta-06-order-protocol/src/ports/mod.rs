//! Driving ports: what the HTTP front-end and the chain dispatcher call.

pub mod inbound;

pub use inbound::{ChainEvents, OrderApi, Outcome};
