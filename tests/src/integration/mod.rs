//! Cross-node choreography.

#[cfg(test)]
pub mod federation;
#[cfg(test)]
mod order_flows;
