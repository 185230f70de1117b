//! dnsguard - a filtering DNS forwarding proxy.
//!
//! Refuses queries for blacklisted names, forwards the rest to a single
//! upstream resolver, and routes answers back to clients by transaction id.

pub mod dns;
pub mod error;
pub mod filter;
pub mod pending;
pub mod proxy;
pub mod resolver;
pub mod stats;
pub mod transport;

pub use error::{Error, Result};
