//! DNS query filtering module.
//!
//! Refuses queries whose name contains a blacklisted fragment.

mod blocklist;

pub use blocklist::Blocklist;
