//! LDAP connection and search module
//!
//! Provides:
//! - Connection establishment with optional STARTTLS upgrade
//! - Service account bind
//! - User-filter and group-filter searches
//! - Unique lookup by RDN attribute

mod connection;
mod search;

pub use connection::*;
pub use search::*;
