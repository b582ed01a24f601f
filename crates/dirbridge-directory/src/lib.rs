//! Directory integration for Dirbridge
//!
//! Connects to an LDAP directory, searches it for users, reconciles the
//! results into local-user records and verifies end-user passwords by
//! re-binding as the matched entry.

pub mod authenticate;
pub mod extract;
pub mod ldap;
pub mod reconcile;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use ldap::{Connector, DirectoryConnection, FetchedUsers, LdapConnection, LdapConnector};
pub use service::{DirectoryService, PreviewResult, SyncOutcome};

pub use dirbridge_core::{DirectoryConfig, Error, Result};
