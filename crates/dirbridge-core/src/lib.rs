//! Dirbridge Core Library
//!
//! Configuration, error taxonomy and user records shared by the directory
//! integration crates.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{AttributeMapping, DirectoryConfig, EncryptionMode, ServerType};
pub use error::{Error, Result};

/// Dirbridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default plaintext LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default deadline for dial, bind and search round trips
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of users returned by a preview
pub const PREVIEW_LIMIT: usize = 100;

/// Name used when a directory entry carries no first or last name
pub const NAME_PLACEHOLDER: &str = "Empty";
