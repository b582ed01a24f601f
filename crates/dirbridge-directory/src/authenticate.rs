//! Password verification by directory re-bind

use dirbridge_core::{DirectoryConfig, Result};
use tracing::debug;

use crate::ldap::{bind_service, find_unique, DirectoryConnection};

/// Verify `password` for `username`, consuming the connection.
///
/// Steps: bind as the service account, find exactly one entry whose RDN
/// attribute equals `username`, then re-bind as that entry. `Ok(true)` only
/// when the re-bind succeeds; a rejected re-bind is `Ok(false)`. A missing or
/// ambiguous match is an error and no re-bind is attempted.
///
/// The connection now carries the end user's identity, so it is closed here
/// and cannot be reused.
pub async fn authenticate(
    mut conn: Box<dyn DirectoryConnection>,
    config: &DirectoryConfig,
    username: &str,
    password: &str,
) -> Result<bool> {
    let outcome = verify(conn.as_mut(), config, username, password).await;
    conn.close().await;
    outcome
}

async fn verify(
    conn: &mut dyn DirectoryConnection,
    config: &DirectoryConfig,
    username: &str,
    password: &str,
) -> Result<bool> {
    bind_service(conn, config).await?;

    let entry = find_unique(conn, config, username).await?;

    // An empty password is an unauthenticated bind, which servers accept.
    if password.is_empty() {
        debug!("Rejecting empty password");
        return Ok(false);
    }

    match conn.bind(&entry.dn, password).await {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!(error = %e, "User bind rejected");
            Ok(false)
        }
    }
}
