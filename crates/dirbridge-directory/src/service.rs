//! Operations exposed to callers: preview, sync and authenticate
//!
//! Every operation opens its own connection, uses it for the whole operation
//! and closes it on every exit path. Nothing here persists results.

use dirbridge_core::types::{LocalUser, ReconciledUser, SyncPlan};
use dirbridge_core::{DirectoryConfig, Result, PREVIEW_LIMIT};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::authenticate;
use crate::ldap::{bind_service, fetch_users, Connector, FetchedUsers, LdapConnector};
use crate::reconcile::{missing_email_count, plan, reconcile};

/// Outcome of a preview, shaped for the admin boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub message: String,
    pub is_error: bool,
    pub users: Vec<ReconciledUser>,
}

/// Full reconciled set and the changes a sync would apply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub message: String,
    pub users: Vec<ReconciledUser>,
    pub plan: SyncPlan,
}

/// Directory operations over a [`Connector`]
pub struct DirectoryService<C = LdapConnector> {
    connector: C,
}

impl DirectoryService<LdapConnector> {
    /// Service talking to a real LDAP server
    pub fn ldap() -> Self {
        Self::new(LdapConnector)
    }
}

impl<C: Connector> DirectoryService<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Run both search modes on one connection.
    pub async fn fetch(&self, config: &DirectoryConfig) -> Result<FetchedUsers> {
        let mut conn = self.connector.establish(config).await?;
        let fetched = fetch_users(conn.as_mut(), config).await;
        conn.close().await;
        fetched
    }

    /// Reconcile everything the directory returns, without any cap.
    pub async fn reconciled_users(&self, config: &DirectoryConfig) -> Result<(Vec<ReconciledUser>, usize)> {
        let fetched = self.fetch(config).await?;
        let users = reconcile(config, &fetched.from_user_filter, &fetched.from_group_filter);
        Ok((users, missing_email_count(fetched.iter())))
    }

    /// Reconcile and return at most [`PREVIEW_LIMIT`] users. Commits nothing.
    pub async fn preview(&self, config: &DirectoryConfig) -> PreviewResult {
        info!(url = %config.url(), "Fetching LDAP users");

        match self.reconciled_users(config).await {
            Ok((mut users, _)) => {
                let message = format!("Sync'ed with LDAP, found {} users", users.len());
                info!("{}", message);

                users.truncate(PREVIEW_LIMIT);
                PreviewResult {
                    message,
                    is_error: false,
                    users,
                }
            }
            Err(e) => {
                let message = "Error: unable fetch users from LDAP".to_string();
                error!(error = %e, code = e.code(), "{}", message);

                PreviewResult {
                    message,
                    is_error: true,
                    users: Vec::new(),
                }
            }
        }
    }

    /// Reconcile the full set and diff it against `existing`.
    ///
    /// Inserting and deactivating accounts is left to the caller.
    pub async fn sync(&self, config: &DirectoryConfig, existing: &[LocalUser]) -> Result<SyncOutcome> {
        let (users, missing) = self.reconciled_users(config).await.map_err(|e| {
            error!(error = %e, code = e.code(), "Unable to fetch users from LDAP");
            e
        })?;

        let plan = plan(&users, existing, missing);
        let message = format!(
            "LDAP sync found {} users, {} new users added, {} users with missing data ignored",
            users.len(),
            plan.to_add.len(),
            plan.missing
        );
        info!(deactivate = plan.to_deactivate.len(), "{}", message);

        Ok(SyncOutcome {
            message,
            users,
            plan,
        })
    }

    /// `true` only for a unique user whose re-bind succeeded.
    ///
    /// Every failure collapses to `false`; the cause is logged, never returned.
    pub async fn authenticate(&self, config: &DirectoryConfig, username: &str, password: &str) -> bool {
        let conn = match self.connector.establish(config).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, code = e.code(), "LDAP authentication unavailable");
                return false;
            }
        };

        match authenticate::authenticate(conn, config, username, password).await {
            Ok(true) => {
                info!(username, "LDAP authentication succeeded");
                true
            }
            Ok(false) => {
                info!(username, "LDAP authentication rejected");
                false
            }
            Err(e) if e.is_directory_error() => {
                info!(username, error = %e, code = e.code(), "LDAP authentication failed");
                false
            }
            Err(e) => {
                warn!(username, error = %e, code = e.code(), "LDAP authentication misconfigured");
                false
            }
        }
    }

    /// Dial and bind the service account, nothing more.
    pub async fn test_connection(&self, config: &DirectoryConfig) -> Result<()> {
        let mut conn = self.connector.establish(config).await?;
        let bound = bind_service(conn.as_mut(), config).await;
        conn.close().await;

        if bound.is_ok() {
            debug!(url = %config.url(), "Directory connection test passed");
        }
        bound
    }
}
