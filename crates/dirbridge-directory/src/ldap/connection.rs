//! Directory connections
//!
//! A connection carries exactly one bound identity at a time. Each top-level
//! operation opens its own connection and closes it before returning, so bind
//! state is never shared between callers.

use async_trait::async_trait;
use dirbridge_core::{DirectoryConfig, EncryptionMode, Error, Result};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, warn};

/// A live, bound directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Simple bind; replaces the identity the connection acts as.
    async fn bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Whole-subtree search below `base`.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<SearchEntry>>;

    /// Unbind and release the socket. Safe to call more than once.
    async fn close(&mut self);
}

/// Opens directory connections
#[async_trait]
pub trait Connector: Send + Sync {
    async fn establish(&self, config: &DirectoryConfig) -> Result<Box<dyn DirectoryConnection>>;
}

/// Connector backed by `ldap3`
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapConnector;

#[async_trait]
impl Connector for LdapConnector {
    async fn establish(&self, config: &DirectoryConfig) -> Result<Box<dyn DirectoryConnection>> {
        let conn = LdapConnection::open(config).await?;
        Ok(Box::new(conn))
    }
}

/// `ldap3` connection with a per-call deadline
pub struct LdapConnection {
    ldap: Ldap,
    timeout: Duration,
    closed: bool,
}

impl LdapConnection {
    /// Dial the configured server, upgrading with STARTTLS when requested.
    ///
    /// A failed upgrade drops the socket and no connection is returned.
    pub async fn open(config: &DirectoryConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let start_tls = config.encryption == EncryptionMode::StartTls;
        let url = config.url();

        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(start_tls)
            .set_no_tls_verify(config.allow_invalid_certs);

        debug!(url = %url, encryption = config.encryption.as_str(), "Connecting to directory server");

        if !start_tls {
            warn!(url = %url, "Directory connection is not encrypted");
        }

        let (conn, ldap) = tokio::time::timeout(timeout, LdapConnAsync::with_settings(settings, &url))
            .await
            .map_err(|_| Error::Connection(format!("timed out connecting to {}", url)))?
            .map_err(|e| {
                if start_tls {
                    Error::Connection(format!("unable to start TLS with {}: {}", url, e))
                } else {
                    Error::Connection(format!("unable to dial {}: {}", url, e))
                }
            })?;

        ldap3::drive!(conn);

        Ok(Self {
            ldap,
            timeout,
            closed: false,
        })
    }
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .ldap
            .with_timeout(self.timeout)
            .simple_bind(dn, password)
            .await
            .map_err(|e| Error::Connection(format!("bind as {} failed: {}", dn, e)))?;

        if result.rc != 0 {
            return Err(Error::Bind(format!(
                "bind as {} rejected with code {}",
                dn, result.rc
            )));
        }

        Ok(())
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<SearchEntry>> {
        let (rs, _res) = self
            .ldap
            .with_timeout(self.timeout)
            .search(base, Scope::Subtree, filter, attrs.to_vec())
            .await
            .map_err(|e| Error::Search(format!("search {} failed: {}", filter, e)))?
            .success()
            .map_err(|e| Error::Search(format!("search {} error: {}", filter, e)))?;

        Ok(rs.into_iter().map(SearchEntry::construct).collect())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.ldap.unbind().await {
            debug!(error = %e, "Directory unbind failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let config = DirectoryConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: 1,
            encryption: EncryptionMode::None,
            base_dn: "dc=example,dc=com".to_string(),
            bind_dn: "cn=admin,dc=example,dc=com".to_string(),
            user_filter: "(objectClass=person)".to_string(),
            timeout_seconds: 2,
            ..Default::default()
        };

        let result = LdapConnector.establish(&config).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn test_failed_starttls_upgrade_is_connection_error() {
        // Accepts the socket, then hangs up without answering the upgrade.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let config = DirectoryConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: port,
            encryption: EncryptionMode::StartTls,
            base_dn: "dc=example,dc=com".to_string(),
            bind_dn: "cn=admin,dc=example,dc=com".to_string(),
            user_filter: "(objectClass=person)".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };

        let result = LdapConnector.establish(&config).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
