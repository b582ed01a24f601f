//! Directory searches
//!
//! All searches run on a connection that is already bound as the service
//! account. Group-filter mode costs one extra search per group member because
//! member attributes rarely carry the user fields we need.

use dirbridge_core::types::RemoteUser;
use dirbridge_core::{DirectoryConfig, Error, Result};
use ldap3::{ldap_escape, SearchEntry};
use tracing::{debug, warn};

use super::DirectoryConnection;
use crate::extract::{attr_values, extract, group_attributes, user_attributes};

/// Users found by each search mode, in directory order
#[derive(Debug, Clone, Default)]
pub struct FetchedUsers {
    pub from_user_filter: Vec<RemoteUser>,
    pub from_group_filter: Vec<RemoteUser>,
}

impl FetchedUsers {
    pub fn len(&self) -> usize {
        self.from_user_filter.len() + self.from_group_filter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteUser> {
        self.from_user_filter.iter().chain(self.from_group_filter.iter())
    }
}

/// Bind the connection as the configured service account.
pub async fn bind_service(conn: &mut dyn DirectoryConnection, config: &DirectoryConfig) -> Result<()> {
    debug!(bind_dn = %config.bind_dn, "Binding service account");

    conn.bind(&config.bind_dn, &config.bind_password)
        .await
        .map_err(|e| e.context("service account bind"))
}

/// Bind once, then run every enabled search mode.
///
/// A failed bind or a failed top-level search aborts the whole fetch.
pub async fn fetch_users(
    conn: &mut dyn DirectoryConnection,
    config: &DirectoryConfig,
) -> Result<FetchedUsers> {
    bind_service(conn, config).await?;

    let mut fetched = FetchedUsers::default();

    if config.user_filter_enabled() {
        fetched.from_user_filter = search_users(conn, config).await?;
    }

    if config.group_filter_enabled() {
        fetched.from_group_filter = search_groups(conn, config).await?;
    }

    debug!(
        user_filter = fetched.from_user_filter.len(),
        group_filter = fetched.from_group_filter.len(),
        "Fetched directory users"
    );

    Ok(fetched)
}

/// User-filter mode: every entry matching the configured user filter.
pub async fn search_users(
    conn: &mut dyn DirectoryConnection,
    config: &DirectoryConfig,
) -> Result<Vec<RemoteUser>> {
    debug!(filter = %config.user_filter, "Searching users");

    let entries = conn
        .search(&config.base_dn, &config.user_filter, &user_attributes(config))
        .await
        .map_err(|e| e.context("user filter search"))?;

    Ok(entries.iter().map(|entry| extract(config, entry)).collect())
}

/// Group-filter mode: members of every group matching the group filter.
///
/// Each member DN is resolved with its own search. Members whose lookup
/// fails or finds nothing are skipped; the rest are still returned.
pub async fn search_groups(
    conn: &mut dyn DirectoryConnection,
    config: &DirectoryConfig,
) -> Result<Vec<RemoteUser>> {
    let member_attr = config
        .attributes
        .group_member
        .as_deref()
        .ok_or_else(|| Error::InvalidConfig("Group filter requires a group member attribute".into()))?;

    debug!(filter = %config.group_filter, "Searching groups");

    let groups = conn
        .search(&config.base_dn, &config.group_filter, &group_attributes(config))
        .await
        .map_err(|e| e.context("group filter search"))?;

    let user_attrs = user_attributes(config);
    let mut users = Vec::new();

    for group in &groups {
        let members = attr_values(group, member_attr);
        debug!(group = %group.dn, members = members.len(), "Expanding group");

        for member_dn in members {
            let Some(filter) = member_filter(member_dn) else {
                debug!(member = %member_dn, "Skipping malformed member DN");
                continue;
            };

            match conn.search(&config.base_dn, &filter, &user_attrs).await {
                Ok(entries) if entries.is_empty() => {
                    debug!(member = %member_dn, "Group member not found, skipping");
                }
                Ok(entries) => {
                    users.extend(entries.iter().map(|entry| extract(config, entry)));
                }
                Err(e) => {
                    warn!(member = %member_dn, error = %e, "Group member lookup failed, skipping");
                }
            }
        }
    }

    Ok(users)
}

/// Look up the single entry whose RDN attribute equals `username`.
///
/// Zero matches is [`Error::NotFound`], more than one is
/// [`Error::AmbiguousMatch`].
pub async fn find_unique(
    conn: &mut dyn DirectoryConnection,
    config: &DirectoryConfig,
    username: &str,
) -> Result<SearchEntry> {
    let rdn = config
        .attributes
        .user_rdn
        .as_deref()
        .ok_or_else(|| Error::InvalidConfig("RDN attribute is required for user lookup".into()))?;

    if username.trim().is_empty() {
        return Err(Error::NotFound("empty username".into()));
    }

    let filter = format!("({}={})", rdn, ldap_escape(username));

    let mut entries = conn
        .search(&config.base_dn, &filter, &user_attributes(config))
        .await
        .map_err(|e| e.context("user lookup"))?;

    match entries.len() {
        0 => Err(Error::NotFound(filter)),
        1 => Ok(entries.remove(0)),
        count => Err(Error::AmbiguousMatch { filter, count }),
    }
}

/// Equality filter built from the leading RDN of a member DN.
///
/// `uid=jdoe,ou=people,dc=example,dc=com` becomes `(uid=jdoe)`. DN escapes
/// in the value are decoded and the value is re-escaped for filter syntax.
pub fn member_filter(member_dn: &str) -> Option<String> {
    let rdn = leading_rdn(member_dn);
    let (attr, value) = rdn.split_once('=')?;
    let attr = attr.trim();
    if attr.is_empty() {
        return None;
    }

    let value = unescape_dn_value(value.trim());
    Some(format!("({}={})", attr, ldap_escape(value.as_str())))
}

/// First comma-delimited component, ignoring escaped commas.
fn leading_rdn(dn: &str) -> &str {
    let mut escaped = false;
    for (idx, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return &dn[..idx],
            _ => escaped = false,
        }
    }
    dn
}

fn unescape_dn_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            match hex {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(bytes[i + 1]);
                    i += 2;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entry, person, Call, MockDirectory};

    const ADMIN_DN: &str = "cn=admin,dc=example,dc=com";
    const USER_FILTER: &str = "(objectClass=inetOrgPerson)";
    const GROUP_FILTER: &str = "(&(objectClass=groupOfNames)(cn=eng))";

    fn config() -> DirectoryConfig {
        DirectoryConfig {
            base_dn: "dc=example,dc=com".to_string(),
            bind_dn: ADMIN_DN.to_string(),
            bind_password: "admin".to_string(),
            user_filter: USER_FILTER.to_string(),
            group_filter: GROUP_FILTER.to_string(),
            ..Default::default()
        }
    }

    fn eng_group(members: &[&str]) -> SearchEntry {
        let mut attrs = vec![("cn", "eng")];
        attrs.extend(members.iter().map(|dn| ("member", *dn)));
        entry("cn=eng,ou=groups,dc=example,dc=com", &attrs)
    }

    #[test]
    fn test_member_filter() {
        assert_eq!(
            member_filter("uid=jdoe,ou=people,dc=example,dc=com").as_deref(),
            Some("(uid=jdoe)")
        );
        assert_eq!(member_filter("cn=solo").as_deref(), Some("(cn=solo)"));
        assert_eq!(
            member_filter(r"cn=Doe\, John,ou=people,dc=example,dc=com").as_deref(),
            Some("(cn=Doe, John)")
        );
        assert_eq!(
            member_filter(r"cn=a\2Bb (ops),dc=example").as_deref(),
            Some(r"(cn=a+b \28ops\29)")
        );
        assert_eq!(member_filter("not-a-dn"), None);
        assert_eq!(member_filter("=value,dc=x"), None);
    }

    #[tokio::test]
    async fn test_search_requires_service_bind() {
        let directory = MockDirectory::new().account(ADMIN_DN, "wrong");
        let mut conn = directory.connect();

        let result = fetch_users(&mut conn, &config()).await;

        assert!(matches!(result, Err(Error::Bind(_))));
        assert!(directory.searches().is_empty());
    }

    #[tokio::test]
    async fn test_user_filter_mode() {
        let directory = MockDirectory::new()
            .account(ADMIN_DN, "admin")
            .results(USER_FILTER, vec![person("a", "A@x.com"), person("b", "b@x.com")]);
        let mut conn = directory.connect();

        let mut config = config();
        config.group_filter.clear();
        let fetched = fetch_users(&mut conn, &config).await.unwrap();

        let emails: Vec<_> = fetched.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
        assert!(fetched.from_group_filter.is_empty());
        assert_eq!(directory.calls()[0], Call::Bind(ADMIN_DN.to_string()));
        assert_eq!(directory.searches(), vec![USER_FILTER.to_string()]);
    }

    #[tokio::test]
    async fn test_group_expansion_skips_failed_members() {
        let directory = MockDirectory::new()
            .account(ADMIN_DN, "admin")
            .results(
                GROUP_FILTER,
                vec![eng_group(&[
                    "uid=b,ou=people,dc=example,dc=com",
                    "uid=broken,ou=people,dc=example,dc=com",
                    "uid=ghost,ou=people,dc=example,dc=com",
                    "uid=d,ou=people,dc=example,dc=com",
                ])],
            )
            .results("(uid=b)", vec![person("b", "b@x.com")])
            .results("(uid=d)", vec![person("d", "d@x.com")])
            .failing("(uid=broken)");
        let mut conn = directory.connect();
        bind_service(&mut conn, &config()).await.unwrap();

        let users = search_groups(&mut conn, &config()).await.unwrap();

        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["b@x.com", "d@x.com"]);
        assert_eq!(directory.searches().len(), 5);
    }

    #[tokio::test]
    async fn test_group_search_failure_aborts() {
        let directory = MockDirectory::new()
            .account(ADMIN_DN, "admin")
            .results(USER_FILTER, vec![person("a", "a@x.com")])
            .failing(GROUP_FILTER);
        let mut conn = directory.connect();

        let result = fetch_users(&mut conn, &config()).await;

        match result {
            Err(Error::Search(msg)) => assert!(msg.starts_with("group filter search")),
            other => panic!("unexpected result: {:?}", other.map(|f| f.len())),
        }
    }

    #[tokio::test]
    async fn test_groups_without_members_are_ignored() {
        let directory = MockDirectory::new()
            .account(ADMIN_DN, "admin")
            .results(GROUP_FILTER, vec![eng_group(&[])]);
        let mut conn = directory.connect();
        bind_service(&mut conn, &config()).await.unwrap();

        let users = search_groups(&mut conn, &config()).await.unwrap();

        assert!(users.is_empty());
        assert_eq!(directory.searches(), vec![GROUP_FILTER.to_string()]);
    }

    #[tokio::test]
    async fn test_find_unique() {
        let directory = MockDirectory::new()
            .account(ADMIN_DN, "admin")
            .results("(uid=jdoe)", vec![person("jdoe", "jdoe@x.com")])
            .results("(uid=twin)", vec![person("twin", "t1@x.com"), person("twin", "t2@x.com")]);
        let mut conn = directory.connect();
        bind_service(&mut conn, &config()).await.unwrap();

        let found = find_unique(&mut conn, &config(), "jdoe").await.unwrap();
        assert_eq!(found.dn, "uid=jdoe,ou=people,dc=example,dc=com");

        assert!(matches!(
            find_unique(&mut conn, &config(), "nobody").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            find_unique(&mut conn, &config(), "twin").await,
            Err(Error::AmbiguousMatch { count: 2, .. })
        ));
        assert!(matches!(
            find_unique(&mut conn, &config(), "  ").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_unique_escapes_username() {
        let directory = MockDirectory::new().account(ADMIN_DN, "admin");
        let mut conn = directory.connect();
        bind_service(&mut conn, &config()).await.unwrap();

        let _ = find_unique(&mut conn, &config(), "*)(uid=*").await;

        assert_eq!(directory.searches(), vec![r"(uid=\2a\29\28uid=\2a)".to_string()]);
    }
}
