//! Directory configuration for Dirbridge
//!
//! Example config:
//! ```toml
//! server_host = "ldap.example.com"
//! server_port = 389
//! encryption = "starttls"
//! base_dn = "ou=people,dc=example,dc=com"
//! bind_dn = "cn=admin,dc=example,dc=com"
//! bind_password = "secret"
//! user_filter = "(|(objectClass=person)(objectClass=inetOrgPerson))"
//! group_filter = "(&(objectClass=groupOfNames)(cn=engineering))"
//!
//! [attributes]
//! user_rdn = "uid"
//! first_name = "givenName"
//! last_name = "sn"
//! email = "mail"
//! group_member = "member"
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result, DEFAULT_LDAP_PORT, DEFAULT_TIMEOUT_SECS};

/// Directory connection and mapping configuration
///
/// A value is immutable for the duration of one operation. Build it once,
/// run [`DirectoryConfig::validate`], then hand it to the directory crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Directory server flavour
    #[serde(default)]
    pub server_type: ServerType,

    /// Directory host name or address
    pub server_host: String,

    /// Directory port
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Transport security applied after dialing
    #[serde(default)]
    pub encryption: EncryptionMode,

    /// Skip certificate verification during STARTTLS (not recommended for production)
    #[serde(default)]
    pub allow_invalid_certs: bool,

    /// Root of the subtree every search is scoped to
    /// Example: "ou=people,dc=example,dc=com"
    #[serde(default)]
    pub base_dn: String,

    /// Service account DN used for searches
    /// Example: "cn=admin,dc=example,dc=com"
    #[serde(default)]
    pub bind_dn: String,

    /// Service account password
    #[serde(default)]
    pub bind_password: String,

    /// Filter selecting user entries; empty disables user-filter mode
    #[serde(default)]
    pub user_filter: String,

    /// Filter selecting group entries; empty disables group-filter mode
    #[serde(default)]
    pub group_filter: String,

    /// Attribute names read from directory entries
    #[serde(default)]
    pub attributes: AttributeMapping,

    /// Editor permission granted to users created by a sync
    #[serde(default)]
    pub default_permission_add_space: bool,

    /// Hide the logout action for directory-backed sessions
    #[serde(default)]
    pub disable_logout: bool,

    /// Deadline in seconds for dial and for each bind or search
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_port() -> u16 {
    DEFAULT_LDAP_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server_type: ServerType::default(),
            server_host: "localhost".to_string(),
            server_port: default_port(),
            encryption: EncryptionMode::default(),
            allow_invalid_certs: false,
            base_dn: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            user_filter: String::new(),
            group_filter: String::new(),
            attributes: AttributeMapping::default(),
            default_permission_add_space: false,
            disable_logout: false,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Directory server type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Generic LDAP v3 server
    #[default]
    Ldap,
}

/// Transport security mode
///
/// Deserialized through [`std::str::FromStr`], so files and environment
/// variables accept the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum EncryptionMode {
    /// Plaintext connection; the caller accepts the exposure
    #[serde(rename = "none")]
    None,
    /// In-place TLS upgrade of the plaintext connection
    #[default]
    #[serde(rename = "starttls")]
    StartTls,
}

impl EncryptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMode::None => "none",
            EncryptionMode::StartTls => "starttls",
        }
    }
}

impl TryFrom<String> for EncryptionMode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl std::str::FromStr for EncryptionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(EncryptionMode::None),
            "starttls" | "start_tls" => Ok(EncryptionMode::StartTls),
            other => Err(Error::InvalidConfig(format!(
                "Unknown encryption mode: {}",
                other
            ))),
        }
    }
}

/// Names of the directory attributes mapped onto user records
///
/// An unset mapping means the corresponding field is never populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttributeMapping {
    /// Attribute holding the login name (leaf of the user DN)
    #[serde(default)]
    pub user_rdn: Option<String>,

    /// First name attribute
    #[serde(default)]
    pub first_name: Option<String>,

    /// Last name attribute
    #[serde(default)]
    pub last_name: Option<String>,

    /// Email attribute
    #[serde(default)]
    pub email: Option<String>,

    /// Display name attribute
    #[serde(default)]
    pub display_name: Option<String>,

    /// Group name attribute
    #[serde(default)]
    pub group_name: Option<String>,

    /// Group attribute listing member DNs
    #[serde(default)]
    pub group_member: Option<String>,
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self {
            user_rdn: Some("uid".to_string()),
            first_name: Some("givenName".to_string()),
            last_name: Some("sn".to_string()),
            email: Some("mail".to_string()),
            display_name: None,
            group_name: None,
            group_member: Some("member".to_string()),
        }
    }
}

impl AttributeMapping {
    /// Active Directory attribute names
    pub fn active_directory() -> Self {
        Self {
            user_rdn: Some("sAMAccountName".to_string()),
            first_name: Some("givenName".to_string()),
            last_name: Some("sn".to_string()),
            email: Some("mail".to_string()),
            display_name: Some("displayName".to_string()),
            group_name: Some("cn".to_string()),
            group_member: Some("member".to_string()),
        }
    }

    /// Drop blank names so that unset and empty mean the same thing.
    fn normalize(&mut self) {
        for slot in [
            &mut self.user_rdn,
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.display_name,
            &mut self.group_name,
            &mut self.group_member,
        ] {
            *slot = slot
                .take()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
        }
    }
}

impl DirectoryConfig {
    /// Load from a TOML file, normalized and validated.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::read_file(path)?.finish()
    }

    /// Parse a TOML file without validating it, so overrides can still fill
    /// in required fields before [`DirectoryConfig::finish`].
    pub fn read_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    /// Load from the JSON payload shape used by the admin boundary.
    pub fn from_json(payload: &str) -> Result<Self> {
        Self::parse_json(payload)?.finish()
    }

    /// Parse the boundary payload without validating it.
    pub fn parse_json(payload: &str) -> Result<Self> {
        let payload: ConfigPayload = serde_json::from_str(payload)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse payload: {}", e)))?;

        Ok(DirectoryConfig::from(payload))
    }

    /// Build from `DIRBRIDGE_*` environment variables alone.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.finish()
    }

    /// Override fields with any `DIRBRIDGE_*` environment variables present.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Override fields from `DIRBRIDGE_*` names resolved through `var`.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("DIRBRIDGE_HOST") {
            self.server_host = host;
        }
        if let Some(port) = var("DIRBRIDGE_PORT") {
            self.server_port = port
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("Invalid DIRBRIDGE_PORT: {}", port)))?;
        }
        if let Some(mode) = var("DIRBRIDGE_ENCRYPTION") {
            self.encryption = mode.parse()?;
        }
        if let Some(base_dn) = var("DIRBRIDGE_BASE_DN") {
            self.base_dn = base_dn;
        }
        if let Some(bind_dn) = var("DIRBRIDGE_BIND_DN") {
            self.bind_dn = bind_dn;
        }
        if let Some(password) = var("DIRBRIDGE_BIND_PASSWORD") {
            self.bind_password = password;
        }
        if let Some(filter) = var("DIRBRIDGE_USER_FILTER") {
            self.user_filter = filter;
        }
        if let Some(filter) = var("DIRBRIDGE_GROUP_FILTER") {
            self.group_filter = filter;
        }
        if let Some(timeout) = var("DIRBRIDGE_TIMEOUT") {
            self.timeout_seconds = timeout.parse().map_err(|_| {
                Error::InvalidConfig(format!("Invalid DIRBRIDGE_TIMEOUT: {}", timeout))
            })?;
        }
        Ok(())
    }

    /// Normalize then validate.
    pub fn finish(mut self) -> Result<Self> {
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    fn normalize(&mut self) {
        self.server_host = self.server_host.trim().to_string();
        self.base_dn = self.base_dn.trim().to_string();
        self.bind_dn = self.bind_dn.trim().to_string();
        self.user_filter = self.user_filter.trim().to_string();
        self.group_filter = self.group_filter.trim().to_string();
        self.attributes.normalize();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_host.is_empty() {
            return Err(Error::InvalidConfig("Server host is required".into()));
        }

        if self.server_port == 0 {
            return Err(Error::InvalidConfig("Server port must be non-zero".into()));
        }

        if self.base_dn.is_empty() {
            return Err(Error::InvalidConfig("Base DN is required".into()));
        }

        if self.bind_dn.is_empty() {
            return Err(Error::InvalidConfig("Bind DN is required".into()));
        }

        if self.user_filter.is_empty() && self.group_filter.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one of user filter or group filter is required".into(),
            ));
        }

        if !self.group_filter.is_empty() && self.attributes.group_member.is_none() {
            return Err(Error::InvalidConfig(
                "Group filter requires a group member attribute".into(),
            ));
        }

        for (name, filter) in [("user", &self.user_filter), ("group", &self.group_filter)] {
            if !filter.is_empty() && !is_balanced(filter) {
                return Err(Error::InvalidConfig(format!(
                    "The {} filter has unbalanced parentheses: {}",
                    name, filter
                )));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(Error::InvalidConfig("Timeout must be at least one second".into()));
        }

        Ok(())
    }

    /// `ldap://host:port`; STARTTLS upgrades this address in place.
    pub fn url(&self) -> String {
        format!("ldap://{}:{}", self.server_host, self.server_port)
    }

    pub fn user_filter_enabled(&self) -> bool {
        !self.user_filter.is_empty()
    }

    pub fn group_filter_enabled(&self) -> bool {
        !self.group_filter.is_empty()
    }
}

fn is_balanced(filter: &str) -> bool {
    let mut depth: i64 = 0;
    for c in filter.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Configuration as posted by the admin boundary
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigPayload {
    #[serde(rename = "ServerType")]
    pub server_type: Option<ServerType>,
    #[serde(rename = "ServerHost")]
    pub server_host: String,
    #[serde(rename = "ServerPort")]
    pub server_port: Option<u16>,
    #[serde(rename = "EncryptionType")]
    pub encryption_type: String,
    #[serde(rename = "BaseDN")]
    pub base_dn: String,
    #[serde(rename = "BindDN")]
    pub bind_dn: String,
    #[serde(rename = "BindPassword")]
    pub bind_password: String,
    #[serde(rename = "UserFilter")]
    pub user_filter: String,
    #[serde(rename = "GroupFilter")]
    pub group_filter: String,
    #[serde(rename = "AttributeUserRDN")]
    pub attribute_user_rdn: String,
    #[serde(rename = "AttributeUserFirstname")]
    pub attribute_user_firstname: String,
    #[serde(rename = "AttributeUserLastname")]
    pub attribute_user_lastname: String,
    #[serde(rename = "AttributeUserEmail")]
    pub attribute_user_email: String,
    #[serde(rename = "AttributeUserDisplayName")]
    pub attribute_user_display_name: String,
    #[serde(rename = "AttributeUserGroupName")]
    pub attribute_user_group_name: String,
    #[serde(rename = "AttributeGroupMember")]
    pub attribute_group_member: String,
    #[serde(rename = "DefaultPermissionAddSpace")]
    pub default_permission_add_space: bool,
    #[serde(rename = "DisableLogout")]
    pub disable_logout: bool,
}

impl From<ConfigPayload> for DirectoryConfig {
    fn from(p: ConfigPayload) -> Self {
        Self {
            server_type: p.server_type.unwrap_or_default(),
            server_host: p.server_host,
            server_port: p.server_port.unwrap_or(DEFAULT_LDAP_PORT),
            // An unrecognised mode falls back to STARTTLS rather than plaintext.
            encryption: p.encryption_type.parse().unwrap_or(EncryptionMode::StartTls),
            allow_invalid_certs: false,
            base_dn: p.base_dn,
            bind_dn: p.bind_dn,
            bind_password: p.bind_password,
            user_filter: p.user_filter,
            group_filter: p.group_filter,
            attributes: AttributeMapping {
                user_rdn: Some(p.attribute_user_rdn),
                first_name: Some(p.attribute_user_firstname),
                last_name: Some(p.attribute_user_lastname),
                email: Some(p.attribute_user_email),
                display_name: Some(p.attribute_user_display_name),
                group_name: Some(p.attribute_user_group_name),
                group_member: Some(p.attribute_group_member),
            },
            default_permission_add_space: p.default_permission_add_space,
            disable_logout: p.disable_logout,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}
