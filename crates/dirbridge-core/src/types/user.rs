//! User types

use serde::{Deserialize, Serialize};

use crate::utils::make_initials;

/// One directory entry mapped onto user fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    /// Entry DN
    pub dn: String,
    pub first_name: String,
    pub last_name: String,
    /// Always trimmed and lower-cased; may be empty
    pub email: String,
    /// Value of the RDN attribute
    pub remote_id: String,
    /// Value of `cn`
    pub common_name: String,
}

/// A local-user-shaped record synthesized from directory data
///
/// Created during reconciliation only. Persisting it is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledUser {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    pub email: String,
    pub initials: String,
    pub editor: bool,
    pub active: bool,
    pub admin: bool,
    pub analytics: bool,
    pub view_users: bool,
    pub global: bool,
}

impl ReconciledUser {
    /// New active user without elevated privileges.
    pub fn from_remote(remote: &RemoteUser, editor: bool) -> Self {
        Self {
            first_name: remote.first_name.clone(),
            last_name: remote.last_name.clone(),
            email: remote.email.clone(),
            initials: make_initials(&remote.first_name, &remote.last_name),
            editor,
            active: true,
            admin: false,
            analytics: false,
            view_users: false,
            global: false,
        }
    }
}

/// Existing local account as reported by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub email: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Changes a sync would apply to the local population
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    /// Directory users with no local account
    pub to_add: Vec<ReconciledUser>,
    /// Emails of active local accounts absent from the directory
    pub to_deactivate: Vec<String>,
    /// Directory entries ignored for lack of an email address
    pub missing: usize,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_deactivate.is_empty()
    }
}
