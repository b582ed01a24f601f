//! Reconciliation of directory users into local-user records

use std::collections::HashSet;

use dirbridge_core::types::{LocalUser, ReconciledUser, RemoteUser, SyncPlan};
use dirbridge_core::utils::normalize_email;
use dirbridge_core::DirectoryConfig;

/// Merge both search modes into one user set keyed by email.
///
/// User-filter results come first, then group-filter results. The first
/// occurrence of an email wins and output keeps first-seen order. Entries
/// without an email are dropped and never match each other.
pub fn reconcile(
    config: &DirectoryConfig,
    user_results: &[RemoteUser],
    group_results: &[RemoteUser],
) -> Vec<ReconciledUser> {
    let mut seen = HashSet::new();
    let mut users = Vec::new();

    for remote in user_results.iter().chain(group_results) {
        let email = normalize_email(&remote.email);
        if email.is_empty() || !seen.insert(email.clone()) {
            continue;
        }

        let mut user = ReconciledUser::from_remote(remote, config.default_permission_add_space);
        user.email = email;
        users.push(user);
    }

    users
}

/// Number of entries reconciliation ignores for lack of an email.
pub fn missing_email_count<'a>(remote: impl IntoIterator<Item = &'a RemoteUser>) -> usize {
    remote
        .into_iter()
        .filter(|user| normalize_email(&user.email).is_empty())
        .count()
}

/// Diff the reconciled set against the existing local population.
pub fn plan(reconciled: &[ReconciledUser], existing: &[LocalUser], missing: usize) -> SyncPlan {
    let local: HashSet<String> = existing.iter().map(|u| normalize_email(&u.email)).collect();
    let remote: HashSet<&str> = reconciled.iter().map(|u| u.email.as_str()).collect();

    let to_add = reconciled
        .iter()
        .filter(|user| !local.contains(&user.email))
        .cloned()
        .collect();

    let to_deactivate = existing
        .iter()
        .filter(|user| user.active)
        .map(|user| normalize_email(&user.email))
        .filter(|email| !email.is_empty() && !remote.contains(email.as_str()))
        .collect();

    SyncPlan {
        to_add,
        to_deactivate,
        missing,
    }
}
