//! Mapping of raw directory entries onto [`RemoteUser`] records

use dirbridge_core::types::RemoteUser;
use dirbridge_core::utils::normalize_email;
use dirbridge_core::{DirectoryConfig, NAME_PLACEHOLDER};
use ldap3::SearchEntry;

/// Common name attribute, always requested
pub const COMMON_NAME_ATTR: &str = "cn";

/// Build a [`RemoteUser`] from one entry. Pure and deterministic.
pub fn extract(config: &DirectoryConfig, entry: &SearchEntry) -> RemoteUser {
    let attrs = &config.attributes;
    let mapped = |name: &Option<String>| {
        name.as_deref()
            .and_then(|attr| first_value(entry, attr))
            .unwrap_or_default()
    };

    // TODO: derive first/last name from the display name attribute when both
    // are missing, once a splitting rule for display names is agreed on.
    RemoteUser {
        dn: entry.dn.clone(),
        first_name: or_placeholder(mapped(&attrs.first_name)),
        last_name: or_placeholder(mapped(&attrs.last_name)),
        email: normalize_email(&mapped(&attrs.email)),
        remote_id: mapped(&attrs.user_rdn),
        common_name: first_value(entry, COMMON_NAME_ATTR).unwrap_or_default(),
    }
}

/// Attributes requested by user searches
pub fn user_attributes(config: &DirectoryConfig) -> Vec<String> {
    let attrs = &config.attributes;
    let mut names: Vec<String> = Vec::new();

    for name in [
        &attrs.user_rdn,
        &attrs.first_name,
        &attrs.last_name,
        &attrs.email,
        &attrs.display_name,
    ]
    .into_iter()
    .flatten()
    .map(String::as_str)
    .chain(std::iter::once(COMMON_NAME_ATTR))
    {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }

    names
}

/// Attributes requested by group searches
pub fn group_attributes(config: &DirectoryConfig) -> Vec<String> {
    let attrs = &config.attributes;
    [&attrs.group_member, &attrs.group_name]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
}

/// All values of an attribute; names compare case-insensitively.
pub fn attr_values<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    if let Some(values) = entry.attrs.get(name) {
        return values;
    }

    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
        .unwrap_or_default()
}

fn first_value(entry: &SearchEntry, name: &str) -> Option<String> {
    attr_values(entry, name).first().cloned()
}

fn or_placeholder(value: String) -> String {
    if value.trim().is_empty() {
        NAME_PLACEHOLDER.to_string()
    } else {
        value
    }
}
