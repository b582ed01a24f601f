//! Utility functions

/// Trim and lower-case an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Upper-cased first letters of the first and last name
pub fn make_initials(first_name: &str, last_name: &str) -> String {
    [first_name, last_name]
        .iter()
        .filter_map(|part| part.trim().chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  John.Doe@Example.COM "), "john.doe@example.com");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_make_initials() {
        assert_eq!(make_initials("john", "doe"), "JD");
        assert_eq!(make_initials(" ada", ""), "A");
        assert_eq!(make_initials("", ""), "");
        assert_eq!(make_initials("émile", "zola"), "ÉZ");
    }
}
