//! Internal utilities for the organizations module.

use super::error::{OrganizationError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest accepted organization name, in characters.
pub(crate) const MAX_NAME_LEN: usize = 100;

/// Longest accepted slug, in bytes.
pub(crate) const MAX_SLUG_LEN: usize = 64;

/// Get current Unix timestamp in seconds.
#[inline]
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Generate a new opaque identifier.
#[inline]
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Basic email format validation.
///
/// Checks that the email:
/// - Contains exactly one `@` symbol
/// - Has at least one character before `@`
/// - Has at least one `.` after `@`
/// - Has at least one character after the last `.`
///
/// This is not RFC 5322 compliant but catches obvious formatting errors.
#[inline]
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    domain.split('.').all(|label| !label.is_empty())
}

/// Canonical form used for storage and comparison.
#[inline]
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lowercase ASCII alphanumeric words joined by single hyphens.
pub(crate) fn is_valid_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return false;
    }

    slug.split('-').all(|word| {
        !word.is_empty()
            && word
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

/// Trim and check an organization display name.
pub(crate) fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OrganizationError::invalid_name("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(OrganizationError::invalid_name(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Check a slug and return it unchanged.
pub(crate) fn validate_slug(slug: &str) -> Result<String> {
    if is_valid_slug(slug) {
        Ok(slug.to_string())
    } else {
        Err(OrganizationError::invalid_slug(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name@example.com"));
        assert!(is_valid_email("user@sub.example.com"));
        assert!(is_valid_email("user+tag@example.com"));
        assert!(is_valid_email("  Bob@X.com "));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user@.example.com"));
        assert!(!is_valid_email("user@example."));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Bob@X.COM "), "bob@x.com");
    }

    #[test]
    fn test_slugs() {
        assert!(is_valid_slug("acme"));
        assert!(is_valid_slug("acme-2"));
        assert!(is_valid_slug("a-b-c"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Acme"));
        assert!(!is_valid_slug("-acme"));
        assert!(!is_valid_slug("acme-"));
        assert!(!is_valid_slug("ac--me"));
        assert!(!is_valid_slug("ac_me"));
        assert!(!is_valid_slug(&"a".repeat(MAX_SLUG_LEN + 1)));
        assert!(is_valid_slug(&"a".repeat(MAX_SLUG_LEN)));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Acme  ").unwrap(), "Acme");
        assert!(matches!(
            validate_name("   "),
            Err(OrganizationError::InvalidName { .. })
        ));
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
