//! Email address normalization and syntactic validation.

/// Canonical form used everywhere an email is compared or stored:
/// trimmed and lowercased. Credentials and accounts are keyed by this form.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cheap syntactic check, not RFC 5322: exactly one `@`, a non-empty local
/// part, and a domain with an interior dot. Deliverability is proven by the
/// access-code email itself.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
