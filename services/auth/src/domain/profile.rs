use conecta_domain::role::Role;

use crate::domain::types::AuthAccount;

/// Outcome of narrowing an email's active accounts down to one.
#[derive(Debug)]
pub enum ProfileResolution {
    /// No active account carries the email.
    None,
    /// Exactly one candidate remained.
    Single(AuthAccount),
    /// Several roles share the email and no hint narrowed them down.
    /// Roles are sorted and deduplicated for a stable client payload.
    Multiple(Vec<Role>),
    /// A role hint was given but no listed account holds that role.
    HintMismatch,
}

/// Picks the account a login should land on.
///
/// `accounts` must already be filtered to active rows for a single email.
pub fn resolve_profiles(
    accounts: Vec<AuthAccount>,
    role_hint: Option<Role>,
) -> ProfileResolution {
    if accounts.is_empty() {
        return ProfileResolution::None;
    }

    if let Some(hint) = role_hint {
        return match accounts.into_iter().find(|a| a.role == hint) {
            Some(account) => ProfileResolution::Single(account),
            None => ProfileResolution::HintMismatch,
        };
    }

    if accounts.len() == 1 {
        let account = accounts.into_iter().next().unwrap();
        return ProfileResolution::Single(account);
    }

    let mut roles: Vec<Role> = accounts.into_iter().map(|a| a.role).collect();
    roles.sort();
    roles.dedup();
    ProfileResolution::Multiple(roles)
}
