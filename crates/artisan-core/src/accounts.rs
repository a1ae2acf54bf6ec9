use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Account role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
    /// Legacy storefront account; read-only access to the catalog and its own profile.
    Usuario,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::Usuario => "usuario",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            "usuario" => Ok(Role::Usuario),
            other => Err(CoreError::InvalidRole(other.to_string())),
        }
    }
}

/// Trim and lowercase an email address; `None` if it is not plausibly an address.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return None;
    }
    Some(email)
}

/// Check password strength rules, returning a user-facing message on failure.
///
/// # Errors
///
/// Returns the validation message when the password is too short.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  Ana@Example.COM "),
            Some("ana@example.com".to_string())
        );
    }

    #[test]
    fn normalize_email_rejects_malformed() {
        assert_eq!(normalize_email("no-at-sign"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("ana@localhost"), None);
        assert_eq!(normalize_email("ana maria@example.com"), None);
    }

    #[test]
    fn validate_password_enforces_minimum_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn role_round_trips() {
        for role in [Role::Client, Role::Admin, Role::Usuario] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
    }
}
