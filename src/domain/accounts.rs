//! Account field rules.

use super::error::DomainError;

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Usernames are 1-150 characters of letters, digits and `@ . + - _`.
pub fn normalize_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation(
            "username",
            super::posts::REQUIRED_MESSAGE,
        ));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(DomainError::validation(
            "username",
            format!("Ensure this value has at most {USERNAME_MAX_LEN} characters."),
        ));
    }
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(DomainError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(username.to_string())
}

pub fn check_password(password: &str, username: &str) -> Result<(), DomainError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(DomainError::validation(
            "password",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
            ),
        ));
    }
    if password.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(DomainError::validation(
            "password",
            "This password is entirely numeric.",
        ));
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        return Err(DomainError::validation(
            "password",
            "The password is too similar to the username.",
        ));
    }
    Ok(())
}

/// Empty emails are allowed; anything else needs a local part and a dotted domain.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && domain.contains('.')
            && !domain.contains('@')
    });
    if !valid {
        return Err(DomainError::validation(
            "email",
            "Enter a valid email address.",
        ));
    }
    Ok(email.to_ascii_lowercase())
}
