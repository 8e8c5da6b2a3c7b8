//! Accounts, password checks and browser sessions.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::forms::FieldErrors;
use crate::application::repos::{CreateUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::accounts;
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created(UserRecord),
    Invalid(FieldErrors),
}

/// Freshly issued session. `token` goes into the cookie; only its digest is stored.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn create_user(&self, form: SignupForm) -> Result<SignupOutcome, AccountError> {
        let mut errors = FieldErrors::default();

        let username = accounts::normalize_username(&form.username)
            .inspect_err(|err| errors.push_domain(err))
            .ok();
        let email = accounts::normalize_email(&form.email)
            .inspect_err(|err| errors.push_domain(err))
            .ok();

        if form.password1 != form.password2 {
            errors.push("password2", "The two password fields didn't match.");
        } else if let Err(err) =
            accounts::check_password(&form.password1, username.as_deref().unwrap_or_default())
        {
            errors.push("password2", err_message(&err));
        }

        let (Some(username), Some(email)) = (username, email) else {
            return Ok(SignupOutcome::Invalid(errors));
        };
        if !errors.is_empty() {
            return Ok(SignupOutcome::Invalid(errors));
        }
        if self.users.find_user_by_username(&username).await?.is_some() {
            errors.push("username", "A user with that username already exists.");
            return Ok(SignupOutcome::Invalid(errors));
        }

        let password_hash = hash_password(&form.password1)?;
        let created = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email,
                password_hash,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(
                    target = "yatube::application::accounts",
                    user_id = user.id,
                    username = %user.username,
                    "user created"
                );
                Ok(SignupOutcome::Created(user))
            }
            // Lost a race with a concurrent signup for the same name.
            Err(RepoError::Duplicate { .. }) => {
                errors.push("username", "A user with that username already exists.");
                Ok(SignupOutcome::Invalid(errors))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check credentials. `None` means unknown user or wrong password.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AccountError> {
        let Some(user) = self.users.find_user_by_username(username.trim()).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn start_session(&self, user_id: i64) -> Result<SessionToken, RepoError> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let created_at = OffsetDateTime::now_utc();
        let expires_at = created_at + self.session_ttl;
        self.sessions
            .create_session(SessionRecord {
                token_hash: hash_token(&token),
                user_id,
                created_at,
                expires_at,
            })
            .await?;
        Ok(SessionToken { token, expires_at })
    }

    /// Resolve a session cookie to its user. Expired or unknown tokens yield `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, RepoError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.sessions
            .find_session_user(&hash_token(token), OffsetDateTime::now_utc())
            .await
    }

    pub async fn end_session(&self, token: &str) -> Result<(), RepoError> {
        self.sessions.delete_session(&hash_token(token)).await
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| AccountError::Hashing(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AccountError> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|err| AccountError::Hashing(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AccountError::Hashing(err.to_string())),
    }
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn err_message(error: &DomainError) -> String {
    match error {
        DomainError::Validation { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
