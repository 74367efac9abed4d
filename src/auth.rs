//! Sign-in checks and the session seam.
//!
//! Authentication itself belongs to the provider; this module only validates
//! what the admin typed and exposes the session so callers can gate on it.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{Error, ErrorContext, ErrorDetail, config::Admin};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter both email and password.")]
    MissingCredentials,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters.")]
    ShortPassword,
    #[error("No account found with this email.")]
    UnknownAccount,
    #[error("Incorrect password.")]
    WrongPassword,
}

#[derive(Clone, derive_debug::Dbg)]
pub struct Credentials {
    pub email: String,
    #[dbg(skip)]
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if !EMAIL.is_match(&self.email) {
            return Err(AuthError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::ShortPassword);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub email: String,
}

pub trait AuthProvider {
    /// The receiver always holds the current session; `None` when signed out.
    fn observe_session(&self) -> watch::Receiver<Option<Session>>;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// Fails with `Unauthenticated` unless someone is signed in.
pub fn require_session<A: AuthProvider>(auth: &A) -> Result<Session, Error> {
    auth.observe_session()
        .borrow()
        .clone()
        .ok_or_else(|| ErrorContext::new("check session").error(ErrorDetail::Unauthenticated))
}

/// A provider for a single configured admin account.
pub struct StaticAuth {
    admin: Admin,
    session: watch::Sender<Option<Session>>,
}

impl StaticAuth {
    pub fn new(admin: Admin) -> Self {
        Self {
            admin,
            session: watch::Sender::new(None),
        }
    }

    pub fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        credentials.validate()?;
        if !credentials.email.eq_ignore_ascii_case(&self.admin.email) {
            return Err(AuthError::UnknownAccount);
        }
        let digest = blake3::hash(credentials.password.as_bytes());
        if blake3::Hash::from_hex(&self.admin.password_blake3).ok() != Some(digest) {
            return Err(AuthError::WrongPassword);
        }
        let session = Session {
            name: self
                .admin
                .name
                .clone()
                .unwrap_or_else(|| self.admin.email.clone()),
            email: self.admin.email.clone(),
        };
        info!(email = %session.email, "signed in");
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }
}

impl AuthProvider for StaticAuth {
    fn observe_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session.send_replace(None).is_some() {
            debug!("signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    fn auth() -> StaticAuth {
        StaticAuth::new(Admin {
            email: "admin@example.com".into(),
            name: Some("Admin".into()),
            password_blake3: blake3::hash(b"hunter22").to_hex().to_string(),
        })
    }

    #[test]
    fn validates_input_shape() {
        assert_eq!(
            credentials(" ", "secret").validate(),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            credentials("admin@localhost", "secret").validate(),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            credentials("a@b.co", "12345").validate(),
            Err(AuthError::ShortPassword)
        );
        assert_eq!(credentials("a@b.co", "123456").validate(), Ok(()));
    }

    #[tokio::test]
    async fn session_follows_sign_in_and_out() {
        let auth = auth();
        let observer = auth.observe_session();
        assert!(require_session(&auth).is_err());
        assert_eq!(
            auth.sign_in(&credentials("other@example.com", "hunter22")),
            Err(AuthError::UnknownAccount)
        );
        assert_eq!(
            auth.sign_in(&credentials("admin@example.com", "hunter23")),
            Err(AuthError::WrongPassword)
        );
        auth.sign_in(&credentials("Admin@Example.com", "hunter22"))
            .unwrap();
        assert_eq!(
            observer.borrow().as_ref().map(|s| s.name.as_str()),
            Some("Admin")
        );
        assert_eq!(require_session(&auth).unwrap().email, "admin@example.com");
        auth.sign_out().await.unwrap();
        assert!(observer.borrow().is_none());
        let error = require_session(&auth).unwrap_err();
        assert_eq!(error.user_message(), "Error: Not signed in");
    }
}
