use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use rand::rngs::OsRng;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::random_string, DatabaseError, NewSession, NewUser, SessionData, SharedDatabase,
    UserData, UserRole,
};

pub struct Auth {
    db: SharedDatabase,
    provider: Arc<dyn IdentityProvider>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("A user with this email already exists")]
    DuplicateEmail,
    /// The token is unknown, or its expiry has passed
    #[error("Session is invalid")]
    InvalidSession,
    /// The external provider did not vouch for the session id
    #[error("External session is invalid")]
    InvalidExternalSession,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

/// The identity an external provider asserts for a session id it
/// issued
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Error)]
#[error("Identity provider rejected the session: {0}")]
pub struct IdentityError(pub String);

/// An external identity service that can exchange an opaque,
/// provider-issued session id for the identity behind it.
///
/// The provider is an untrusted network collaborator. Any failure to
/// resolve must surface as a rejection, never as an anonymous caller.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, session_id: &str) -> Result<ExternalIdentity, IdentityError>;
}

/// Resolves identities from a provider endpoint over HTTP
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpIdentityProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, session_id: &str) -> Result<ExternalIdentity, IdentityError> {
        #[derive(Deserialize)]
        struct IdentityResponse {
            email: String,
            name: String,
        }

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Session-ID", session_id)
            .send()
            .await
            .map_err(|e| IdentityError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let identity: IdentityResponse = response
            .json()
            .await
            .map_err(|e| IdentityError(e.to_string()))?;

        Ok(ExternalIdentity {
            email: identity.email,
            name: identity.name,
        })
    }
}

impl Auth {
    const SESSION_DURATION_IN_DAYS: i64 = 7;

    pub fn new(db: &SharedDatabase, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            db: db.clone(),
            provider,
            argon: Argon2::default(),
        }
    }

    /// Registers a new account, returning a fresh session for it
    pub async fn register(&self, new_account: NewAccount) -> Result<SessionData, AuthError> {
        let user = self.create_user(new_account).await?;

        self.mint_session(&user).await
    }

    /// Logs in a user, returning a new session. Multiple live
    /// sessions per user are fine.
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await?;

        let user = self
            .db
            .user_by_email(&credentials.email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.mint_session(&user).await
    }

    /// Exchanges an externally issued session id for a playslot
    /// session, creating a customer account on first contact
    pub async fn external_login(&self, session_id: &str) -> Result<SessionData, AuthError> {
        let identity = self
            .provider
            .resolve(session_id)
            .await
            .map_err(|_| AuthError::InvalidExternalSession)?;

        let user = match self.db.user_by_email(&identity.email).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound {
                resource: _,
                identifier: _,
            }) => {
                // No account the user could log into directly, so the
                // password is an unguessable throwaway
                self.create_user(NewAccount {
                    email: identity.email,
                    password: random_string(32),
                    name: identity.name,
                    role: UserRole::Customer,
                })
                .await?
            }
            Err(e) => return Err(AuthError::Db(e)),
        };

        self.mint_session(&user).await
    }

    /// Returns the session behind a token, if it exists and hasn't
    /// expired. The expiry check is strict, a token presented at the
    /// expiry instant is already invalid.
    pub async fn session(&self, token: &str) -> Result<SessionData, AuthError> {
        let session = self.db.session_by_token(token).await.map_err(|e| match e {
            DatabaseError::NotFound {
                resource: _,
                identifier: _,
            } => AuthError::InvalidSession,
            err => AuthError::Db(err),
        })?;

        if Utc::now() >= session.expires_at {
            return Err(AuthError::InvalidSession);
        }

        Ok(session)
    }

    /// Deletes the associated session. A no-op if it's already gone.
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    async fn mint_session(&self, user: &UserData) -> Result<SessionData, AuthError> {
        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id.clone(),
            expires_at,
        };

        self.db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    async fn create_user(&self, new_account: NewAccount) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_account.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .create_user(NewUser {
                email: new_account.email,
                password: hashed_password,
                name: new_account.name,
                role: new_account.role,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict {
                    resource: _,
                    field: _,
                    value: _,
                } => AuthError::DuplicateEmail,
                err => AuthError::Db(err),
            })
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        debug!("Sweeping expired sessions");

        self.db
            .clear_expired_sessions(Utc::now())
            .await
            .map_err(AuthError::Db)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Database, MemoryDatabase};

    /// Provider that vouches for every session id with a fixed
    /// identity, or rejects everything
    struct StubProvider(Option<ExternalIdentity>);

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn resolve(&self, _session_id: &str) -> Result<ExternalIdentity, IdentityError> {
            self.0
                .clone()
                .ok_or_else(|| IdentityError("rejected".to_string()))
        }
    }

    fn setup(provider: StubProvider) -> (Auth, SharedDatabase) {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db, Arc::new(provider));

        (auth, db)
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "correct horse".to_string(),
            name: "Test User".to_string(),
            role: UserRole::Customer,
        }
    }

    #[tokio::test]
    async fn registering_twice_with_same_email_conflicts() {
        let (auth, _) = setup(StubProvider(None));

        auth.register(account("sam@example.com"))
            .await
            .expect("first registration works");

        let result = auth.register(account("sam@example.com")).await;

        assert!(matches!(result, Err(AuthError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn login_verifies_the_password() {
        let (auth, _) = setup(StubProvider(None));

        auth.register(account("sam@example.com")).await.unwrap();

        let wrong = auth
            .login(Credentials {
                email: "sam@example.com".to_string(),
                password: "incorrect horse".to_string(),
            })
            .await;

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = auth
            .login(Credentials {
                email: "nobody@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await;

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        let session = auth
            .login(Credentials {
                email: "sam@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .expect("correct credentials log in");

        assert_eq!(session.user.email, "sam@example.com");
    }

    #[tokio::test]
    async fn sessions_expire_after_seven_days() {
        let (auth, db) = setup(StubProvider(None));

        let session = auth.register(account("sam@example.com")).await.unwrap();
        let lifetime = session.expires_at - session.created_at;

        assert_eq!(lifetime.num_days(), 7);

        // A session whose expiry has passed is invalid, even though
        // the record still exists
        let expired = db
            .create_session(NewSession {
                token: "expired-token".to_string(),
                user_id: session.user.id.clone(),
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        let result = auth.session(&expired.token).await;
        assert!(matches!(result, Err(AuthError::InvalidSession)));

        let valid = auth.session(&session.token).await;
        assert!(valid.is_ok());
    }

    #[tokio::test]
    async fn logout_invalidates_and_is_idempotent() {
        let (auth, _) = setup(StubProvider(None));

        let session = auth.register(account("sam@example.com")).await.unwrap();

        auth.logout(&session.token).await.unwrap();
        auth.logout(&session.token).await.unwrap();

        let result = auth.session(&session.token).await;
        assert!(matches!(result, Err(AuthError::InvalidSession)));
    }

    #[tokio::test]
    async fn external_login_creates_a_customer_account() {
        let (auth, _) = setup(StubProvider(Some(ExternalIdentity {
            email: "ext@example.com".to_string(),
            name: "External User".to_string(),
        })));

        let session = auth.external_login("provider-session").await.unwrap();

        assert_eq!(session.user.email, "ext@example.com");
        assert_eq!(session.user.role, UserRole::Customer);
    }

    #[tokio::test]
    async fn external_login_links_to_an_existing_account() {
        let (auth, _) = setup(StubProvider(Some(ExternalIdentity {
            email: "sam@example.com".to_string(),
            name: "Sam Elsewhere".to_string(),
        })));

        let registered = auth.register(account("sam@example.com")).await.unwrap();
        let session = auth.external_login("provider-session").await.unwrap();

        assert_eq!(session.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn rejected_external_sessions_never_degrade() {
        let (auth, _) = setup(StubProvider(None));

        let result = auth.external_login("provider-session").await;

        assert!(matches!(result, Err(AuthError::InvalidExternalSession)));
    }
}
