//! Password hashing, signed-token issuance/verification and the account
//! operations built on them (register, login, authenticate).

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::{Role, User};
use crate::store::Store;

/// Tokens are valid for 24 hours from issuance.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signer/verifier around the process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_lifetime(secret, Duration::hours(TOKEN_LIFETIME_HOURS))
    }

    pub fn with_lifetime(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".into()),
                _ => AppError::Unauthorized("Invalid token".into()),
            })
    }
}

/// Salted bcrypt hashing. Runs on the blocking pool so request threads stay free.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash task failed: {e}")))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("verify task failed: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// Public part of an account, as returned next to a fresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub user_type: Role,
    pub business_id: Option<Uuid>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            user_type: user.role,
            business_id: user.business_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> AppResult<String> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err(AppError::validation("email", "value is not a valid email address"))
    }
}

/// Account operations. Holds the signer and hasher; the store is passed per call.
#[derive(Clone)]
pub struct Identity {
    tokens: TokenIssuer,
    hasher: PasswordHasher,
}

impl Identity {
    pub fn new(tokens: TokenIssuer, hasher: PasswordHasher) -> Self {
        Self { tokens, hasher }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, store: &dyn Store, input: Registration) -> AppResult<AuthResponse> {
        let email = validate_email(&input.email)?;
        if input.password.is_empty() {
            return Err(AppError::validation("password", "password must not be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::validation("name", "name must not be empty"));
        }
        if store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: self.hasher.hash(&input.password).await?,
            name: input.name.trim().to_string(),
            role: input.role,
            business_id: None,
            review_count: 0,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await?;
        info!(user_id = %user.id, role = %user.role, "user registered");

        Ok(AuthResponse {
            token: self.tokens.issue(user.id, &user.email)?,
            user: UserSummary::from(&user),
        })
    }

    pub async fn login(&self, store: &dyn Store, email: &str, password: &str) -> AppResult<AuthResponse> {
        let invalid = || AppError::Unauthorized("Invalid email or password".into());
        let user = store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash).await? {
            return Err(invalid());
        }
        Ok(AuthResponse {
            token: self.tokens.issue(user.id, &user.email)?,
            user: UserSummary::from(&user),
        })
    }

    /// Verify the token and resolve its subject to a live user.
    pub async fn authenticate(&self, store: &dyn Store, token: &str) -> AppResult<User> {
        let claims = self.tokens.verify(token)?;
        store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))
    }

    /// Like [`Identity::authenticate`] but never fails: a missing or bad token is "no user".
    pub async fn authenticate_optional(&self, store: &dyn Store, token: Option<&str>) -> Option<User> {
        let token = token?;
        self.authenticate(store, token).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn identity() -> Identity {
        Identity::new(TokenIssuer::new("test-secret"), PasswordHasher::new(4))
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.into(),
            password: "s3cret!".into(),
            name: "Meera".into(),
            role: Role::Customer,
        }
    }

    #[test]
    fn token_round_trips_subject_and_email() {
        let issuer = TokenIssuer::new("k");
        let id = Uuid::new_v4();
        let token = issuer.issue(id, "meera@example.com").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "meera@example.com");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_HOURS * 3600);
    }

    #[test]
    fn rejects_expired_tokens() {
        let issuer = TokenIssuer::with_lifetime("k", Duration::seconds(-10));
        let token = issuer.issue(Uuid::new_v4(), "a@b.co").unwrap();
        match issuer.verify(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }

    #[test]
    fn rejects_foreign_signatures_and_garbage() {
        let token = TokenIssuer::new("one").issue(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(matches!(
            TokenIssuer::new("two").verify(&token),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            TokenIssuer::new("two").verify("not.a.jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn email_validation() {
        assert_eq!(validate_email(" a@b.co ").unwrap(), "a@b.co");
        for bad in ["", "plain", "@b.co", "a@b", "a@.co", "a@b.co.", "a b@c.de", "a@b@c.de"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[tokio::test]
    async fn register_then_login_and_authenticate() {
        let store = MemoryStore::new();
        let id = identity();
        let registered = id.register(&store, registration("meera@example.com")).await.unwrap();
        assert_eq!(registered.user.user_type, Role::Customer);

        let stored = store.find_user_by_email("meera@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "s3cret!");

        let logged_in = id.login(&store, "meera@example.com", "s3cret!").await.unwrap();
        let user = id.authenticate(&store, &logged_in.token).await.unwrap();
        assert_eq!(user.id, registered.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let id = identity();
        id.register(&store, registration("dup@example.com")).await.unwrap();
        let err = id.register(&store, registration("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_unauthorized() {
        let store = MemoryStore::new();
        let id = identity();
        id.register(&store, registration("x@example.com")).await.unwrap();
        assert!(matches!(
            id.login(&store, "x@example.com", "wrong").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            id.login(&store, "nobody@example.com", "s3cret!").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_requires_a_live_user() {
        let store = MemoryStore::new();
        let id = identity();
        let ghost = id.tokens().issue(Uuid::new_v4(), "ghost@example.com").unwrap();
        match id.authenticate(&store, &ghost).await {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("expected unauthorized, got {other:?}"),
        }
        assert!(id.authenticate_optional(&store, Some(&ghost)).await.is_none());
        assert!(id.authenticate_optional(&store, Some("garbage")).await.is_none());
        assert!(id.authenticate_optional(&store, None).await.is_none());
    }
}
