//! JWT authentication module.
//!
//! Handles token issuance and validation, password hashing, and MFA codes.
//!
//! ```text
//! POST /login ──► verify_password ──┬── no MFA ──► access token (mfa: false)
//!                                   │
//!                                   └── MFA ────► code ──► MfaDelivery
//!                                                           │
//! POST /login/mfa ◄─────────────────────────────────────────┘
//!        └──► access token (mfa: true)
//! ```

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use stockadoodle_core::{Role, User, MFA_CODE_DIGITS};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Username at issue time
    pub username: String,

    /// Role at issue time. Requests use the stored role, not this one.
    pub role: Role,

    /// True when the session passed a second factor
    #[serde(default)]
    pub mfa: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access")
    pub token_type: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: String, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            access_lifetime_secs,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_lifetime_secs(&self) -> i64 {
        self.access_lifetime_secs
    }

    /// Generate an access token for `user`.
    pub fn generate_access_token(&self, user: &User, mfa: bool) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            mfa,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        self.sign(&claims)
    }

    /// Signs arbitrary claims with the server secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("Failed to generate token: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::default();

        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ApiError::auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(ApiError::auth("Expected access token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Hashing
// =============================================================================

/// Well-formed hash with the default parameters that no password matches.
///
/// Logins for unknown usernames verify against it so they cost the same
/// argon2 work as a wrong password.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0c2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hashes a password (or MFA code) with argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })?;

    Ok(hash.to_string())
}

/// Checks `password` against a stored argon2 hash. A malformed hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// MFA Codes
// =============================================================================

/// Generates a zero-padded numeric code from the OS random source.
pub fn generate_mfa_code() -> String {
    let modulus = 10u32.pow(MFA_CODE_DIGITS as u32);
    format!(
        "{:0width$}",
        OsRng.next_u32() % modulus,
        width = MFA_CODE_DIGITS
    )
}

/// Hands a freshly generated MFA code to the user.
pub trait MfaDelivery: Send + Sync {
    fn deliver(&self, user: &User, code: &str);
}

/// Development delivery: writes the code to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

impl MfaDelivery for LogDelivery {
    fn deliver(&self, user: &User, code: &str) {
        info!(
            user_id = %user.id,
            username = %user.username,
            email = user.email.as_deref().unwrap_or_default(),
            code = %code,
            "MFA code issued"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: "user-001".to_string(),
            username: "ana".to_string(),
            full_name: "Ana Cruz".to_string(),
            email: None,
            role,
            mfa_enabled: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let token = manager
            .generate_access_token(&user(Role::Manager), false)
            .unwrap();
        let claims = manager.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, Role::Manager);
        assert!(!claims.mfa);
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let verifier = JwtManager::new("secret-b".to_string(), 3600);

        let token = issuer.generate_access_token(&user(Role::Retailer), false).unwrap();
        assert!(verifier.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-001".to_string(),
            username: "ana".to_string(),
            role: Role::Retailer,
            mfa: false,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
            token_type: "access".to_string(),
        };
        let token = manager.sign(&claims).unwrap();
        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_dummy_hash_costs_a_real_verification() {
        assert!(PasswordHash::new(DUMMY_PASSWORD_HASH).is_ok());
        assert!(!verify_password("", DUMMY_PASSWORD_HASH));
        assert!(!verify_password("correct horse", DUMMY_PASSWORD_HASH));

        // Same algorithm and cost parameters as freshly hashed passwords.
        let params = |hash: &str| hash.split('$').take(4).collect::<Vec<_>>().join("$");
        let fresh = hash_password("correct horse").unwrap();
        assert_eq!(params(DUMMY_PASSWORD_HASH), params(&fresh));
    }

    #[test]
    fn test_mfa_code_shape() {
        for _ in 0..20 {
            let code = generate_mfa_code();
            assert_eq!(code.len(), MFA_CODE_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
