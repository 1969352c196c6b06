//! Identity collaborator
//!
//! Bearer tokens are never stored; only their SHA-256 digest is kept in the
//! `users` table and compared on every request.

use crate::db::{Database, DbResult, User};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const TOKEN_PREFIX: &str = "chl_";

/// Verified identifier of a transcript owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&User> for UserId {
    fn from(user: &User) -> Self {
        Self(user.id.clone())
    }
}

/// Compute SHA-256 hash of a bearer token (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{digest:x}")
}

/// Generate a fresh random bearer token
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Loggable form of a token: the first few characters, never the secret.
pub fn token_prefix(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREFIX.len() + 4).collect();
    format!("{head}…")
}

/// Create a user and return it together with its plaintext token.
///
/// The token is shown once; only its hash is persisted.
pub fn register_user(db: &Database, name: &str) -> DbResult<(User, String)> {
    let token = generate_token();
    let id = uuid::Uuid::new_v4().to_string();
    let user = db.create_user(&id, name, &hash_token(&token))?;
    Ok((user, token))
}

/// Resolve a presented bearer token to the identity that owns it
pub fn verify_token(db: &Database, token: &str) -> DbResult<UserId> {
    let user = db.find_user_by_token_hash(&hash_token(token.trim()))?;
    Ok(UserId::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;

    #[test]
    fn hash_is_stable_hex() {
        let a = hash_token("secret");
        assert_eq!(a, hash_token("secret"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, hash_token("Secret"));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert!(a.starts_with(TOKEN_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn token_prefix_hides_the_secret() {
        let token = generate_token();
        let shown = token_prefix(&token);
        assert!(shown.starts_with(TOKEN_PREFIX));
        assert!(shown.chars().count() < 12);
        assert!(!shown.contains(&token[TOKEN_PREFIX.len() + 4..]));
        assert_eq!(token_prefix("ab"), "ab…");
    }

    #[test]
    fn registered_token_verifies() {
        let db = Database::open_in_memory().unwrap();
        let (user, token) = register_user(&db, "alice").unwrap();

        let id = verify_token(&db, &token).unwrap();
        assert_eq!(id.as_str(), user.id);

        assert!(matches!(
            verify_token(&db, "chl_forged"),
            Err(DbError::UserNotFound(_))
        ));
    }
}
