//! Password checks and signed bearer tokens.
//!
//! Passwords are stored as bcrypt hashes. Sessions are stateless: a login
//! issues an HMAC-SHA256 signed token carrying the username, role, and an
//! expiry timestamp. The signing key comes from the `LECTERN_SECRET`
//! environment variable, with a development fallback matching the key the
//! service has always defaulted to.

use anyhow::{bail, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::SqlitePool;

type HmacSha256 = Hmac<Sha256>;

const DEV_SECRET: &str = "dev-key-please-change-in-prod";

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";

/// Claims carried inside a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    pub role: String,
    pub expires_at: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

fn signing_key() -> Vec<u8> {
    std::env::var("LECTERN_SECRET")
        .unwrap_or_else(|_| DEV_SECRET.to_string())
        .into_bytes()
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check credentials against the users table. Returns the user's role on
/// success. A missing user and a wrong password produce the same error so
/// the response does not leak which usernames exist.
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> Result<String> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT password_hash, role FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((hash, role)) if verify_password(password, &hash) => Ok(role),
        _ => bail!("Invalid username or password"),
    }
}

/// Issue a signed token valid for `ttl_secs`.
pub fn issue_token(username: &str, role: &str, ttl_secs: u64) -> Result<String> {
    if username.contains('|') {
        bail!("Invalid username");
    }
    let expires_at = chrono::Utc::now().timestamp() + ttl_secs as i64;
    let payload = format!("{}|{}|{}", username, role, expires_at);

    let mut mac = HmacSha256::new_from_slice(&signing_key())?;
    mac.update(payload.as_bytes());
    let sig = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(payload), sig))
}

/// Verify a token's signature and expiry and return its claims.
pub fn verify_token(token: &str) -> Result<Claims> {
    let (payload_b64, sig_hex) = token
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("Malformed token"))?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| anyhow::anyhow!("Malformed token"))?;
    let sig = hex::decode(sig_hex).map_err(|_| anyhow::anyhow!("Malformed token"))?;

    let mut mac = HmacSha256::new_from_slice(&signing_key())?;
    mac.update(&payload_bytes);
    // Constant-time comparison via the Mac verifier
    if mac.verify_slice(&sig).is_err() {
        bail!("Invalid token signature");
    }

    let payload = String::from_utf8(payload_bytes)?;
    let mut parts = payload.splitn(3, '|');
    let (username, role, expiry) = match (parts.next(), parts.next(), parts.next()) {
        (Some(u), Some(r), Some(e)) => (u, r, e),
        _ => bail!("Malformed token payload"),
    };

    let expires_at: i64 = expiry.parse()?;
    if chrono::Utc::now().timestamp() >= expires_at {
        bail!("Session expired. Please log in again.");
    }

    Ok(Claims {
        username: username.to_string(),
        role: role.to_string(),
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn token_roundtrip() {
        let token = issue_token("amira", ROLE_STUDENT, 3600).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.username, "amira");
        assert_eq!(claims.role, ROLE_STUDENT);
        assert!(!claims.is_admin());
    }

    #[test]
    fn tampered_token_rejected() {
        let token = issue_token("amira", ROLE_STUDENT, 3600).unwrap();
        let (payload_b64, sig) = token.split_once('.').unwrap();

        // Swap the role inside the payload but keep the original signature
        let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(payload_b64).unwrap()).unwrap();
        let escalated = payload.replace(ROLE_STUDENT, ROLE_ADMIN);
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(escalated), sig);
        assert!(verify_token(&forged).is_err());

        // Flipping a signature character must also fail
        let mut chars: Vec<char> = token.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'a' { 'b' } else { 'a' };
        let flipped: String = chars.into_iter().collect();
        assert!(verify_token(&flipped).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let token = issue_token("amira", ROLE_STUDENT, 0).unwrap();
        let err = verify_token(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn garbage_tokens_rejected() {
        assert!(verify_token("").is_err());
        assert!(verify_token("no-dot-here").is_err());
        assert!(verify_token("abc.def").is_err());
    }

    #[test]
    fn pipe_in_username_rejected() {
        assert!(issue_token("a|b", ROLE_STUDENT, 60).is_err());
    }
}
