//! Session Token Signing
//!
//! Mint and parse the cookie token: `"{session_id}.{base64url(hmac)}"`,
//! HMAC-SHA256 over the UUID string with the 32-byte session secret.
//! Issue and verify share this module so the format cannot drift.

use hmac::{Hmac, Mac};
use platform::crypto::{from_base64_url, to_base64_url};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Sign a session ID into a cookie token
pub fn mint_token(secret: &[u8; 32], session_id: Uuid) -> String {
    let session_id = session_id.to_string();

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(session_id.as_bytes());
    let signature = mac.finalize().into_bytes();

    format!("{}.{}", session_id, to_base64_url(signature.as_slice()))
}

/// Verify a cookie token and extract the session ID
///
/// Signature verification happens before any storage lookup, so forged
/// tokens never reach the database.
pub fn parse_token(secret: &[u8; 32], token: &str) -> AuthResult<Uuid> {
    let (session_id_str, signature_b64) =
        token.split_once('.').ok_or(AuthError::SessionInvalid)?;

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(session_id_str.as_bytes());

    let signature = from_base64_url(signature_b64).map_err(|_| AuthError::SessionInvalid)?;

    mac.verify_slice(&signature)
        .map_err(|_| AuthError::SessionInvalid)?;

    session_id_str
        .parse()
        .map_err(|_| AuthError::SessionInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 32] = [7u8; 32];

    #[test]
    fn test_mint_and_parse() {
        let session_id = Uuid::new_v4();
        let token = mint_token(&SECRET, session_id);
        assert_eq!(parse_token(&SECRET, &token).unwrap(), session_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = mint_token(&SECRET, Uuid::new_v4());
        let other = [8u8; 32];
        assert!(matches!(
            parse_token(&other, &token),
            Err(AuthError::SessionInvalid)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let session_id = Uuid::new_v4();
        let token = mint_token(&SECRET, session_id);

        // Swap the session id, keep the signature
        let (_, sig) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", Uuid::new_v4(), sig);
        assert!(parse_token(&SECRET, &forged).is_err());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(parse_token(&SECRET, "").is_err());
        assert!(parse_token(&SECRET, "no-dot-here").is_err());
        assert!(parse_token(&SECRET, "a.b.c").is_err());
        assert!(parse_token(&SECRET, "not-a-uuid.!!!").is_err());
    }
}
