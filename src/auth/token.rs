use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::errors::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Session token lifetime.
pub const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens with an HMAC-SHA256 key held in
/// memory for the lifetime of the process. Restarting the server
/// invalidates every previously issued token.
///
/// Token wire format: `base64url(claims JSON) . base64url(signature)`.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    /// Create a signer with a fresh 64-byte random secret.
    pub fn generate() -> Self {
        let mut secret = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Issue a token for `user_id`, valid for [`TOKEN_TTL_SECS`].
    pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    fn issue_at(&self, user_id: Uuid, iat: i64) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id,
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ApiError::Internal(format!("Failed to encode token claims: {}", e)))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(payload_b64.as_bytes())?;
        Ok(format!(
            "{}.{}",
            payload_b64,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Check the signature and expiry of `token` and return the user id
    /// it was issued for. Any malformed, tampered, or expired token is
    /// `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let (payload_b64, sig_b64) = token.split_once('.').ok_or(ApiError::Unauthorized)?;
        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| ApiError::Unauthorized)?;

        // Signature first; claims from an unverified payload are never parsed.
        let mut mac = self.mac()?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| ApiError::Unauthorized)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| ApiError::Unauthorized)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| ApiError::Unauthorized)?;
        if Utc::now().timestamp() >= claims.exp {
            return Err(ApiError::Unauthorized);
        }
        Ok(claims.sub)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ApiError> {
        let mut mac = self.mac()?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, ApiError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ApiError::Internal(format!("Invalid signing key: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_yields_user_id() {
        let signer = TokenSigner::generate();
        let user_id = Uuid::new_v4();

        let token = signer.issue(user_id).expect("issue failed");
        assert_eq!(signer.verify(&token).expect("verify failed"), user_id);
    }

    #[test]
    fn token_from_another_process_key_is_rejected() {
        let signer = TokenSigner::generate();
        let other = TokenSigner::generate();

        let token = signer.issue(Uuid::new_v4()).expect("issue failed");
        assert!(matches!(other.verify(&token), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = TokenSigner::generate();
        let token = signer.issue(Uuid::new_v4()).expect("issue failed");

        let (_, sig) = token.split_once('.').expect("token has two parts");
        let forged_claims = Claims {
            sub: Uuid::new_v4(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).expect("encode failed"));
        let forged = format!("{}.{}", forged_payload, sig);

        assert!(matches!(signer.verify(&forged), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let signer = TokenSigner::generate();
        assert!(matches!(signer.verify("no-dot-here"), Err(ApiError::Unauthorized)));
        assert!(matches!(signer.verify("a.b"), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn token_expires_after_ttl() {
        let signer = TokenSigner::generate();
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();

        let expired = signer
            .issue_at(user_id, now - TOKEN_TTL_SECS - 1)
            .expect("issue failed");
        assert!(matches!(signer.verify(&expired), Err(ApiError::Unauthorized)));

        let still_valid = signer
            .issue_at(user_id, now - TOKEN_TTL_SECS + 60)
            .expect("issue failed");
        assert_eq!(signer.verify(&still_valid).expect("verify failed"), user_id);
    }
}
