//! Signed confirmation tokens for email links.
//!
//! A token binds `{approval_id, actor_id, issued_at}` under an
//! HMAC-SHA256 signature: `base64url(payload) . base64url(mac)`. The
//! signing secret is 32 random bytes persisted at `.kns/secret.key`,
//! created on first use. Verification checks the signature, the
//! id/actor binding from the URL, and the token age; every failure mode
//! collapses into a single opaque error so the response does not leak
//! which check failed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use kns_core::{io, paths};
use rand::RngCore;
use sha2::Sha256;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("invalid or expired confirmation link")]
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub approval_id: String,
    pub actor_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

/// Load the signing secret, generating and persisting one if absent.
pub fn load_or_create_secret(root: &Path) -> anyhow::Result<Vec<u8>> {
    let path = paths::secret_path(root);
    if path.exists() {
        let encoded = std::fs::read_to_string(&path)?;
        return Ok(URL_SAFE_NO_PAD.decode(encoded.trim())?);
    }
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    io::atomic_write(&path, URL_SAFE_NO_PAD.encode(&secret).as_bytes())?;
    Ok(secret)
}

/// Sign a confirmation token for one approval and one actor.
pub fn sign(secret: &[u8], approval_id: &str, actor_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let payload = format!("{approval_id}:{actor_id}:{}", issued_at.timestamp());
    let mac = mac_for(secret, payload.as_bytes());
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(payload.as_bytes()),
        URL_SAFE_NO_PAD.encode(mac)
    )
}

/// Verify a token against the approval id and actor id from the URL.
///
/// `max_age` bounds how long after issuance the link stays valid. On any
/// failure nothing is revealed beyond [`TokenError::Invalid`].
pub fn verify(
    secret: &[u8],
    token: &str,
    approval_id: &str,
    actor_id: Uuid,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<Claims, TokenError> {
    let (payload_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Invalid)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| TokenError::Invalid)?;
    let mac = URL_SAFE_NO_PAD
        .decode(mac_b64)
        .map_err(|_| TokenError::Invalid)?;

    // Constant-time signature check before anything else.
    let mut verifier = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Invalid)?;
    verifier.update(&payload);
    verifier.verify_slice(&mac).map_err(|_| TokenError::Invalid)?;

    let payload = String::from_utf8(payload).map_err(|_| TokenError::Invalid)?;
    let mut parts = payload.splitn(3, ':');
    let token_approval = parts.next().ok_or(TokenError::Invalid)?;
    let token_actor = parts.next().ok_or(TokenError::Invalid)?;
    let token_ts = parts.next().ok_or(TokenError::Invalid)?;

    if token_approval != approval_id {
        return Err(TokenError::Invalid);
    }
    let token_actor: Uuid = token_actor.parse().map_err(|_| TokenError::Invalid)?;
    if token_actor != actor_id {
        return Err(TokenError::Invalid);
    }

    let ts: i64 = token_ts.parse().map_err(|_| TokenError::Invalid)?;
    let issued_at = Utc
        .timestamp_opt(ts, 0)
        .single()
        .ok_or(TokenError::Invalid)?;
    if now > issued_at + max_age {
        return Err(TokenError::Invalid);
    }

    Ok(Claims {
        approval_id: approval_id.to_string(),
        actor_id,
        issued_at,
    })
}

fn mac_for(secret: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
