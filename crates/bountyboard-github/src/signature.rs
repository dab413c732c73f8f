//! Webhook delivery signatures (`X-Hub-Signature-256`).
//!
//! GitHub signs each delivery body with HMAC-SHA256 under the webhook
//! secret and sends `sha256=<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::GithubError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
const PREFIX: &str = "sha256=";

fn mac(secret: &[u8], payload: &[u8]) -> Result<HmacSha256, GithubError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| GithubError::Config(format!("unusable webhook secret: {e}")))?;
    mac.update(payload);
    Ok(mac)
}

/// Header value GitHub would send for `payload`.
pub fn sign(secret: &[u8], payload: &[u8]) -> Result<String, GithubError> {
    let digest = mac(secret, payload)?.finalize().into_bytes();
    Ok(format!("{PREFIX}{}", hex::encode(digest)))
}

/// Check a delivery against its signature header. The digest comparison
/// runs in constant time.
pub fn verify_signature(secret: &[u8], payload: &[u8], header: &str) -> Result<(), GithubError> {
    let hex_digest = header
        .trim()
        .strip_prefix(PREFIX)
        .ok_or_else(|| GithubError::SignatureFormat(format!("expected `{PREFIX}` prefix")))?;
    let expected = hex::decode(hex_digest)
        .map_err(|e| GithubError::SignatureFormat(format!("digest is not hex: {e}")))?;
    mac(secret, payload)?
        .verify_slice(&expected)
        .map_err(|_| GithubError::SignatureMismatch)
}
