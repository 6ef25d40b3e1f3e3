use sha2::{Digest, Sha256};

pub const SIGNATURE_HEADER: &str = "x-internal-signature";

/// hex(sha256(secret ":" payload))
pub fn sign_payload(payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_internal_signature(
    payload: &str,
    signature_hex: &str,
    secret: &str,
) -> Result<(), String> {
    if sign_payload(payload, secret).eq_ignore_ascii_case(signature_hex.trim()) {
        Ok(())
    } else {
        Err("signature verification failed".to_string())
    }
}
