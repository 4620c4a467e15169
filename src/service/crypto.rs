use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{digest::InvalidLength, Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use sha3::{Digest, Sha3_256};

pub const TOKEN_BYTES: usize = 32;

/// Lowercase hex SHA3-256 of `data`.
pub fn get_sha3_256_hash(data: &str) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A fresh URL-safe bearer token.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())?;
    mac.update(message);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// Constant-time check of a hex HMAC-SHA256 signature.
pub fn verify_hmac_sha256(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let Some(signature) = decode_hex(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&signature).is_ok()
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
