use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::AuthError;

/// Offset and length used when auth1 omits `X-Radiko-KeyOffset`/`X-Radiko-KeyLength`.
pub const DEFAULT_KEY_OFFSET: usize = 0;
pub const DEFAULT_KEY_LENGTH: usize = 16;

/// Base64 of `length` bytes of `secret` starting at `offset`.
pub fn derive_partial_key(secret: &str, offset: usize, length: usize) -> Result<String, AuthError> {
    let bytes = secret.as_bytes();
    let slice = offset
        .checked_add(length)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(AuthError::PartialKeyOutOfRange {
            offset,
            length,
            secret_len: bytes.len(),
        })?;
    Ok(STANDARD.encode(slice))
}
