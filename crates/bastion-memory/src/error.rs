/// Errors raised by a [`crate::MemoryStore`] (§4.4).
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The secure envelope's HMAC did not match on read.
    #[error("signature mismatch for key {0:?}")]
    SignatureMismatch(String),
    /// The stored envelope could not be decoded (malformed base64/JSON).
    #[error("corrupt envelope for key {0:?}: {1}")]
    CorruptEnvelope(String, String),
    /// AEAD decryption failed after the HMAC check passed.
    #[error("decryption failed for key {0:?}")]
    DecryptionFailed(String),
    /// The backend itself failed (only relevant to out-of-process backends).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience alias for [`MemoryError`]-returning results.
pub type MemoryResult<T> = Result<T, MemoryError>;
