//! Secure AEAD+HMAC envelope over any [`MemoryStore`] (§4.4).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{MemoryError, MemoryResult};
use crate::store::MemoryStore;

type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Keys configuring the secure envelope. The signing key defaults to the
/// encryption key when not given separately (§4.4).
#[derive(Clone)]
pub struct EnvelopeKeys {
    encryption_key: [u8; 32],
    signing_key: [u8; 32],
}

impl EnvelopeKeys {
    /// Build a key set, defaulting `signing_key` to `encryption_key`.
    #[must_use]
    pub fn new(encryption_key: [u8; 32], signing_key: Option<[u8; 32]>) -> Self {
        Self {
            encryption_key,
            signing_key: signing_key.unwrap_or(encryption_key),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct EnvelopeWire {
    v: u8,
    iv: String,
    tag: String,
    ct: String,
    hmac: String,
}

/// Wraps an inner [`MemoryStore`] so every `get`/`set` passes through the
/// secure envelope; `list` and `ttl` pass through untouched (§4.4).
pub struct SecureEnvelopeStore<S> {
    inner: S,
    keys: EnvelopeKeys,
}

impl<S: MemoryStore> SecureEnvelopeStore<S> {
    /// Wrap `inner` with the given envelope keys.
    pub fn new(inner: S, keys: EnvelopeKeys) -> Self {
        Self { inner, keys }
    }

    fn seal(&self, value: &str) -> MemoryResult<String> {
        let plaintext = serde_json::to_vec(&value)
            .map_err(|e| MemoryError::CorruptEnvelope("<new>".to_string(), e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let key = Key::<Aes256Gcm>::from_slice(&self.keys.encryption_key);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&iv);
        let mut sealed = cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| MemoryError::DecryptionFailed("<new>".to_string()))?;

        let tag = sealed.split_off(sealed.len().saturating_sub(TAG_LEN));
        let ct = sealed;

        let mut mac = HmacSha256::new_from_slice(&self.keys.signing_key)
            .expect("HMAC accepts any key length");
        mac.update(&iv);
        mac.update(&tag);
        mac.update(&ct);
        let hmac = mac.finalize().into_bytes();

        let wire = EnvelopeWire {
            v: 1,
            iv: BASE64.encode(iv),
            tag: BASE64.encode(tag),
            ct: BASE64.encode(ct),
            hmac: BASE64.encode(hmac),
        };
        serde_json::to_string(&wire)
            .map_err(|e| MemoryError::CorruptEnvelope("<new>".to_string(), e.to_string()))
    }

    fn open(&self, key: &str, raw: &str) -> MemoryResult<String> {
        let wire: EnvelopeWire = serde_json::from_str(raw)
            .map_err(|e| MemoryError::CorruptEnvelope(key.to_string(), e.to_string()))?;

        let decode = |field: &str, label: &str| -> MemoryResult<Vec<u8>> {
            BASE64
                .decode(field)
                .map_err(|e| MemoryError::CorruptEnvelope(key.to_string(), format!("{label}: {e}")))
        };

        let iv = decode(&wire.iv, "iv")?;
        let tag = decode(&wire.tag, "tag")?;
        let ct = decode(&wire.ct, "ct")?;
        let stored_hmac = decode(&wire.hmac, "hmac")?;

        let mut mac = HmacSha256::new_from_slice(&self.keys.signing_key)
            .expect("HMAC accepts any key length");
        mac.update(&iv);
        mac.update(&tag);
        mac.update(&ct);
        let computed_hmac = mac.finalize().into_bytes();

        if computed_hmac.as_slice().ct_eq(&stored_hmac).unwrap_u8() != 1 {
            return Err(MemoryError::SignatureMismatch(key.to_string()));
        }

        let key_bytes = Key::<Aes256Gcm>::from_slice(&self.keys.encryption_key);
        let cipher = Aes256Gcm::new(key_bytes);
        let nonce = Nonce::from_slice(&iv);
        let mut combined = ct;
        combined.extend_from_slice(&tag);
        let plaintext = cipher
            .decrypt(nonce, combined.as_ref())
            .map_err(|_| MemoryError::DecryptionFailed(key.to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| MemoryError::CorruptEnvelope(key.to_string(), e.to_string()))
    }
}

#[async_trait]
impl<S: MemoryStore> MemoryStore for SecureEnvelopeStore<S> {
    async fn get(&self, key: &str) -> MemoryResult<Option<String>> {
        match self.inner.get(key).await? {
            Some(raw) => Ok(Some(self.open(key, &raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_secs: Option<u64>) -> MemoryResult<()> {
        let sealed = self.seal(&value)?;
        self.inner.set(key, sealed, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> MemoryResult<()> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: Option<&str>, limit: Option<usize>) -> MemoryResult<Vec<String>> {
        self.inner.list(prefix, limit).await
    }

    async fn ttl(&self, key: &str) -> MemoryResult<Option<i64>> {
        self.inner.ttl(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InProcessStore;

    fn keys() -> EnvelopeKeys {
        EnvelopeKeys::new([7u8; 32], None)
    }

    #[tokio::test]
    async fn set_then_get_roundtrips_through_envelope() {
        let store = SecureEnvelopeStore::new(InProcessStore::new(), keys());
        store.set("a", "secret".to_string(), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("secret".to_string()));
    }

    #[tokio::test]
    async fn tampered_envelope_fails_signature_check() {
        let inner = InProcessStore::new();
        let store = SecureEnvelopeStore::new(inner, keys());
        store.set("a", "secret".to_string(), None).await.unwrap();

        let raw = store.inner.get("a").await.unwrap().unwrap();
        let mut wire: EnvelopeWire = serde_json::from_str(&raw).unwrap();
        wire.ct = BASE64.encode(b"tampered-ciphertext-bytes!!");
        let tampered = serde_json::to_string(&wire).unwrap();
        store.inner.set("a", tampered, None).await.unwrap();

        let err = store.get("a").await.unwrap_err();
        assert!(matches!(err, MemoryError::SignatureMismatch(_)));
    }

    #[tokio::test]
    async fn different_signing_key_rejects_foreign_envelope() {
        let store_a = SecureEnvelopeStore::new(InProcessStore::new(), keys());
        store_a.set("a", "secret".to_string(), None).await.unwrap();
        let raw = store_a.inner.get("a").await.unwrap().unwrap();

        let other_inner = InProcessStore::new();
        other_inner.set("a", raw, None).await.unwrap();
        let store_b = SecureEnvelopeStore::new(other_inner, EnvelopeKeys::new([9u8; 32], None));

        let err = store_b.get("a").await.unwrap_err();
        assert!(matches!(err, MemoryError::SignatureMismatch(_)));
    }

    #[tokio::test]
    async fn separate_signing_key_is_used_when_given() {
        let keys = EnvelopeKeys::new([1u8; 32], Some([2u8; 32]));
        let store = SecureEnvelopeStore::new(InProcessStore::new(), keys);
        store.set("a", "value".to_string(), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn list_and_ttl_pass_through_untouched() {
        let store = SecureEnvelopeStore::new(InProcessStore::new(), keys());
        store.set("profile:1", "x".to_string(), Some(60)).await.unwrap();
        let keys_listed = store.list(Some("profile:"), None).await.unwrap();
        assert_eq!(keys_listed, vec!["profile:1".to_string()]);
        assert!(store.ttl("profile:1").await.unwrap().unwrap() > 0);
    }
}
