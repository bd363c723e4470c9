use crate::error::{GraphError, Result};
use crate::traits::EncryptionHook;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};
use secrecy::{ExposeSecret, SecretString};

/// Reference [`EncryptionHook`] implementation used by tests and demos.
/// Encryption at rest itself is out of scope for this crate; this exists so
/// the snapshot's optional encryption path has a concrete collaborator to
/// exercise, the same role the teacher codebase's `config::crypto` module
/// plays for encrypted secrets files.
pub struct ChaChaPolyHook {
    cipher: ChaCha20Poly1305,
}

impl ChaChaPolyHook {
    /// `key` must decode (base64-standard) to exactly 32 bytes.
    pub fn new(key: &SecretString) -> Result<Self> {
        let raw = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            key.expose_secret(),
        )
        .map_err(|e| GraphError::InvalidConfig(format!("invalid encryption key: {e}")))?;
        if raw.len() != 32 {
            return Err(GraphError::InvalidConfig(
                "encryption key must decode to 32 bytes".into(),
            ));
        }
        let key = Key::from_slice(&raw);
        Ok(Self {
            cipher: ChaCha20Poly1305::new(key),
        })
    }

    pub fn generate_key() -> String {
        use rand::TryRngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .expect("OsRng available");
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
    }
}

impl EncryptionHook for ChaChaPolyHook {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let mut ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| GraphError::Engine(format!("encryption failed: {e}")))?;
        let mut out = nonce.to_vec();
        out.append(&mut ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < 12 {
            return Err(GraphError::DecryptFailed("ciphertext too short".into()));
        }
        let (nonce_bytes, body) = ciphertext.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, body)
            .map_err(|e| GraphError::DecryptFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let key = SecretString::new(ChaChaPolyHook::generate_key());
        let hook = ChaChaPolyHook::new(&key).unwrap();
        let ciphertext = hook.encrypt(b"hello graph").unwrap();
        assert_ne!(ciphertext, b"hello graph");
        let plaintext = hook.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, b"hello graph");
    }

    #[test]
    fn rejects_short_ciphertext() {
        let key = SecretString::new(ChaChaPolyHook::generate_key());
        let hook = ChaChaPolyHook::new(&key).unwrap();
        assert!(hook.decrypt(b"short").is_err());
    }
}
