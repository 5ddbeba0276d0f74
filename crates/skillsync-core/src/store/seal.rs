//! Passphrase sealing for the on-disk token file.
//!
//! Argon2id stretches the passphrase with a per-write random salt into a
//! 256-bit key; ChaCha20-Poly1305 encrypts and authenticates the document.

use std::sync::{Arc, Mutex};

use argon2::Argon2;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::StoreError;

const SEAL_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Encrypted file layout. All binary fields are hex encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedDocument {
    pub version: u32,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

type CachedKey = Option<(Vec<u8>, [u8; KEY_LEN])>;

/// Clones share the key cache.
#[derive(Clone)]
pub struct Sealer {
    passphrase: String,
    // Key for the most recently used salt; a file is re-read with the same
    // salt until the next write, so Argon2 runs once per write
    cached_key: Arc<Mutex<CachedKey>>,
}

impl Sealer {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
            cached_key: Arc::new(Mutex::new(None)),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedDocument, StoreError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let key = self.key_for(&salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| StoreError::Seal("encryption failed".to_string()))?;

        Ok(SealedDocument {
            version: SEAL_VERSION,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Decrypt a sealed document. Fails on a wrong passphrase or any
    /// tampering with salt, nonce or ciphertext.
    pub fn open(&self, doc: &SealedDocument) -> Result<Vec<u8>, StoreError> {
        if doc.version != SEAL_VERSION {
            return Err(StoreError::Seal(format!("unsupported version {}", doc.version)));
        }
        let salt = decode_hex("salt", &doc.salt)?;
        let nonce = decode_hex("nonce", &doc.nonce)?;
        let ciphertext = decode_hex("ciphertext", &doc.ciphertext)?;
        if nonce.len() != NONCE_LEN {
            return Err(StoreError::Seal(format!("nonce must be {} bytes", NONCE_LEN)));
        }

        let key = self.key_for(&salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| StoreError::Seal("wrong passphrase or corrupted file".to_string()))
    }

    fn key_for(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], StoreError> {
        let mut cache = self.cached_key.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((cached_salt, key)) = cache.as_ref() {
            if cached_salt.as_slice() == salt {
                return Ok(*key);
            }
        }
        let key = self.derive_key(salt)?;
        *cache = Some((salt.to_vec(), key));
        Ok(key)
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], StoreError> {
        let mut key = [0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Seal(format!("key derivation failed: {}", e)))?;
        Ok(key)
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, StoreError> {
    hex::decode(value).map_err(|e| StoreError::Seal(format!("invalid {}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_then_open() {
        let sealer = Sealer::new("correct horse");
        let doc = sealer.seal(b"{\"access_token\":\"abc\"}").unwrap();
        assert_eq!(doc.version, SEAL_VERSION);
        assert!(!doc.ciphertext.contains("abc"));
        assert_eq!(sealer.open(&doc).unwrap(), b"{\"access_token\":\"abc\"}");
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let doc = Sealer::new("correct horse").seal(b"payload").unwrap();
        let err = Sealer::new("battery staple").open(&doc).unwrap_err();
        assert!(matches!(err, StoreError::Seal(_)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let sealer = Sealer::new("pw");
        let mut doc = sealer.seal(b"payload").unwrap();
        let mut bytes = hex::decode(&doc.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        doc.ciphertext = hex::encode(bytes);
        assert!(sealer.open(&doc).is_err());
    }

    fn cached_salt(sealer: &Sealer) -> Option<Vec<u8>> {
        sealer.cached_key.lock().unwrap().as_ref().map(|(salt, _)| salt.clone())
    }

    #[test]
    fn test_key_is_cached_per_salt() {
        let sealer = Sealer::new("pw");
        let doc = sealer.seal(b"payload").unwrap();
        let salt = hex::decode(&doc.salt).unwrap();
        assert_eq!(cached_salt(&sealer), Some(salt.clone()));

        // A clone opening the same file reuses the key
        let reader = sealer.clone();
        assert_eq!(reader.open(&doc).unwrap(), b"payload");
        assert_eq!(cached_salt(&reader), Some(salt));

        // A new write moves the cache to the new salt
        let next = sealer.seal(b"payload").unwrap();
        assert_eq!(cached_salt(&sealer), Some(hex::decode(&next.salt).unwrap()));
        assert_eq!(sealer.open(&doc).unwrap(), b"payload");
    }

    #[test]
    fn test_each_seal_uses_fresh_salt_and_nonce() {
        let sealer = Sealer::new("pw");
        let a = sealer.seal(b"same").unwrap();
        let b = sealer.seal(b"same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
    }
}
