//! Session-at-rest encryption.
//!
//! AES-256-GCM via `ring`, with the key derived from a passphrase by
//! PBKDF2-HMAC-SHA256. The key is wiped from memory on drop.

use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use zeroize::Zeroizing;

use crate::types::errors::CryptoError;
use crate::types::sealed::EncryptedData;

const PBKDF2_ITERATIONS: u32 = 100_000;
const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const SALT_LENGTH: usize = 16;

/// Generates a random PBKDF2 salt.
pub fn generate_salt() -> Result<Vec<u8>, CryptoError> {
    let mut salt = vec![0u8; SALT_LENGTH];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| CryptoError::KeyDerivation("Failed to generate salt".to_string()))?;
    Ok(salt)
}

/// Nonce sequence that yields exactly one nonce.
struct OneShotNonce(Option<[u8; NONCE_LENGTH]>);

impl NonceSequence for OneShotNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Seals and opens session blobs with one derived key.
pub struct SessionCipher {
    key: Zeroizing<Vec<u8>>,
    rng: SystemRandom,
}

impl SessionCipher {
    /// Derives the cipher key from `passphrase` and `salt`.
    pub fn derive(passphrase: &str, salt: &[u8]) -> Result<Self, CryptoError> {
        let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
            .ok_or_else(|| CryptoError::KeyDerivation("Invalid iteration count".to_string()))?;
        if passphrase.is_empty() {
            return Err(CryptoError::KeyDerivation("Passphrase must not be empty".to_string()));
        }
        if salt.is_empty() {
            return Err(CryptoError::KeyDerivation("Salt must not be empty".to_string()));
        }

        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            passphrase.as_bytes(),
            &mut key,
        );
        Ok(Self { key, rng: SystemRandom::new() })
    }

    /// Builds a cipher from raw key bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKey(format!(
                "Key must be {} bytes, got {}",
                KEY_LENGTH,
                key.len()
            )));
        }
        Ok(Self { key: Zeroizing::new(key.to_vec()), rng: SystemRandom::new() })
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        let mut nonce = [0u8; NONCE_LENGTH];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| CryptoError::Encryption("Failed to generate nonce".to_string()))?;

        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| CryptoError::InvalidKey("Failed to create sealing key".to_string()))?;
        let mut sealing_key = aead::SealingKey::new(unbound, OneShotNonce(Some(nonce)));

        let mut in_out = plaintext.to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Encryption("Seal operation failed".to_string()))?;

        // ring appends the tag; the vault stores it in its own column
        let auth_tag = in_out.split_off(in_out.len() - TAG_LENGTH);
        Ok(EncryptedData { ciphertext: in_out, iv: nonce.to_vec(), auth_tag })
    }

    pub fn open(&self, sealed: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        if sealed.iv.len() != NONCE_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "IV must be {} bytes, got {}",
                NONCE_LENGTH,
                sealed.iv.len()
            )));
        }
        if sealed.auth_tag.len() != TAG_LENGTH {
            return Err(CryptoError::Decryption(format!(
                "Auth tag must be {} bytes, got {}",
                TAG_LENGTH,
                sealed.auth_tag.len()
            )));
        }

        let mut nonce = [0u8; NONCE_LENGTH];
        nonce.copy_from_slice(&sealed.iv);

        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| CryptoError::InvalidKey("Failed to create opening key".to_string()))?;
        let mut opening_key = aead::OpeningKey::new(unbound, OneShotNonce(Some(nonce)));

        let mut in_out = Vec::with_capacity(sealed.ciphertext.len() + TAG_LENGTH);
        in_out.extend_from_slice(&sealed.ciphertext);
        in_out.extend_from_slice(&sealed.auth_tag);

        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Decryption("Invalid key or corrupted data".to_string()))?;
        Ok(plaintext.to_vec())
    }
}
