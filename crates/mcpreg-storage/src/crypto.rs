//! Token encryption.
//!
//! AES-256-GCM over each provider token. The ciphertext is bound to the
//! vault key it is stored under (passed as associated data), so a row
//! copied to another provider's key fails to decrypt.

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Size of the encryption key (32 bytes = 256 bits).
pub const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 12;

pub struct TokenCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl TokenCipher {
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound_key = UnboundKey::new(&AES_256_GCM, master_key)
            .map_err(|_| anyhow::anyhow!("Failed to create encryption key"))?;

        Ok(Self {
            key: LessSafeKey::new(unbound_key),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext` for storage under `context`.
    ///
    /// Returns hex(nonce + ciphertext + tag).
    pub fn seal(&self, context: &str, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut in_out = Zeroizing::new(plaintext.as_bytes().to_vec());
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(context.as_bytes()),
                &mut *in_out,
            )
            .map_err(|_| anyhow::anyhow!("Encryption failed"))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);
        Ok(hex::encode(sealed))
    }

    /// Decrypt a value produced by `seal` with the same `context`.
    pub fn open(&self, context: &str, sealed_hex: &str) -> Result<Zeroizing<String>> {
        let sealed = hex::decode(sealed_hex).context("Invalid hex encoding")?;
        if sealed.len() < NONCE_SIZE + AES_256_GCM.tag_len() {
            anyhow::bail!("Ciphertext too short");
        }

        let (nonce_bytes, encrypted) = sealed.split_at(NONCE_SIZE);
        let nonce_array: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;

        let mut in_out = Zeroizing::new(encrypted.to_vec());
        let plaintext = self
            .key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce_array),
                Aad::from(context.as_bytes()),
                &mut *in_out,
            )
            .map_err(|_| anyhow::anyhow!("Decryption failed - wrong key or corrupted data"))?;

        let text = std::str::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

/// Generate a random master key.
pub fn generate_master_key() -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    SystemRandom::new()
        .fill(&mut *key)
        .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;
    Ok(key)
}
