//! The shared signing account: one ed25519 key, one derived chain address.
//!
//! Exactly one logical owner (the sequencer) signs with it at any instant;
//! this type itself is inert: no I/O, no sequence tracking.

use ed25519_dalek::{Signer as _, SigningKey};
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};
use sha3::{Digest as _, Sha3_256};
use zeroize::Zeroizing;

/// Scheme suffix byte for single-ed25519 authentication keys.
const ED25519_SCHEME: u8 = 0x00;

pub struct SigningAccount {
    key: SigningKey,
    address: String,
    public_key_hex: String,
}

impl std::fmt::Debug for SigningAccount {
    // Never let the key leak through Debug formatting.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SigningAccount {
    /// Load from 32 bytes of hex key material (optionally `0x`-prefixed),
    /// deriving the chain address as sha3-256(pubkey || scheme byte).
    pub fn from_private_key_hex(material: &SecretString) -> eyre::Result<Self> {
        let trimmed = material.expose_secret().trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let raw = Zeroizing::new(hex::decode(stripped).context("decode private key hex")?);
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_e| eyre::eyre!("private key must be exactly 32 bytes"))?;
        let key = SigningKey::from_bytes(&bytes);

        let public = key.verifying_key().to_bytes();
        let mut hasher = Sha3_256::new();
        hasher.update(public);
        hasher.update([ED25519_SCHEME]);
        let address = format!("0x{}", hex::encode(hasher.finalize()));

        Ok(Self {
            key,
            address,
            public_key_hex: format!("0x{}", hex::encode(public)),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    /// Sign an opaque signing message produced by the node boundary.
    /// Returns the hex signature the submission endpoint expects.
    pub fn sign(&self, message: &[u8]) -> String {
        let sig = self.key.sign(message);
        format!("0x{}", hex::encode(sig.to_bytes()))
    }
}
