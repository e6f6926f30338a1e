//! # Keyring
//!
//! The key triple derived from a node seed. Identical seeds always produce
//! identical keys.

use std::fmt;

use dta_04_envelope::{IdDocument, ReaderKeys};
use shared_crypto::{bls_keys, identity_key, random_bytes, sike_keys, CryptoError};
use zeroize::Zeroizing;

use crate::errors::IdentityError;

/// Length of a node seed in bytes.
pub const SEED_LEN: usize = 48;

pub struct Keyring {
    seed: Zeroizing<Vec<u8>>,
    bls_public_key: Vec<u8>,
    bls_secret_key: Zeroizing<Vec<u8>>,
    sike_public_key: Vec<u8>,
    sike_secret_key: Zeroizing<Vec<u8>>,
    ec_public_key: Vec<u8>,
    ec_secret_key: Zeroizing<String>,
}

impl Keyring {
    /// Derive every key from a [`SEED_LEN`]-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, IdentityError> {
        if seed.len() != SEED_LEN {
            return Err(CryptoError::InvalidLength {
                what: "node seed",
                expected: SEED_LEN,
                actual: seed.len(),
            }
            .into());
        }
        let (bls_public_key, bls_secret_key) = bls_keys(Some(seed), None)?;
        let (sike_public_key, sike_secret_key) = sike_keys(seed)?;
        let ec = identity_key(seed)?;
        let ec_public_key = hex::decode(&ec.public_key).map_err(CryptoError::from)?;

        Ok(Self {
            seed: Zeroizing::new(seed.to_vec()),
            bls_public_key,
            bls_secret_key,
            sike_public_key,
            sike_secret_key,
            ec_public_key,
            ec_secret_key: Zeroizing::new(ec.private_key),
        })
    }

    /// Fresh random identity.
    pub fn generate() -> Result<Self, IdentityError> {
        let seed = Zeroizing::new(random_bytes(SEED_LEN));
        Self::from_seed(&seed[..])
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    pub fn bls_public_key(&self) -> &[u8] {
        &self.bls_public_key
    }

    pub fn bls_secret_key(&self) -> &[u8] {
        &self.bls_secret_key
    }

    pub fn sike_public_key(&self) -> &[u8] {
        &self.sike_public_key
    }

    pub fn sike_secret_key(&self) -> &[u8] {
        &self.sike_secret_key
    }

    /// Compressed SECP256K1 identity key, 33 bytes.
    pub fn ec_public_key(&self) -> &[u8] {
        &self.ec_public_key
    }

    /// Hex SECP256K1 identity secret; the principal share when this node is
    /// a known-at-start beneficiary.
    pub fn ec_secret_key(&self) -> &str {
        &self.ec_secret_key
    }

    /// The public IDDocument for this keyring.
    pub fn iddoc(&self, name: &str, timestamp: i64) -> IdDocument {
        IdDocument {
            authentication_reference: name.to_string(),
            beneficiary_ec_public_key: self.ec_public_key.clone(),
            sike_public_key: self.sike_public_key.clone(),
            bls_public_key: self.bls_public_key.clone(),
            timestamp,
        }
    }

    /// Envelope reader keys for this node under `cid`.
    pub fn reader<'a>(&'a self, cid: &'a str) -> ReaderKeys<'a> {
        ReaderKeys {
            cid,
            sike_sk: &self.sike_secret_key,
        }
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("bls_public_key", &hex::encode(&self.bls_public_key))
            .field("ec_public_key", &hex::encode(&self.ec_public_key))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Vec<u8> {
        (1..=48).collect()
    }

    #[test]
    fn test_same_seed_same_keys() {
        let a = Keyring::from_seed(&seed()).unwrap();
        let b = Keyring::from_seed(&seed()).unwrap();
        assert_eq!(a.bls_public_key(), b.bls_public_key());
        assert_eq!(a.sike_public_key(), b.sike_public_key());
        assert_eq!(a.ec_public_key(), b.ec_public_key());
        assert_eq!(a.iddoc("n", 1_700_000_000), b.iddoc("n", 1_700_000_000));
    }

    #[test]
    fn test_key_shapes() {
        let k = Keyring::from_seed(&seed()).unwrap();
        assert_eq!(k.ec_public_key().len(), 33);
        assert_eq!(k.bls_public_key().len(), 192);
        assert_eq!(k.sike_public_key().len(), shared_crypto::kem::KEM_PUBLIC_KEY_LEN);
        assert_eq!(k.sike_secret_key().len(), shared_crypto::kem::KEM_SECRET_KEY_LEN);
        assert_eq!(k.ec_secret_key().len(), 64);
        assert_eq!(
            shared_crypto::public_key_from_private(k.ec_secret_key()).unwrap().1,
            hex::encode(k.ec_public_key())
        );
    }

    #[test]
    fn test_bls_signs_zero_padded_message() {
        let k = Keyring::from_seed(&seed()).unwrap();
        let mut message = b"Hello Bob! This is a message from Alice".to_vec();
        message.resize(64, 0);
        let sig = shared_crypto::bls_sign(&message, k.bls_secret_key()).unwrap();
        shared_crypto::bls_verify(&message, k.bls_public_key(), &sig).unwrap();
    }

    #[test]
    fn test_seed_length_enforced() {
        assert!(Keyring::from_seed(&[7u8; 32]).is_err());
        assert_ne!(
            Keyring::generate().unwrap().bls_public_key(),
            Keyring::generate().unwrap().bls_public_key()
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let k = Keyring::from_seed(&seed()).unwrap();
        let shown = format!("{:?}", k);
        assert!(!shown.contains(k.ec_secret_key()));
    }
}
