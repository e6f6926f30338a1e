//! # Key Encapsulation
//!
//! Wraps short symmetric keys for a single recipient.
//!
//! ## Construction
//!
//! 1. The sender encapsulates against the recipient's ML-KEM-768 public key,
//!    obtaining a 32-byte shared key and a 1088-byte ciphertext.
//! 2. HKDF-SHA256 over the shared key, salted with `ciphertext || recipient_pk`,
//!    yields a 32-byte wrapping key.
//! 3. The payload is AES-256-CBC encrypted under that key and the
//!    caller's IV, without padding, so the ciphertext has the plaintext's length.
//!
//! The encapsulated key is the ML-KEM ciphertext. Key pairs are derived
//! deterministically from the identity seed: HKDF expands the seed into the
//! `d || z` inputs of ML-KEM key generation.

use hkdf::Hkdf;
use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Ciphertext, Encoded, EncodedSizeUser, KemCore, MlKem768, B32};
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::aes::{aes_cbc_decrypt, aes_cbc_encrypt};
use crate::CryptoError;

/// KEM public (encapsulation) key length.
pub const KEM_PUBLIC_KEY_LEN: usize = 1184;

/// KEM secret (decapsulation) key length.
pub const KEM_SECRET_KEY_LEN: usize = 2400;

/// Encapsulated key length.
pub const KEM_ENCAPSULATED_KEY_LEN: usize = 1088;

const KEYGEN_INFO: &[u8] = b"milagro-dta/kem/ml-kem-768/keygen";
const WRAP_INFO: &[u8] = b"milagro-dta/kem/ml-kem-768/wrap";

type DecapsulationKey = <MlKem768 as KemCore>::DecapsulationKey;
type EncapsulationKey = <MlKem768 as KemCore>::EncapsulationKey;

/// Static KEM key pair.
pub struct KemKeyPair {
    secret: DecapsulationKey,
    public: EncapsulationKey,
}

impl KemKeyPair {
    /// Derive from an identity seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let mut okm = Zeroizing::new([0u8; 64]);
        Hkdf::<Sha256>::new(None, seed)
            .expand(KEYGEN_INFO, &mut okm[..])
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let d = B32::try_from(&okm[..32])
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let z = B32::try_from(&okm[32..])
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        let (secret, public) = MlKem768::generate_deterministic(&d, &z);
        Ok(Self { secret, public })
    }

    /// Public key bytes.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.as_bytes().to_vec()
    }

    /// Secret key bytes.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.as_bytes().to_vec())
    }
}

/// `(pk, sk)` derived from `seed`.
pub fn sike_keys(seed: &[u8]) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), CryptoError> {
    let pair = KemKeyPair::from_seed(seed)?;
    Ok((pair.public_key_bytes(), pair.secret_bytes()))
}

fn check_len(bytes: &[u8], expected: usize, what: &'static str) -> Result<(), CryptoError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(CryptoError::InvalidLength {
            what,
            expected,
            actual: bytes.len(),
        })
    }
}

fn encapsulation_key(pk: &[u8]) -> Result<EncapsulationKey, CryptoError> {
    check_len(pk, KEM_PUBLIC_KEY_LEN, "KEM public key")?;
    let encoded = Encoded::<EncapsulationKey>::try_from(pk)
        .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?;
    Ok(EncapsulationKey::from_bytes(&encoded))
}

fn decapsulation_key(sk: &[u8]) -> Result<DecapsulationKey, CryptoError> {
    check_len(sk, KEM_SECRET_KEY_LEN, "KEM secret key")?;
    let encoded = Encoded::<DecapsulationKey>::try_from(sk)
        .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?;
    Ok(DecapsulationKey::from_bytes(&encoded))
}

fn wrapping_key(
    shared: &[u8],
    encapsulated: &[u8],
    recipient: &[u8],
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let salt = [encapsulated, recipient].concat();
    let mut key = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha256>::new(Some(&salt[..]), shared)
        .expand(WRAP_INFO, &mut key[..])
        .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` to `pk`, returning `(ciphertext, encapsulated_key)`.
///
/// `plaintext` must be a multiple of 16 bytes.
pub fn encapsulate_encrypt(
    plaintext: &[u8],
    iv: &[u8],
    pk: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let recipient = encapsulation_key(pk)?;
    let (encapsulated, shared) = recipient
        .encapsulate(&mut OsRng)
        .map_err(|_| CryptoError::LibraryFailure("ML-KEM encapsulation".to_string()))?;
    let shared = Zeroizing::new(shared.to_vec());

    let key = wrapping_key(&shared[..], &encapsulated[..], pk)?;
    let ciphertext = aes_cbc_encrypt(&key[..], iv, plaintext)?;
    Ok((ciphertext, encapsulated.to_vec()))
}

/// Reverse [`encapsulate_encrypt`] with the recipient's secret key.
///
/// A foreign secret key does not fail here; ML-KEM's implicit rejection
/// yields an unrelated wrapping key and therefore garbage.
pub fn decapsulate_decrypt(
    ciphertext: &[u8],
    iv: &[u8],
    sk: &[u8],
    encapsulated_key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let secret = decapsulation_key(sk)?;
    check_len(encapsulated_key, KEM_ENCAPSULATED_KEY_LEN, "KEM encapsulated key")?;
    let encapsulated = Ciphertext::<MlKem768>::try_from(encapsulated_key)
        .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?;

    let shared = secret
        .decapsulate(&encapsulated)
        .map_err(|_| CryptoError::LibraryFailure("ML-KEM decapsulation".to_string()))?;
    let shared = Zeroizing::new(shared.to_vec());
    let recipient = secret.encapsulation_key().as_bytes();
    let key = wrapping_key(&shared[..], encapsulated_key, &recipient[..])?;
    aes_cbc_decrypt(&key[..], iv, ciphertext)
}
