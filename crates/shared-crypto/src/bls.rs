//! BLS12-381 Signature Implementation
//!
//! Provides BLS signature primitives for:
//! - Deterministic key generation from an identity seed
//! - Sign/verify of serialized envelopes
//! - Point addition on G1 (signatures) and G2 (public keys)
//!
//! Uses blst's `min_sig` variant: signatures live on G1 (48 bytes
//! compressed), public keys on G2 (192 bytes serialized).

use blst::min_sig::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Domain separation tag (basic scheme, G1 signatures)
const DST: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";

/// Serialized (uncompressed) G2 public key length
pub const BLS_PUBLIC_KEY_LEN: usize = 192;

/// Secret scalar length
pub const BLS_SECRET_KEY_LEN: usize = 32;

/// Compressed G1 signature length
pub const BLS_SIGNATURE_LEN: usize = 48;

/// Minimum seed length accepted by the IETF key derivation
const MIN_IKM_LEN: usize = 32;

/// BLS key pair for signing operations
pub struct BlsKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl BlsKeyPair {
    /// Derive a key pair from a seed of at least 32 bytes
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() < MIN_IKM_LEN {
            return Err(CryptoError::InvalidLength {
                what: "BLS seed",
                expected: MIN_IKM_LEN,
                actual: seed.len(),
            });
        }
        let secret = SecretKey::key_gen(seed, &[])
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("{:?}", e)))?;
        let public = secret.sk_to_pk();
        Ok(Self { secret, public })
    }

    /// Generate a new random key pair
    pub fn generate() -> Result<Self, CryptoError> {
        let mut ikm = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut ikm[..]);
        Self::from_seed(&ikm[..])
    }

    /// Rebuild from existing secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = secret.sk_to_pk();
        Ok(Self { secret, public })
    }

    /// Sign a message, returning the compressed G1 signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.secret.sign(message, DST, &[]).to_bytes().to_vec()
    }

    /// Serialized G2 public key
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.serialize().to_vec()
    }

    /// Secret key bytes (be careful with this!)
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }
}

/// `(pk, sk)` from a seed, from an existing secret, or at random.
///
/// The seed takes precedence when both are supplied.
pub fn bls_keys(
    seed: Option<&[u8]>,
    existing_sk: Option<&[u8]>,
) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>), CryptoError> {
    let pair = match (seed, existing_sk) {
        (Some(seed), _) => BlsKeyPair::from_seed(seed)?,
        (None, Some(sk)) => BlsKeyPair::from_secret_bytes(sk)?,
        (None, None) => BlsKeyPair::generate()?,
    };
    Ok((pair.public_key_bytes(), pair.secret_bytes()))
}

/// Sign `message` with a raw secret key.
pub fn bls_sign(message: &[u8], sk: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Ok(BlsKeyPair::from_secret_bytes(sk)?.sign(message))
}

/// Verify `signature` over `message` under `pk`.
///
/// Malformed keys and signatures report the same error as a failed
/// pairing check.
pub fn bls_verify(message: &[u8], pk: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let Ok(pk) = PublicKey::deserialize(pk) else {
        return Err(CryptoError::VerificationFailed);
    };
    let Ok(sig) = Signature::from_bytes(signature) else {
        return Err(CryptoError::VerificationFailed);
    };

    match sig.verify(true, message, DST, &[], &pk, true) {
        BLST_ERROR::BLST_SUCCESS => Ok(()),
        _ => Err(CryptoError::VerificationFailed),
    }
}

/// Add two G1 points (signatures).
pub fn bls_add_g1(a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let a = Signature::from_bytes(a).map_err(|e| CryptoError::ParseFailure(format!("{:?}", e)))?;
    let b = Signature::from_bytes(b).map_err(|e| CryptoError::ParseFailure(format!("{:?}", e)))?;
    AggregateSignature::aggregate(&[&a, &b], true)
        .map(|agg| agg.to_signature().to_bytes().to_vec())
        .map_err(|e| CryptoError::LibraryFailure(format!("{:?}", e)))
}

/// Add two G2 points (public keys).
pub fn bls_add_g2(a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let a = PublicKey::deserialize(a).map_err(|e| CryptoError::ParseFailure(format!("{:?}", e)))?;
    let b = PublicKey::deserialize(b).map_err(|e| CryptoError::ParseFailure(format!("{:?}", e)))?;
    AggregatePublicKey::aggregate(&[&a, &b], true)
        .map(|agg| agg.to_public_key().serialize().to_vec())
        .map_err(|e| CryptoError::LibraryFailure(format!("{:?}", e)))
}
