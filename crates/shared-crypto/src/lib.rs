//! # Shared Crypto - D-TA Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `bls` | BLS12-381 (min-sig) | Envelope signatures |
//! | `kem` | ML-KEM-768 + AES-256-CBC | Per-recipient key wrapping |
//! | `aes` | AES-CBC, PKCS#7 | Encrypted document bodies |
//! | `ecies` | SECP256K1 ECIES | Plugin secret sealing |
//! | `secp256k1` | SECP256K1 scalar/point addition | Key-share combination |
//! | `hdwallet` | BIP-39 / BIP-32 / BIP-44 | Deterministic share keys |
//! | `hashing` | SHA-256, multihash | CIDs and transaction hashes |
//!
//! ## Security Properties
//!
//! - **Determinism**: every key pair derives from a caller-supplied seed when one is given
//! - **Zeroization**: secret material held by this crate is wiped on drop
//! - **Uniform failure**: padding and MAC failures surface as one error variant

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aes;
pub mod bls;
pub mod ecies;
pub mod errors;
pub mod hashing;
pub mod hdwallet;
pub mod kem;
pub mod secp256k1;

// Re-exports
pub use crate::aes::{aes_cbc_decrypt, aes_cbc_encrypt, pkcs7_pad, pkcs7_unpad, AES_BLOCK_PAD};
pub use bls::{bls_add_g1, bls_add_g2, bls_keys, bls_sign, bls_verify, BlsKeyPair};
pub use ecies::{secp256k1_decrypt, secp256k1_encrypt, EciesCiphertext};
pub use errors::CryptoError;
pub use hashing::{hash160, multihash_cid, random_bytes, sha256};
pub use hdwallet::{
    bip44_address, bitcoin_address, identity_key, identity_public_key, mnemonic_from_entropy,
    redeem_public_key, redeem_secret, seed_from_entropy, seed_from_mnemonic, wif, Bip44Key,
    ExtendedPrivateKey, Network,
};
pub use kem::{decapsulate_decrypt, encapsulate_encrypt, sike_keys, KemKeyPair};
pub use secp256k1::{ec_add_priv, ec_add_pub, public_key_from_private};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
