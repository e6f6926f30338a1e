//! # Hashing
//!
//! SHA-256 helpers and the CIDv0 content identifier.
//!
//! A CIDv0 is the base58btc encoding of the SHA-256 multihash
//! `0x12 0x20 || SHA-256(bytes)`, which always renders as a 46-character
//! string starting with `Qm`.

use rand::RngCore;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Multihash function code for SHA2-256.
pub const MULTIHASH_SHA2_256: u8 = 0x12;

/// Multihash digest length for SHA2-256.
pub const MULTIHASH_SHA2_256_LEN: u8 = 0x20;

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// RIPEMD-160 of SHA-256, as used by P2PKH addresses.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Base58 SHA-256 multihash of `data`.
pub fn multihash_cid(data: &[u8]) -> String {
    let mut multihash = Vec::with_capacity(34);
    multihash.push(MULTIHASH_SHA2_256);
    multihash.push(MULTIHASH_SHA2_256_LEN);
    multihash.extend_from_slice(&sha256(data));
    bs58::encode(multihash).into_string()
}

/// `n` bytes from the thread-local CSPRNG.
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_cid_shape() {
        let cid = multihash_cid(b"hello world");
        assert_eq!(cid.len(), 46);
        assert!(cid.starts_with("Qm"));
        assert_eq!(cid, multihash_cid(b"hello world"));
        assert_ne!(cid, multihash_cid(b"hello world!"));
    }

    #[test]
    fn test_cid_decodes_to_multihash() {
        let cid = multihash_cid(b"payload");
        let raw = bs58::decode(&cid).into_vec().unwrap();
        assert_eq!(raw[0], MULTIHASH_SHA2_256);
        assert_eq!(raw[1], MULTIHASH_SHA2_256_LEN);
        assert_eq!(&raw[2..], &sha256(b"payload"));
    }

    #[test]
    fn test_random_bytes_len() {
        assert_eq!(random_bytes(48).len(), 48);
        assert_ne!(random_bytes(32), random_bytes(32));
    }
}
