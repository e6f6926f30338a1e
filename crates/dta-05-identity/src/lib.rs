//! # Identity (dta-05)
//!
//! A node's identity is a 48-byte seed. Three key pairs derive from it:
//!
//! | Key | Derivation | Used for |
//! |-----|-----------|----------|
//! | BLS | IETF keygen over the seed | signing envelopes |
//! | KEM | HKDF over the seed | unwrapping envelope keys |
//! | SECP256K1 | BIP-44 `m/44'/0'/0'/0/0`, mnemonic from the seed's first 16 bytes | beneficiary share |
//!
//! The public halves are published as a self-signed IDDocument; its CID is the
//! node ID. The seed lives in the key file and never leaves the node.

pub mod errors;
pub mod identity;
pub mod keyring;
pub mod keystore;

pub use errors::IdentityError;
pub use identity::{build_iddoc, check_identity, create_identity, retrieve_iddoc};
pub use keyring::{Keyring, SEED_LEN};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore, SEED_KEY};
