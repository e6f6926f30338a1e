//! # HD Wallet
//!
//! BIP-39 mnemonics, BIP-32 private derivation and BIP-44 P2PKH addresses
//! over SECP256K1. Child derivation and extended-key serialization come from
//! the `bip32` crate; addresses and WIF are encoded here.
//!
//! Paths follow `m / 44' / coin' / account' / change / index`, with coin 0
//! for Bitcoin mainnet and 1 for testnet. Mnemonic seeds never use a
//! passphrase.

use bip32::{ChildNumber, DerivationPath, Prefix, XPrv};
use bip39::Mnemonic;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use zeroize::Zeroizing;

use crate::hashing::hash160;
use crate::CryptoError;

const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

/// Bitcoin network selecting version bytes and the BIP-44 coin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Bitcoin mainnet, coin type 0
    Mainnet,
    /// Bitcoin testnet3, coin type 1
    Testnet,
}

impl Network {
    /// Network for a BIP-44 coin type.
    pub fn from_coin_type(coin: u32) -> Result<Self, CryptoError> {
        match coin {
            0 => Ok(Network::Mainnet),
            1 => Ok(Network::Testnet),
            other => Err(CryptoError::ParseFailure(format!("unsupported coin {}", other))),
        }
    }

    /// BIP-44 coin type.
    pub fn coin_type(self) -> u32 {
        match self {
            Network::Mainnet => 0,
            Network::Testnet => 1,
        }
    }

    fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn wif_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    fn xprv_prefix(self) -> Prefix {
        match self {
            Network::Mainnet => Prefix::XPRV,
            Network::Testnet => Prefix::TPRV,
        }
    }
}

/// BIP-32 extended private key bound to a network.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    network: Network,
    key: XPrv,
}

fn derivation_failed(e: bip32::Error) -> CryptoError {
    CryptoError::KeyGenerationFailed(format!("BIP-32: {}", e))
}

impl ExtendedPrivateKey {
    /// Master key from a 16 to 64 byte seed.
    pub fn master(seed: &[u8], network: Network) -> Result<Self, CryptoError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(CryptoError::InvalidLength {
                what: "BIP-32 seed",
                expected: MAX_SEED_LEN,
                actual: seed.len(),
            });
        }
        let key = XPrv::new(seed).map_err(derivation_failed)?;
        Ok(Self { network, key })
    }

    fn compressed_public(&self) -> [u8; 33] {
        self.key.public_key().to_bytes()
    }

    /// Derive child `index`; indices at or above 2^31 are hardened.
    pub fn derive_child(&self, index: u32) -> Result<Self, CryptoError> {
        let key = self
            .key
            .derive_child(ChildNumber::from(index))
            .map_err(derivation_failed)?;
        Ok(Self {
            network: self.network,
            key,
        })
    }

    /// Derive along a path such as `m/44'/0'/0'/0/0`.
    pub fn derive_path(&self, path: &str) -> Result<Self, CryptoError> {
        let path: DerivationPath = path
            .parse()
            .map_err(|e| CryptoError::ParseFailure(format!("bad derivation path {}: {}", path, e)))?;
        let mut key = self.key.clone();
        for child in path.iter() {
            key = key.derive_child(child).map_err(derivation_failed)?;
        }
        Ok(Self {
            network: self.network,
            key,
        })
    }

    /// Depth below the master key.
    pub fn depth(&self) -> u8 {
        self.key.attrs().depth
    }

    /// Private key as 64 hex chars.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.key.to_bytes())
    }

    /// Compressed public key as hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.compressed_public())
    }

    /// Uncompressed public key as hex.
    pub fn uncompressed_public_key_hex(&self) -> String {
        hex::encode(
            self.key
                .private_key()
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes(),
        )
    }

    /// P2PKH address of the compressed public key.
    pub fn address(&self) -> String {
        p2pkh(&self.compressed_public(), self.network)
    }

    /// Compressed-key WIF.
    pub fn wif(&self) -> String {
        wif_encode(&Zeroizing::new(self.key.to_bytes())[..], self.network)
    }

    /// Base58check `xprv`/`tprv` serialization.
    pub fn to_xprv(&self) -> String {
        self.key.to_string(self.network.xprv_prefix()).as_str().to_owned()
    }
}

fn p2pkh(compressed_public: &[u8], network: Network) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_version());
    payload.extend_from_slice(&hash160(compressed_public));
    bs58::encode(payload).with_check().into_string()
}

fn wif_encode(secret: &[u8], network: Network) -> String {
    let mut payload = Zeroizing::new(Vec::with_capacity(34));
    payload.push(network.wif_version());
    payload.extend_from_slice(secret);
    payload.push(0x01);
    bs58::encode(&payload[..]).with_check().into_string()
}

/// P2PKH address for a SEC1 public key, hashed in compressed form.
pub fn bitcoin_address(public_key_hex: &str, network: Network) -> Result<String, CryptoError> {
    let public = k256::PublicKey::from_sec1_bytes(&hex::decode(public_key_hex)?)
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    Ok(p2pkh(public.to_encoded_point(true).as_bytes(), network))
}

/// Compressed-key WIF for a hex private key.
pub fn wif(secret_hex: &str, network: Network) -> Result<String, CryptoError> {
    let bytes = Zeroizing::new(hex::decode(secret_hex)?);
    let secret = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(wif_encode(&secret.to_bytes(), network))
}

/// Keys and address at one BIP-44 leaf.
#[derive(Debug, Clone)]
pub struct Bip44Key {
    /// P2PKH address
    pub address: String,
    /// Compressed public key, hex
    pub public_key: String,
    /// Uncompressed public key, hex
    pub public_key_uncompressed: String,
    /// Private key, hex
    pub private_key: String,
    /// Compressed-key WIF
    pub wif: String,
}

/// Derive `m/44'/coin'/account'/change/index` from a BIP-32 seed.
pub fn bip44_address(
    seed: &[u8],
    coin: u32,
    account: u32,
    change: u32,
    index: u32,
) -> Result<Bip44Key, CryptoError> {
    let network = Network::from_coin_type(coin)?;
    let path = format!("m/44'/{}'/{}'/{}/{}", coin, account, change, index);
    let key = ExtendedPrivateKey::master(seed, network)?.derive_path(&path)?;
    Ok(Bip44Key {
        address: key.address(),
        public_key: key.public_key_hex(),
        public_key_uncompressed: key.uncompressed_public_key_hex(),
        private_key: key.private_key_hex(),
        wif: key.wif(),
    })
}

/// BIP-39 English mnemonic for `entropy`.
pub fn mnemonic_from_entropy(entropy: &[u8]) -> Result<String, CryptoError> {
    Mnemonic::from_entropy(entropy)
        .map(|m| m.to_string())
        .map_err(|e| CryptoError::ParseFailure(format!("mnemonic: {}", e)))
}

/// BIP-39 seed (empty passphrase) of an English mnemonic phrase.
pub fn seed_from_mnemonic(phrase: &str) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| CryptoError::ParseFailure(format!("mnemonic: {}", e)))?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized("")))
}

/// BIP-39 seed (empty passphrase) of the mnemonic for `entropy`.
pub fn seed_from_entropy(entropy: &[u8]) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
    let mnemonic = Mnemonic::from_entropy(entropy)
        .map_err(|e| CryptoError::ParseFailure(format!("mnemonic: {}", e)))?;
    Ok(Zeroizing::new(mnemonic.to_seed_normalized("")))
}

fn first_wallet_key(entropy_hex: &str) -> Result<Bip44Key, CryptoError> {
    if entropy_hex.is_empty() {
        return Err(CryptoError::ParseFailure("empty entropy".into()));
    }
    let entropy = Zeroizing::new(hex::decode(entropy_hex)?);
    let seed = seed_from_entropy(&entropy)?;
    bip44_address(&seed[..], 0, 0, 0, 0)
}

/// Private key hex of wallet key 0 for hex `entropy`.
pub fn redeem_secret(entropy_hex: &str) -> Result<String, CryptoError> {
    Ok(first_wallet_key(entropy_hex)?.private_key)
}

/// Uncompressed public key hex of wallet key 0 for hex `entropy`.
pub fn redeem_public_key(entropy_hex: &str) -> Result<String, CryptoError> {
    Ok(first_wallet_key(entropy_hex)?.public_key_uncompressed)
}

/// SECP256K1 identity key (`m/44'/0'/0'/0/0`) for a node seed.
///
/// Uses the first 16 bytes of the seed as mnemonic entropy.
pub fn identity_key(seed: &[u8]) -> Result<Bip44Key, CryptoError> {
    let Some(entropy) = seed.get(..16) else {
        return Err(CryptoError::InvalidLength {
            what: "identity seed",
            expected: 16,
            actual: seed.len(),
        });
    };
    let wallet_seed = seed_from_entropy(entropy)?;
    bip44_address(&wallet_seed[..], 0, 0, 0, 0)
}

/// Compressed public half of [`identity_key`].
pub fn identity_public_key(seed: &[u8]) -> Result<String, CryptoError> {
    Ok(identity_key(seed)?.public_key)
}
