//! # SECP256K1 Key Shares
//!
//! Combining two key shares: secret scalars add modulo the group order,
//! public points add on the curve, and `PubKey(a + b) == PubKey(a) + PubKey(b)`.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use primitive_types::{U256, U512};

use crate::CryptoError;

/// Group order `n` of SECP256K1, big-endian.
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

fn parse_scalar(hex_str: &str) -> Result<U512, CryptoError> {
    let bytes = hex::decode(hex_str)?;
    if bytes.is_empty() || bytes.len() > 32 {
        return Err(CryptoError::InvalidPrivateKey);
    }
    Ok(U512::from(U256::from_big_endian(&bytes)))
}

/// Add two hex private keys modulo the curve order, returning 64 hex chars.
pub fn ec_add_priv(a_hex: &str, b_hex: &str) -> Result<String, CryptoError> {
    let order = U512::from(U256::from_big_endian(&CURVE_ORDER));
    let mut sum = parse_scalar(a_hex)? + parse_scalar(b_hex)?;
    if sum > order {
        sum -= order;
    }
    let reduced = U256::try_from(sum).map_err(|_| CryptoError::InvalidPrivateKey)?;

    let mut out = [0u8; 32];
    reduced.to_big_endian(&mut out);
    Ok(hex::encode(out))
}

/// Add two SEC1 public keys, returning the compressed hex sum.
pub fn ec_add_pub(a_hex: &str, b_hex: &str) -> Result<String, CryptoError> {
    let a = PublicKey::from_sec1_bytes(&hex::decode(a_hex)?)
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let b = PublicKey::from_sec1_bytes(&hex::decode(b_hex)?)
        .map_err(|_| CryptoError::InvalidPublicKey)?;

    let sum = (a.to_projective() + b.to_projective()).to_affine();
    // Identity has no SEC1 encoding.
    let sum = PublicKey::from_affine(sum).map_err(|_| CryptoError::InvalidPublicKey)?;
    Ok(hex::encode(sum.to_encoded_point(true).as_bytes()))
}

/// `(uncompressed_hex, compressed_hex)` public key for a hex private key.
pub fn public_key_from_private(secret_hex: &str) -> Result<(String, String), CryptoError> {
    let bytes = hex::decode(secret_hex)?;
    let secret = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
    let public = secret.public_key();
    Ok((
        hex::encode(public.to_encoded_point(false).as_bytes()),
        hex::encode(public.to_encoded_point(true).as_bytes()),
    ))
}
