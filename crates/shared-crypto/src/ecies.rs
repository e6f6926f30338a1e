//! # SECP256K1 ECIES
//!
//! IEEE 1363a style ECIES used by plugins to seal a secret to a public key.
//!
//! ## Construction
//!
//! - `V` is a fresh ephemeral public key (65-byte uncompressed SEC1).
//! - `Z` is the x-coordinate of the shared Diffie-Hellman point.
//! - `K = KDF2(SHA-256, V || Z, P1)` split into `K1 || K2`, 16 bytes each.
//! - `C = AES-128-CBC(K1, IV = 0, PKCS#7(M))`.
//! - `T = HMAC-SHA256(K2, C)`, truncated to 12 bytes.
//!
//! All three outputs travel as lowercase hex.

use hmac::{Hmac, Mac};
use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::aes::{aes_cbc_decrypt, aes_cbc_encrypt, pkcs7_pad, pkcs7_unpad};
use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

const PARAM_P1: [u8; 3] = [0, 1, 2];
const AES_KEY_LEN: usize = 16;
const TAG_LEN: usize = 12;
const ZERO_IV: [u8; 16] = [0u8; 16];

/// Hex-encoded ECIES output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EciesCiphertext {
    /// Ciphertext `C`
    pub c: String,
    /// Ephemeral public key `V`
    pub v: String,
    /// Truncated MAC `T`
    pub t: String,
}

fn kdf2(shared: &[u8], parameter: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(shared);
    hasher.update(1u32.to_be_bytes());
    hasher.update(parameter);
    Zeroizing::new(hasher.finalize().into())
}

fn derive_keys(ephemeral: &[u8], z: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut vz = Zeroizing::new(Vec::with_capacity(ephemeral.len() + z.len()));
    vz.extend_from_slice(ephemeral);
    vz.extend_from_slice(z);
    kdf2(&vz, &PARAM_P1)
}

fn tag_mac(k2: &[u8], ciphertext: &[u8]) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(k2)
        .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?;
    mac.update(ciphertext);
    Ok(mac)
}

fn parse_public_key(public_key_hex: &str) -> Result<PublicKey, CryptoError> {
    let bytes = hex::decode(public_key_hex)?;
    PublicKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)
}

fn parse_secret_key(secret_key_hex: &str) -> Result<SecretKey, CryptoError> {
    let bytes = Zeroizing::new(hex::decode(secret_key_hex)?);
    SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)
}

/// Seal `message` to the SEC1 public key `public_key_hex`.
pub fn secp256k1_encrypt(
    message: &[u8],
    public_key_hex: &str,
) -> Result<EciesCiphertext, CryptoError> {
    let recipient = parse_public_key(public_key_hex)?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let v = ephemeral.public_key().to_encoded_point(false);
    let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), recipient.as_affine());

    let k = derive_keys(v.as_bytes(), shared.raw_secret_bytes());
    let (k1, k2) = k.split_at(AES_KEY_LEN);

    let c = aes_cbc_encrypt(k1, &ZERO_IV, &pkcs7_pad(message, AES_KEY_LEN))?;
    let t = tag_mac(k2, &c)?.finalize().into_bytes();

    Ok(EciesCiphertext {
        c: hex::encode(&c),
        v: hex::encode(v.as_bytes()),
        t: hex::encode(&t[..TAG_LEN]),
    })
}

/// Open an [`EciesCiphertext`] with the hex secret key.
///
/// A wrong key, a bad tag and bad padding all return
/// [`CryptoError::VerificationFailed`].
pub fn secp256k1_decrypt(
    sealed: &EciesCiphertext,
    secret_key_hex: &str,
) -> Result<Vec<u8>, CryptoError> {
    let c = hex::decode(&sealed.c)?;
    let v = hex::decode(&sealed.v)?;
    let t = hex::decode(&sealed.t)?;
    let secret = parse_secret_key(secret_key_hex)?;
    let ephemeral = PublicKey::from_sec1_bytes(&v).map_err(|_| CryptoError::InvalidPublicKey)?;

    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
    let k = derive_keys(&v, shared.raw_secret_bytes());
    let (k1, k2) = k.split_at(AES_KEY_LEN);

    if t.is_empty() || t.len() > 32 {
        return Err(CryptoError::VerificationFailed);
    }
    tag_mac(k2, &c)?
        .verify_truncated_left(&t)
        .map_err(|_| CryptoError::VerificationFailed)?;

    let padded = aes_cbc_decrypt(k1, &ZERO_IV, &c).map_err(|_| CryptoError::VerificationFailed)?;
    pkcs7_unpad(&padded, AES_KEY_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "The Qu1ck Br0wn F0x Jumps 0v3r Th3 L@zy D0g";
    const PUBLIC_KEY: &str = "041adb36d23c6d01a77d0c2064d491a948922718b848a5f422d17f64b19d65c195986e0ee28049d34e912b3f8022eeb5ec60bcd6562d0c1ee507427e183bdbdd66";
    const SECRET_KEY: &str = "8ba005a4ab3b655205435cd61da3630655ccba3c5365e32207eb9bdad561b38f";

    fn fixed_ciphertext() -> EciesCiphertext {
        EciesCiphertext {
            c: "16751918cf55801daf36e6e6e595a41f3e31d7ba2db55790693e90dfff61ba617fa5ad63fb5fd0c52ccf4b2a85c1f527".into(),
            v: "04a68004e3de100c2b76537e0b3d6eb95ce4f03e4dfac2e01527f73f723b4387c956d1120c6b64a812ccde3658ceeed80cf062e6ea6bf6a95395315e0ef6f2140f".into(),
            t: "68d7e2c2a4dbceb4e7b885d3".into(),
        }
    }

    #[test]
    fn test_decrypt_known_ciphertext() {
        let plain = secp256k1_decrypt(&fixed_ciphertext(), SECRET_KEY).unwrap();
        assert_eq!(plain, MESSAGE.as_bytes());
    }

    #[test]
    fn test_tag_covers_ciphertext_only() {
        let sealed = fixed_ciphertext();
        let secret = parse_secret_key(SECRET_KEY).unwrap();
        let v = hex::decode(&sealed.v).unwrap();
        let ephemeral = PublicKey::from_sec1_bytes(&v).unwrap();
        let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
        let k = derive_keys(&v, shared.raw_secret_bytes());

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&k[AES_KEY_LEN..]).unwrap();
        mac.update(&hex::decode(&sealed.c).unwrap());
        let tag = mac.finalize().into_bytes();
        assert_eq!(hex::encode(&tag[..TAG_LEN]), sealed.t);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let sealed = secp256k1_encrypt(MESSAGE.as_bytes(), PUBLIC_KEY).unwrap();
        assert_eq!(sealed.v.len(), 130);
        assert_eq!(sealed.t.len(), TAG_LEN * 2);
        assert_eq!(sealed.c.len() % 32, 0);

        let plain = secp256k1_decrypt(&sealed, SECRET_KEY).unwrap();
        assert_eq!(plain, MESSAGE.as_bytes());
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let mut sealed = fixed_ciphertext();
        sealed.t = "68d7e2c2a4dbceb4e7b885d4".into();
        assert!(matches!(
            secp256k1_decrypt(&sealed, SECRET_KEY),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let other = "c70c9d95f4c1612c53886d2e07a2bae5aa931f36c65e6af13bfba410a0ca1bd0";
        assert!(matches!(
            secp256k1_decrypt(&fixed_ciphertext(), other),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_bad_public_key() {
        assert!(matches!(
            secp256k1_encrypt(b"x", "04deadbeef"),
            Err(CryptoError::InvalidPublicKey)
        ));
        assert!(matches!(
            secp256k1_encrypt(b"x", "zz"),
            Err(CryptoError::ParseFailure(_))
        ));
    }
}
