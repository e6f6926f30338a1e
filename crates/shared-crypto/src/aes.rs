//! # AES-CBC
//!
//! Raw CBC encryption for 128/192/256-bit keys plus the PKCS#7 helpers the
//! envelope codec applies around it. The CBC functions never pad: callers
//! pad to [`AES_BLOCK_PAD`] before encrypting and unpad after decrypting.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::CryptoError;

/// IV length for every key size.
pub const AES_IV_LEN: usize = 16;

/// Block length used for PKCS#7 padding of encrypted bodies.
pub const AES_BLOCK_PAD: usize = 32;

const AES_BLOCK: usize = 16;

fn check_inputs(key: &[u8], iv: &[u8], data: &[u8]) -> Result<(), CryptoError> {
    if !matches!(key.len(), 16 | 24 | 32) {
        return Err(CryptoError::InvalidLength {
            what: "AES key",
            expected: 32,
            actual: key.len(),
        });
    }
    if iv.len() != AES_IV_LEN {
        return Err(CryptoError::InvalidLength {
            what: "AES IV",
            expected: AES_IV_LEN,
            actual: iv.len(),
        });
    }
    if data.len() % AES_BLOCK != 0 {
        return Err(CryptoError::InvalidLength {
            what: "CBC input (multiple of 16)",
            expected: data.len().next_multiple_of(AES_BLOCK),
            actual: data.len(),
        });
    }
    Ok(())
}

macro_rules! cbc_encrypt {
    ($cipher:ty, $key:expr, $iv:expr, $data:expr) => {
        cbc::Encryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?
            .encrypt_padded_vec_mut::<NoPadding>($data)
    };
}

macro_rules! cbc_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $data:expr) => {
        cbc::Decryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|e| CryptoError::LibraryFailure(e.to_string()))?
            .decrypt_padded_vec_mut::<NoPadding>($data)
            .map_err(|_| CryptoError::VerificationFailed)?
    };
}

/// AES-CBC encrypt a block-aligned plaintext.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_inputs(key, iv, plaintext)?;
    let ct = match key.len() {
        16 => cbc_encrypt!(Aes128, key, iv, plaintext),
        24 => cbc_encrypt!(Aes192, key, iv, plaintext),
        _ => cbc_encrypt!(Aes256, key, iv, plaintext),
    };
    Ok(ct)
}

/// AES-CBC decrypt a block-aligned ciphertext.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_inputs(key, iv, ciphertext)?;
    let pt = match key.len() {
        16 => cbc_decrypt!(Aes128, key, iv, ciphertext),
        24 => cbc_decrypt!(Aes192, key, iv, ciphertext),
        _ => cbc_decrypt!(Aes256, key, iv, ciphertext),
    };
    Ok(pt)
}

/// PKCS#7 pad to a multiple of `block_len` (1..=255); always adds at least one byte.
pub fn pkcs7_pad(data: &[u8], block_len: usize) -> Vec<u8> {
    let pad = block_len - (data.len() % block_len);
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad as u8);
    out
}

/// Strip PKCS#7 padding added with `block_len`.
///
/// Rejects a zero pad byte, a pad longer than `block_len` or the buffer,
/// and any pad run whose bytes disagree.
pub fn pkcs7_unpad(data: &[u8], block_len: usize) -> Result<Vec<u8>, CryptoError> {
    let Some(&last) = data.last() else {
        return Err(CryptoError::VerificationFailed);
    };
    let pad = last as usize;
    if pad == 0 || pad > block_len || pad > data.len() {
        return Err(CryptoError::VerificationFailed);
    }
    let (body, padding) = data.split_at(data.len() - pad);
    if padding.iter().any(|&b| b != last) {
        return Err(CryptoError::VerificationFailed);
    }
    Ok(body.to_vec())
}
