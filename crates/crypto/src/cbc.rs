//! AES-128-CBC with PKCS#7 padding
//!
//! Implemented directly over the `aes` block cipher. Decryption verifies
//! padding strictly; a padding failure is reported as a crypto error
//! because it almost always means a wrong key rather than damaged bytes
//! (damage is caught earlier by the framing layer).

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use maildex_core::{Result, SearchError};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt with AES-128-CBC, PKCS#7 padded. Output length is the padded
/// length (always a multiple of the block size, never zero).
pub fn encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(plaintext.len() + pad);
    padded.extend_from_slice(plaintext);
    padded.extend(std::iter::repeat(pad as u8).take(pad));

    let mut out = Vec::with_capacity(padded.len());
    let mut prev = *iv;
    for chunk in padded.chunks(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        for (i, byte) in chunk.iter().enumerate() {
            block[i] = byte ^ prev[i];
        }
        let mut ga = GenericArray::clone_from_slice(&block);
        cipher.encrypt_block(&mut ga);
        prev.copy_from_slice(&ga);
        out.extend_from_slice(&ga);
    }
    out
}

/// Decrypt AES-128-CBC and strip PKCS#7 padding.
pub fn decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(SearchError::crypto(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let mut out = Vec::with_capacity(ciphertext.len());
    let mut prev = *iv;
    for chunk in ciphertext.chunks(BLOCK_SIZE) {
        let mut ga = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut ga);
        for (i, byte) in ga.iter().enumerate() {
            out.push(byte ^ prev[i]);
        }
        prev.copy_from_slice(chunk);
    }

    let pad = *out.last().expect("non-empty plaintext") as usize;
    if pad == 0 || pad > BLOCK_SIZE || pad > out.len() {
        return Err(SearchError::crypto("invalid padding"));
    }
    if out[out.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(SearchError::crypto("invalid padding"));
    }
    out.truncate(out.len() - pad);
    Ok(out)
}
