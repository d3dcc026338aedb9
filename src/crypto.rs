//! Symmetric media decryption
//!
//! Encrypted inputs carry base64url-encoded AES key material; the payload is
//! AES-CBC with PKCS#7 padding. The key length selects the cipher width
//! (16 bytes → AES-128, 32 bytes → AES-256). Decryption is CPU-bound, so the
//! fetcher calls [`decrypt_media_detached`] to run it on the blocking pool.

use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::{CryptoError, Error, Result};
use crate::types::EncryptionKeyPair;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const AES_BLOCK_SIZE: usize = 16;

/// URL-safe base64 engine that accepts both padded and unpadded input
///
/// Key material and inline payloads arrive from multiple producers that do
/// not agree on padding.
pub(crate) const BASE64_URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64url string (padding optional)
pub fn decode_base64url(input: &str) -> Result<Vec<u8>> {
    BASE64_URL_LENIENT
        .decode(input.trim())
        .map_err(|e| Error::Crypto(CryptoError::InvalidEncoding(e.to_string())))
}

/// Decrypt an AES-CBC/PKCS#7 payload in place
///
/// Returns the plaintext with padding stripped. Fails with a
/// [`CryptoError`] for invalid key/iv lengths, ciphertext that is not a
/// whole number of blocks, or padding that does not validate.
pub fn decrypt_media(mut data: Vec<u8>, keys: &EncryptionKeyPair) -> Result<Vec<u8>> {
    let key = decode_base64url(&keys.key)?;
    let iv = decode_base64url(&keys.iv)?;

    if iv.len() != AES_BLOCK_SIZE {
        return Err(Error::Crypto(CryptoError::InvalidIvLength(iv.len())));
    }
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(Error::Crypto(CryptoError::BadPadding));
    }

    let plaintext_len = match key.len() {
        16 => {
            let cipher = Aes128CbcDec::new_from_slices(&key, &iv)
                .map_err(|_| Error::Crypto(CryptoError::InvalidKeyLength(key.len())))?;
            cipher
                .decrypt_padded_mut::<Pkcs7>(&mut data)
                .map_err(|_| Error::Crypto(CryptoError::BadPadding))?
                .len()
        }
        32 => {
            let cipher = Aes256CbcDec::new_from_slices(&key, &iv)
                .map_err(|_| Error::Crypto(CryptoError::InvalidKeyLength(key.len())))?;
            cipher
                .decrypt_padded_mut::<Pkcs7>(&mut data)
                .map_err(|_| Error::Crypto(CryptoError::BadPadding))?
                .len()
        }
        other => return Err(Error::Crypto(CryptoError::InvalidKeyLength(other))),
    };

    data.truncate(plaintext_len);
    Ok(data)
}

/// Decrypt on the blocking thread pool
///
/// Media payloads can be tens of megabytes; running the cipher inline would
/// stall the async runtime.
pub async fn decrypt_media_detached(data: Vec<u8>, keys: &EncryptionKeyPair) -> Result<Vec<u8>> {
    let keys = keys.clone();
    tokio::task::spawn_blocking(move || decrypt_media(data, &keys))
        .await
        .map_err(|e| Error::Other(format!("decryption task failed: {e}")))?
}
