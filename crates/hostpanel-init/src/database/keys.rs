//! Key material protecting the stored database password.
//!
//! The key file is a two-field TOML record holding a base64 AES-256 key and a
//! base64 96-bit nonce. It is parsed, never executed, and both fields must be
//! present before any decryption is attempted.

use std::fs;
use std::io;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Errors raised while reading key material or decrypting the password.
#[derive(Debug, Error)]
pub enum KeyMaterialError {
    /// The key file could not be read.
    #[error("couldn't read the database key material at '{path}': {source}")]
    Read {
        /// Key file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The key file is not a valid record.
    #[error("malformed database key material at '{path}': {source}")]
    Parse {
        /// Key file path.
        path: Utf8PathBuf,
        /// Parser error.
        #[source]
        source: Box<toml::de::Error>,
    },
    /// The key or nonce was never generated.
    #[error("database key and/or initialization vector was not generated")]
    Missing,
    /// A field did not decode to the expected length.
    #[error("invalid {field} in the database key material: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// The stored password is empty.
    #[error("the database password is empty")]
    EmptyPassword,
    /// The stored password is not valid base64.
    #[error("the database password is not valid base64: {source}")]
    PasswordEncoding {
        /// Decoder error.
        #[source]
        source: base64::DecodeError,
    },
    /// Authentication of the ciphertext failed.
    #[error("couldn't decrypt the database password")]
    Decrypt,
    /// Encryption failed.
    #[error("couldn't encrypt the database password")]
    Encrypt,
    /// The decrypted password is not UTF-8.
    #[error("the decrypted database password is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct KeyRecord {
    #[serde(default)]
    db_pass_key: String,
    #[serde(default)]
    db_pass_iv: String,
}

/// Decoded key and nonce.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    nonce: [u8; NONCE_LEN],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("KeyMaterial { .. }")
    }
}

impl KeyMaterial {
    /// Generates fresh random material.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0_u8; KEY_LEN];
        let mut nonce = [0_u8; NONCE_LEN];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut nonce);
        Self { key, nonce }
    }

    /// Reads and validates the key file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::Read`] or [`KeyMaterialError::Parse`] when
    /// the file is unusable, [`KeyMaterialError::Missing`] when either field
    /// is empty and [`KeyMaterialError::Invalid`] when a field has the wrong
    /// length.
    pub fn read(path: &Utf8Path) -> Result<Self, KeyMaterialError> {
        let raw = fs::read_to_string(path).map_err(|source| KeyMaterialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let record: KeyRecord =
            toml::from_str(&raw).map_err(|source| KeyMaterialError::Parse {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?;
        Self::from_record(&record)
    }

    fn from_record(record: &KeyRecord) -> Result<Self, KeyMaterialError> {
        if record.db_pass_key.trim().is_empty() || record.db_pass_iv.trim().is_empty() {
            return Err(KeyMaterialError::Missing);
        }
        Ok(Self {
            key: decode_field("db_pass_key", &record.db_pass_key)?,
            nonce: decode_field("db_pass_iv", &record.db_pass_iv)?,
        })
    }

    /// Renders the material in the key file format.
    #[must_use]
    pub fn to_toml(&self) -> String {
        format!(
            "db_pass_key = \"{}\"\ndb_pass_iv = \"{}\"\n",
            STANDARD.encode(self.key),
            STANDARD.encode(self.nonce)
        )
    }

    /// Decrypts a base64 AES-256-GCM password.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::EmptyPassword`] when the ciphertext or the
    /// decrypted password is empty, and the decoding or decryption variants
    /// when the ciphertext is unusable.
    pub fn decrypt_password(&self, ciphertext: &str) -> Result<String, KeyMaterialError> {
        let ciphertext = ciphertext.trim();
        if ciphertext.is_empty() {
            return Err(KeyMaterialError::EmptyPassword);
        }
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|source| KeyMaterialError::PasswordEncoding { source })?;
        let plain = self
            .cipher()?
            .decrypt(Nonce::from_slice(&self.nonce), raw.as_slice())
            .map_err(|_| KeyMaterialError::Decrypt)?;
        let password = String::from_utf8(plain).map_err(|_| KeyMaterialError::NotUtf8)?;
        if password.is_empty() {
            return Err(KeyMaterialError::EmptyPassword);
        }
        Ok(password)
    }

    /// Encrypts a password into the stored base64 form.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::Encrypt`] if the cipher rejects the input.
    pub fn encrypt_password(&self, password: &str) -> Result<String, KeyMaterialError> {
        let sealed = self
            .cipher()?
            .encrypt(Nonce::from_slice(&self.nonce), password.as_bytes())
            .map_err(|_| KeyMaterialError::Encrypt)?;
        Ok(STANDARD.encode(sealed))
    }

    fn cipher(&self) -> Result<Aes256Gcm, KeyMaterialError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|error| KeyMaterialError::Invalid {
            field: "db_pass_key",
            reason: error.to_string(),
        })
    }
}

fn decode_field<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], KeyMaterialError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|error| KeyMaterialError::Invalid {
            field,
            reason: error.to_string(),
        })?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| KeyMaterialError::Invalid {
        field,
        reason: format!("expected {N} bytes, found {}", bytes.len()),
    })
}
