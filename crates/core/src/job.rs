//! The Job Message and its validated form.
//!
//! [`JobMessage`] is the wire shape published on the dispatch topic. It is
//! decoded leniently (legacy field names, numeric strings) and then turned
//! into a [`ValidatedJob`] by the [`Validator`](crate::validation::Validator).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::JobId;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Direction of the cryptographic transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    /// Parse an operation tag, ignoring ASCII case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("encrypt") {
            Some(Self::Encrypt)
        } else if raw.eq_ignore_ascii_case("decrypt") {
            Some(Self::Decrypt)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CipherMode
// ---------------------------------------------------------------------------

/// Block cipher mode understood by the transform program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    Ecb,
    Cbc,
}

impl CipherMode {
    /// Parse a mode tag such as `"CBC"` or `"ecb"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ecb") {
            Some(Self::Ecb)
        } else if raw.eq_ignore_ascii_case("cbc") {
            Some(Self::Cbc)
        } else {
            None
        }
    }

    /// Whether the mode needs an initialization vector.
    pub fn requires_iv(self) -> bool {
        matches!(self, Self::Cbc)
    }

    /// Tag passed to the transform program (`--mode`).
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Ecb => "ecb",
            Self::Cbc => "cbc",
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

// ---------------------------------------------------------------------------
// KeyLength
// ---------------------------------------------------------------------------

/// Supported symmetric key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLength {
    Bits128,
    Bits192,
    Bits256,
}

impl KeyLength {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            128 => Some(Self::Bits128),
            192 => Some(Self::Bits192),
            256 => Some(Self::Bits256),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::Bits128 => 128,
            Self::Bits192 => 192,
            Self::Bits256 => 256,
        }
    }

    /// Required key material length in bytes.
    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

// ---------------------------------------------------------------------------
// JobMessage
// ---------------------------------------------------------------------------

/// Unit of work published on the dispatch topic.
///
/// Serialized as a flat JSON object. The decoder also accepts the field
/// names used by the original intake layer (`id`, `fileUrl`, `aesLength`,
/// `requestPassword`, `requestIv`) and ignores unknown fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    #[serde(alias = "id")]
    pub job_id: JobId,

    #[serde(alias = "fileUrl")]
    pub source_url: String,

    pub file_name: String,

    #[serde(alias = "aesLength", deserialize_with = "de_key_length")]
    pub key_length_bits: u32,

    #[serde(alias = "requestPassword")]
    pub key: String,

    #[serde(default, deserialize_with = "de_lenient_string")]
    pub mode: String,

    #[serde(default, deserialize_with = "de_lenient_string")]
    pub operation: String,

    /// Hex-encoded IV, empty (or `"null"`) when unset.
    #[serde(default, alias = "requestIv", deserialize_with = "de_lenient_string")]
    pub iv: String,
}

impl fmt::Debug for JobMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobMessage")
            .field("job_id", &self.job_id)
            .field("source_url", &self.source_url)
            .field("file_name", &self.file_name)
            .field("key_length_bits", &self.key_length_bits)
            .field("key", &"<redacted>")
            .field("mode", &self.mode)
            .field("operation", &self.operation)
            .field("iv", &self.iv)
            .finish()
    }
}

/// Accept the key length either as a JSON number or as a numeric string.
fn de_key_length<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer) {
        Ok(Raw::Number(n)) => Ok(n),
        Ok(Raw::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom("key length is not a number")),
        Err(_) => Err(serde::de::Error::custom("key length is not a number")),
    }
}

/// Treat `null` like an absent string field.
fn de_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ValidatedJob
// ---------------------------------------------------------------------------

/// A Job Message that passed validation, with typed parameters.
///
/// `iv` is `None` when the message carried no IV; for modes that require
/// one the worker resolves it before invoking the transform.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedJob {
    pub job_id: JobId,
    pub source_url: String,
    pub file_name: String,
    pub key_length: KeyLength,
    pub key: String,
    pub mode: CipherMode,
    pub operation: Operation,
    pub iv: Option<String>,
}

impl fmt::Debug for ValidatedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedJob")
            .field("job_id", &self.job_id)
            .field("source_url", &self.source_url)
            .field("file_name", &self.file_name)
            .field("key_length", &self.key_length)
            .field("key", &"<redacted>")
            .field("mode", &self.mode)
            .field("operation", &self.operation)
            .field("iv", &self.iv)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
