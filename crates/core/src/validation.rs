//! Job Validator.
//!
//! Decodes a raw dispatch payload and checks its parameters before any
//! expensive work starts. A job that fails here is dropped from the
//! pipeline without a Result Message.

use crate::iv;
use crate::job::{CipherMode, JobMessage, KeyLength, Operation, ValidatedJob};
use crate::naming;

/// Reasons a Job Message is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed job message: {0}")]
    Malformed(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid key length {0}: only 128, 192 or 256 bits are supported")]
    UnsupportedKeyLength(u32),

    #[error("Key length mismatch: expected {expected} bytes (for {bits}-bit), got {actual}")]
    KeyLengthMismatch {
        bits: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported operation: '{0}' (expected encrypt or decrypt)")]
    UnsupportedOperation(String),

    #[error("Unsupported cipher mode: '{0}' (expected ECB or CBC)")]
    UnsupportedMode(String),

    #[error("Malformed IV: {0}")]
    MalformedIv(String),

    #[error("Invalid file name: '{0}'")]
    InvalidFileName(String),
}

/// Stateless checker for Job Messages.
pub struct Validator;

impl Validator {
    /// Decode a dispatch payload into a [`JobMessage`].
    pub fn decode(text: &str) -> Result<JobMessage, ValidationError> {
        serde_json::from_str(text).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Decode and validate in one step.
    pub fn check(text: &str) -> Result<ValidatedJob, ValidationError> {
        Self::validate(&Self::decode(text)?)
    }

    /// Check a decoded message and produce its typed form.
    ///
    /// Checks run in a fixed order: key length, key size, operation, mode,
    /// IV, then identifiers and file name.
    pub fn validate(msg: &JobMessage) -> Result<ValidatedJob, ValidationError> {
        let key_length = KeyLength::from_bits(msg.key_length_bits)
            .ok_or(ValidationError::UnsupportedKeyLength(msg.key_length_bits))?;

        let actual = msg.key.len();
        if actual != key_length.bytes() {
            return Err(ValidationError::KeyLengthMismatch {
                bits: key_length.bits(),
                expected: key_length.bytes(),
                actual,
            });
        }

        let operation = Operation::parse(&msg.operation)
            .ok_or_else(|| ValidationError::UnsupportedOperation(msg.operation.clone()))?;

        let mode = CipherMode::parse(&msg.mode)
            .ok_or_else(|| ValidationError::UnsupportedMode(msg.mode.clone()))?;

        let iv = if mode.requires_iv() && !iv::is_unset(&msg.iv) {
            let supplied = msg.iv.trim();
            iv::check_iv(supplied).map_err(ValidationError::MalformedIv)?;
            Some(supplied.to_string())
        } else {
            None
        };

        if msg.job_id.trim().is_empty() {
            return Err(ValidationError::MissingField("jobId"));
        }
        if msg.source_url.trim().is_empty() {
            return Err(ValidationError::MissingField("sourceUrl"));
        }
        if !naming::is_plain_file_name(&msg.file_name) {
            return Err(ValidationError::InvalidFileName(msg.file_name.clone()));
        }

        Ok(ValidatedJob {
            job_id: msg.job_id.clone(),
            source_url: msg.source_url.clone(),
            file_name: msg.file_name.clone(),
            key_length,
            key: msg.key.clone(),
            mode,
            operation,
            iv,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
