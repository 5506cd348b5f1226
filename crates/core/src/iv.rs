//! Initialization vector helpers.
//!
//! IVs travel as lowercase hex. A vector is "unset" when the field is
//! blank or carries the literal sentinel `null` written by the intake
//! layer for records that never had one.

use rand::RngCore;

/// IV size in bytes for the supported block ciphers.
pub const IV_LEN: usize = 16;

/// Sentinel the intake layer stores for a missing IV.
pub const UNSET_SENTINEL: &str = "null";

/// Whether `iv` means "no IV supplied".
pub fn is_unset(iv: &str) -> bool {
    let iv = iv.trim();
    iv.is_empty() || iv.eq_ignore_ascii_case(UNSET_SENTINEL)
}

/// Generate a fresh IV from the thread-local CSPRNG, hex-encoded.
pub fn generate_iv() -> String {
    let mut bytes = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Check that `iv` is exactly [`IV_LEN`] bytes of hex.
pub fn check_iv(iv: &str) -> Result<(), String> {
    let bytes = hex::decode(iv).map_err(|e| format!("IV is not valid hex: {e}"))?;
    if bytes.len() != IV_LEN {
        return Err(format!(
            "IV must be {} hex characters ({IV_LEN} bytes), got {}",
            IV_LEN * 2,
            iv.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_sentinel_are_unset() {
        assert!(is_unset(""));
        assert!(is_unset("   "));
        assert!(is_unset("null"));
        assert!(is_unset("NULL"));
        assert!(!is_unset("00112233445566778899aabbccddeeff"));
    }

    #[test]
    fn generated_iv_is_32_hex_chars() {
        let iv = generate_iv();
        assert_eq!(iv.len(), 32);
        assert!(iv.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(check_iv(&iv).is_ok());
    }

    #[test]
    fn generated_ivs_differ() {
        assert_ne!(generate_iv(), generate_iv());
    }

    #[test]
    fn check_iv_rejects_wrong_length_and_non_hex() {
        assert!(check_iv("0011").is_err());
        assert!(check_iv("zz112233445566778899aabbccddeeff").is_err());
        assert!(check_iv("00112233445566778899AABBCCDDEEFF").is_ok());
    }
}
