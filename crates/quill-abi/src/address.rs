//! EIP-55 checksummed address text
//!
//! The checksum hashes the 40 lowercase hex digits with Keccak-256 and
//! uppercases every letter whose hash nibble is 8 or more.

use quill_crypto::keccak256;
use quill_primitives::Address;

use crate::error::ChecksumError;

/// Checksummed `0x`-prefixed form of `address`
pub fn format(address: &Address) -> String {
    let lower = hex::encode(address.as_bytes());
    let hash = keccak256(lower.as_bytes());
    let hash = hash.as_bytes();

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse checksummed address text.
///
/// Requires the `0x` prefix, exactly 40 hex digits and the exact EIP-55 case
/// pattern. All-lowercase or all-uppercase text is rejected unless it happens
/// to be the checksummed form.
pub fn parse(text: &str) -> Result<Address, ChecksumError> {
    let digits = text.strip_prefix("0x").ok_or(ChecksumError::MissingPrefix)?;
    if let Some((i, ch)) = digits.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(ChecksumError::InvalidHexDigit { offset: i + 2, ch });
    }
    if digits.len() != 2 * Address::LEN {
        return Err(ChecksumError::InvalidLength(digits.len()));
    }

    let address = Address::from_hex(digits).map_err(|_| ChecksumError::InvalidLength(digits.len()))?;
    let expected = format(&address);
    if expected != text {
        return Err(ChecksumError::Mismatch { expected });
    }
    Ok(address)
}
