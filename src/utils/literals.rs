//! Solidity literal rendering
//!
//! Helpers that turn runtime values into source text that can be spliced
//! straight into generated Solidity.

use alloy_primitives::Address;
use rand::Rng;

/// Checksummed address literal (Solidity rejects non-checksummed ones)
pub fn address_literal(address: &Address) -> String {
    address.to_checksum(None)
}

/// Hex number literal, usable for `bytesN` when the width matches exactly
pub fn fixed_bytes_literal(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Hex string literal for dynamic `bytes`
pub fn dynamic_bytes_literal(bytes: &[u8]) -> String {
    format!("hex\"{}\"", hex::encode(bytes))
}

/// Quoted string literal, escaped for Solidity
///
/// Non-ASCII text needs the `unicode` prefix; control characters become `\xNN`.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }

    if value.is_ascii() {
        format!("\"{}\"", out)
    } else {
        format!("unicode\"{}\"", out)
    }
}

/// Fresh random address
///
/// Harness actors are random so a contract cannot allow-list them in advance.
pub fn random_address() -> Address {
    let bytes: [u8; 20] = rand::thread_rng().gen();
    Address::from(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_address_literal_is_checksummed() {
        let addr = Address::from_str("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        assert_eq!(
            address_literal(&addr),
            "0xdAC17F958D2ee523a2206206994597C13D831ec7"
        );
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(string_literal("Token"), "\"Token\"");
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(string_literal("line\nbreak"), "\"line\\nbreak\"");
        assert_eq!(string_literal("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(string_literal("\u{1}"), "\"\\x01\"");
    }

    #[test]
    fn test_unicode_prefix() {
        assert_eq!(string_literal("🚀"), "unicode\"🚀\"");
    }

    #[test]
    fn test_bytes_literals() {
        assert_eq!(fixed_bytes_literal(&[0xde, 0xad]), "0xdead");
        assert_eq!(dynamic_bytes_literal(&[0xbe, 0xef]), "hex\"beef\"");
    }

    #[test]
    fn test_random_addresses_differ() {
        assert_ne!(random_address(), random_address());
    }
}
