/*
 * Utility functions and helpers
 */

use crate::models::{GridHookError, Result};
use ethers::types::Address;
use ethers::utils::to_checksum;

/// Parses a 0x-prefixed, 20-byte hex address. Any letter case is accepted.
pub fn parse_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| GridHookError::ValidationError(format!("Invalid address format: {address}")))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GridHookError::ValidationError(format!(
            "Invalid address format: {address} (expected 20 bytes of hex)"
        )));
    }

    hex_part
        .parse::<Address>()
        .map_err(|e| GridHookError::ValidationError(format!("Invalid address {address}: {e}")))
}

/// EIP-55 mixed-case rendering.
#[must_use]
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

#[must_use]
pub fn short_hash(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    if hex.len() <= 12 {
        format!("0x{hex}")
    } else {
        format!("0x{}…{}", &hex[..6], &hex[hex.len() - 6..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_address_is_checksummed() {
        let address = parse_address("0x9d71e6f99da38505b3c50cb0ec2ed754ea13d040").unwrap();
        assert_eq!(checksum(&address), "0x9D71E6f99da38505b3c50cb0ec2ed754Ea13D040");
    }

    #[test]
    fn rejects_wrong_length_and_missing_prefix() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("9d71e6f99da38505b3c50cb0ec2ed754ea13d040").is_err());
        assert!(parse_address("0x9d71e6f99da38505b3c50cb0ec2ed754ea13d04z").is_err());
        assert!(parse_address("user").is_err());
    }
}
