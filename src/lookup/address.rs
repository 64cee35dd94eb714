//! Address syntax validation.

use std::net::IpAddr;

/// Whether `address` is a syntactically valid IPv4 or IPv6 literal.
pub fn is_valid_address(address: &str) -> bool {
    address.parse::<IpAddr>().is_ok()
}
