//! Address text → trie key conversion.

use crate::errors::Error;
use crate::helpers::{canonical, v4_key, v6_key};
use crate::types::{Family, Prefix};
use ipnet::IpNet;
use std::net::IpAddr;

/// Family and left-aligned key for an address.
#[inline]
pub fn ip_to_key(ip: IpAddr) -> (Family, u128) {
    match ip {
        IpAddr::V4(v4) => (Family::V4, v4_key(u32::from(v4))),
        IpAddr::V6(v6) => (Family::V6, v6_key(v6)),
    }
}

/// Parse an IPv4 dotted quad or an IPv6 literal. Surrounding whitespace is
/// not accepted.
pub fn parse_addr(text: &str) -> Result<(Family, u128), Error> {
    text.parse::<IpAddr>()
        .map(ip_to_key)
        .map_err(|_| Error::InvalidAddress(text.to_owned()))
}

/// Check a caller-supplied length against the family width.
pub fn check_prefix_len(family: Family, prefix_len: i64) -> Result<u8, Error> {
    let max = family.width();
    if (0..=max as i64).contains(&prefix_len) {
        Ok(prefix_len as u8)
    } else {
        Err(Error::InvalidPrefixLength { prefix_len, max })
    }
}

/// Parse `text` and pair it with `prefix_len`; host bits are cleared.
pub fn parse_prefix(text: &str, prefix_len: i64) -> Result<Prefix, Error> {
    let (family, key) = parse_addr(text)?;
    let len = check_prefix_len(family, prefix_len)?;
    Ok(Prefix {
        family,
        key: canonical(key, len),
        len,
    })
}

/// Typed counterpart of [`parse_prefix`]; `IpNet` already bounds the length.
pub fn net_to_prefix(net: IpNet) -> Prefix {
    let (family, key) = ip_to_key(net.addr());
    Prefix {
        family,
        key: canonical(key, net.prefix_len()),
        len: net.prefix_len(),
    }
}
