//! Shared data types

use crate::constants::{V4_BITS, V6_BITS};
use crate::helpers::{v4_addr, v6_addr};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt;

/// Address family; each family lives in its own sub-trie.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Number of key bits for this family.
    #[inline]
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => V4_BITS,
            Family::V6 => V6_BITS,
        }
    }

    /// Build the network for a left-aligned key of this family.
    pub(crate) fn net(self, key: u128, prefix_len: u8) -> IpNet {
        // prefix_len never exceeds the family width inside the trie
        match self {
            Family::V4 => IpNet::V4(
                Ipv4Net::new(v4_addr(key), prefix_len)
                    .unwrap_or_else(|_| Ipv4Net::from(v4_addr(key))),
            ),
            Family::V6 => IpNet::V6(
                Ipv6Net::new(v6_addr(key), prefix_len)
                    .unwrap_or_else(|_| Ipv6Net::from(v6_addr(key))),
            ),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// A parsed prefix: family plus left-aligned canonical key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Prefix {
    pub family: Family,
    pub key: u128,
    pub len: u8,
}

/// Longest-prefix-match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a, V> {
    /// The stored prefix that covered the address.
    pub prefix: IpNet,
    pub value: &'a V,
}
