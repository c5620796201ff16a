//! Bit helpers shared by the trie and the address layer.
//!
//! Keys are always left-aligned in a `u128`: bit index 0 is the most
//! significant bit. IPv4 addresses occupy the top 32 bits.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Left-align a 32-bit IPv4 address into the key space.
#[inline]
pub fn v4_key(addr: u32) -> u128 {
    (addr as u128) << 96
}

/// Inverse of [`v4_key`]; host bits below the top 32 are dropped.
#[inline]
pub fn v4_addr(key: u128) -> Ipv4Addr {
    Ipv4Addr::from((key >> 96) as u32)
}

#[inline]
pub fn v6_key(addr: Ipv6Addr) -> u128 {
    u128::from(addr)
}

#[inline]
pub fn v6_addr(key: u128) -> Ipv6Addr {
    Ipv6Addr::from(key)
}

/// Length of the common leading run of `key1` and `key2`, capped at `max_len`.
pub fn common_prefix_len(key1: u128, key2: u128, max_len: u8) -> u8 {
    if max_len == 0 {
        return 0;
    }
    let diff = (key1 ^ key2) & mask(max_len);
    if diff == 0 {
        return max_len;
    }
    (diff.leading_zeros() as u8).min(max_len)
}

#[inline]
pub fn get_bit(key: u128, index: u8) -> usize {
    debug_assert!(index <= 127);
    ((key >> (127 - index)) & 1) as usize
}

#[inline]
pub fn mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 128 {
        !0u128
    } else {
        !(!0u128 >> prefix_len)
    }
}

// Canonicalise a key: zero host bits beyond `plen`.
#[inline(always)]
pub fn canonical(key: u128, plen: u8) -> u128 {
    key & mask(plen)
}
