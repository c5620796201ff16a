//! Constants and configuration for the prefix trie

/// Bit width of an IPv4 key.
pub const V4_BITS: u8 = 32;
/// Bit width of an IPv6 key.
pub const V6_BITS: u8 = 128;

/// Arena index meaning "no child".
pub const NIL: u32 = u32::MAX;
/// Arena slot of the permanent root node (the empty prefix).
pub const ROOT: u32 = 0;

/// Longest value (in bytes, without the NUL) accepted through the C ABI.
pub const VALUE_MAX_LEN: usize = 4_096;
