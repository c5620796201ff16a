//! Dual-family prefix table.
//!
//! IPv4 and IPv6 prefixes live in two independent sub-tries, so a lookup can
//! only ever be answered by a prefix of its own family.

use crate::address::{check_prefix_len, ip_to_key, net_to_prefix, parse_addr, parse_prefix};
use crate::constants::{V4_BITS, V6_BITS};
use crate::errors::Error;
use crate::patricia::PatriciaTrie;
use crate::types::{Family, Match, Prefix};
use ipnet::IpNet;
use log::debug;
use metrics::{counter, gauge};
use std::net::IpAddr;

/// Longest-prefix-match table over IPv4 and IPv6 CIDR prefixes.
///
/// Mutation takes `&mut self`; a built table can be shared between any number
/// of readers (for example behind an `Arc`) as long as nobody writes.
#[derive(Debug, Clone)]
pub struct IpTrie<V> {
    v4: PatriciaTrie<V>,
    v6: PatriciaTrie<V>,
}

impl<V> Default for IpTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IpTrie<V> {
    pub fn new() -> Self {
        Self {
            v4: PatriciaTrie::new(V4_BITS),
            v6: PatriciaTrie::new(V6_BITS),
        }
    }

    /// Pre-size each family's node arena.
    pub fn with_capacity(v4_nodes: usize, v6_nodes: usize) -> Self {
        Self {
            v4: PatriciaTrie::with_capacity(V4_BITS, v4_nodes),
            v6: PatriciaTrie::with_capacity(V6_BITS, v6_nodes),
        }
    }

    #[inline]
    fn family(&self, family: Family) -> &PatriciaTrie<V> {
        match family {
            Family::V4 => &self.v4,
            Family::V6 => &self.v6,
        }
    }

    #[inline]
    fn family_mut(&mut self, family: Family) -> &mut PatriciaTrie<V> {
        match family {
            Family::V4 => &mut self.v4,
            Family::V6 => &mut self.v6,
        }
    }

    /// Associate `value` with `address/prefix_len`.
    ///
    /// Host bits past `prefix_len` are ignored, so `10.1.2.3/8` and
    /// `10.9.9.9/8` name the same entry. Re-inserting a prefix replaces its
    /// value and hands back the old one.
    pub fn insert(&mut self, address: &str, prefix_len: u32, value: V) -> Result<Option<V>, Error> {
        let prefix = parse_prefix(address, i64::from(prefix_len))?;
        Ok(self.insert_prefix(prefix, value))
    }

    pub fn insert_net(&mut self, net: IpNet, value: V) -> Option<V> {
        self.insert_prefix(net_to_prefix(net), value)
    }

    fn insert_prefix(&mut self, p: Prefix, value: V) -> Option<V> {
        counter!("iptrie_inserts_total").increment(1);
        // `Prefix` lengths are validated against the family width on construction
        let old = self.family_mut(p.family).insert_unchecked(p.key, p.len, value);
        debug!(
            "[INSERT] {} key={:x}/{} replaced={}",
            p.family,
            p.key,
            p.len,
            old.is_some()
        );
        old
    }

    /// Value of the longest stored prefix covering `address`.
    pub fn find(&self, address: &str) -> Result<Option<&V>, Error> {
        let (family, key) = parse_addr(address)?;
        Ok(self.family(family).longest_match(key).map(|(_, _, v)| v))
    }

    /// Like [`find`](Self::find), also reporting which prefix matched.
    pub fn find_match(&self, address: &str) -> Result<Option<Match<'_, V>>, Error> {
        let (family, key) = parse_addr(address)?;
        Ok(self.match_key(family, key))
    }

    pub fn find_addr(&self, ip: IpAddr) -> Option<&V> {
        let (family, key) = ip_to_key(ip);
        self.family(family).longest_match(key).map(|(_, _, v)| v)
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<Match<'_, V>> {
        let (family, key) = ip_to_key(ip);
        self.match_key(family, key)
    }

    fn match_key(&self, family: Family, key: u128) -> Option<Match<'_, V>> {
        self.family(family)
            .longest_match(key)
            .map(|(k, len, value)| Match {
                prefix: family.net(k, len),
                value,
            })
    }

    /// Exact-prefix lookup; no longest-match fallback.
    pub fn get(&self, address: &str, prefix_len: u32) -> Result<Option<&V>, Error> {
        let p = parse_prefix(address, i64::from(prefix_len))?;
        Ok(self.family(p.family).get(p.key, p.len))
    }

    pub fn get_mut(&mut self, address: &str, prefix_len: u32) -> Result<Option<&mut V>, Error> {
        let p = parse_prefix(address, i64::from(prefix_len))?;
        Ok(self.family_mut(p.family).get_mut(p.key, p.len))
    }

    /// Remove exactly `address/prefix_len`, returning its value if it was stored.
    pub fn remove(&mut self, address: &str, prefix_len: u32) -> Result<Option<V>, Error> {
        let p = parse_prefix(address, i64::from(prefix_len))?;
        Ok(self.remove_prefix(p))
    }

    pub fn remove_net(&mut self, net: IpNet) -> Option<V> {
        self.remove_prefix(net_to_prefix(net))
    }

    fn remove_prefix(&mut self, p: Prefix) -> Option<V> {
        let old = self.family_mut(p.family).remove(p.key, p.len);
        if old.is_some() {
            counter!("iptrie_removes_total").increment(1);
            debug!("[REMOVE] {} key={:x}/{}", p.family, p.key, p.len);
        }
        old
    }

    /// Whether `address/prefix_len` is stored exactly.
    pub fn contains(&self, address: &str, prefix_len: u32) -> Result<bool, Error> {
        Ok(self.get(address, prefix_len)?.is_some())
    }

    /// Stored prefixes across both families.
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored prefixes of one family.
    pub fn family_len(&self, family: Family) -> usize {
        self.family(family).len()
    }

    pub fn node_count(&self) -> usize {
        self.v4.node_count() + self.v6.node_count()
    }

    pub fn clear(&mut self) {
        self.v4.clear();
        self.v6.clear();
    }

    /// IPv4 entries, then IPv6 entries, each in address order.
    pub fn iter(&self) -> impl Iterator<Item = (IpNet, &V)> + '_ {
        let v4 = self
            .v4
            .iter()
            .map(|(k, len, v)| (Family::V4.net(k, len), v));
        let v6 = self
            .v6
            .iter()
            .map(|(k, len, v)| (Family::V6.net(k, len), v));
        v4.chain(v6)
    }

    /// Emit size gauges (caller decides cadence).
    pub fn report_metrics(&self) {
        gauge!("iptrie_prefixes").set(self.len() as f64);
        gauge!("iptrie_nodes").set(self.node_count() as f64);
    }
}

/// Validate a signed prefix length coming from an untyped boundary (C ABI).
pub(crate) fn checked_prefix_len(address: &str, prefix_len: i64) -> Result<u32, Error> {
    let (family, _) = parse_addr(address)?;
    check_prefix_len(family, prefix_len).map(u32::from)
}

impl<V> FromIterator<(IpNet, V)> for IpTrie<V> {
    fn from_iter<I: IntoIterator<Item = (IpNet, V)>>(iter: I) -> Self {
        let mut trie = IpTrie::new();
        trie.extend(iter);
        trie
    }
}

impl<V> Extend<(IpNet, V)> for IpTrie<V> {
    fn extend<I: IntoIterator<Item = (IpNet, V)>>(&mut self, iter: I) {
        for (net, value) in iter {
            self.insert_net(net, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_match_precedence() {
        let mut t = IpTrie::new();
        t.insert("10.0.0.0", 8, "A").unwrap();
        t.insert("10.1.0.0", 16, "B").unwrap();
        assert_eq!(t.find("10.1.2.3").unwrap(), Some(&"B"));
        assert_eq!(t.find("10.2.2.3").unwrap(), Some(&"A"));
    }

    #[test]
    fn invalid_input_is_reported() {
        let mut t: IpTrie<u8> = IpTrie::new();
        assert!(matches!(t.insert("10.0.0.300", 8, 1), Err(Error::InvalidAddress(_))));
        assert!(matches!(
            t.insert("10.0.0.0", 33, 1),
            Err(Error::InvalidPrefixLength { prefix_len: 33, max: 32 })
        ));
        assert!(matches!(
            t.insert("::", 129, 1),
            Err(Error::InvalidPrefixLength { prefix_len: 129, max: 128 })
        ));
        assert!(matches!(t.find("nope"), Err(Error::InvalidAddress(_))));
        assert!(t.is_empty());
    }

    #[test]
    fn find_match_reports_prefix() {
        let mut t = IpTrie::new();
        t.insert("2001:470:0:76::", 64, "he").unwrap();
        let m = t.find_match("2001:470:0:76::3").unwrap().unwrap();
        assert_eq!(m.prefix, "2001:470:0:76::/64".parse::<IpNet>().unwrap());
        assert_eq!(*m.value, "he");
    }

    #[test]
    fn checked_prefix_len_rejects_negative() {
        assert!(checked_prefix_len("1.2.3.4", -1).is_err());
        assert_eq!(checked_prefix_len("1.2.3.4", 24).unwrap(), 24);
        assert!(checked_prefix_len("not-an-ip", 24).is_err());
    }

    #[test]
    fn collects_from_nets() {
        let t: IpTrie<u32> = [
            ("10.0.0.0/8".parse::<IpNet>().unwrap(), 1),
            ("::/0".parse::<IpNet>().unwrap(), 2),
        ]
        .into_iter()
        .collect();
        assert_eq!(t.len(), 2);
        assert_eq!(t.family_len(Family::V6), 1);
        assert_eq!(t.find("10.9.8.7").unwrap(), Some(&1));
        assert_eq!(t.find("fe80::1").unwrap(), Some(&2));
        assert_eq!(t.find("11.0.0.1").unwrap(), None);
    }
}
