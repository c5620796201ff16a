use std::{
    path::PathBuf,
    sync::{Arc, Barrier},
    thread,
    time::Instant,
};

use iptrie_core::{load_path, Error, Family, IpTrie, LoadReport};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/test.cidr")
}

#[test]
fn sample_file_expectations() {
    let mut trie = IpTrie::new();
    let report = load_path(&mut trie, fixture(), str::to_owned).unwrap();
    assert_eq!(
        report,
        LoadReport {
            loaded: 10,
            replaced: 0,
            skipped: 2
        }
    );

    let expectations = [
        ("1.2.3.4", None),
        ("10.120.2.1", Some("rfc1918")),
        ("10.80.117.4", Some("my special place")),
        ("2001:470:0:76::2", Some("website")),
        ("2001:470:0:76::3", Some("he")),
        ("2620:0:0:0::2", None),
        ("2620:1f:0:1::1", Some("omniti")),
        ("75.49.14.236", Some("boom")),
    ];
    for (target, expected) in expectations {
        let got = trie.find(target).unwrap().map(String::as_str);
        assert_eq!(got, expected, "test {target}");
    }
}

#[test]
fn sample_inserts_without_host_route() {
    let mut trie = IpTrie::new();
    trie.insert("10.0.0.0", 8, "rfc1918").unwrap();
    trie.insert("10.80.0.0", 12, "my special place").unwrap();
    trie.insert("2001:470::", 32, "website").unwrap();
    trie.insert("2001:470:0:76::", 64, "he").unwrap();
    trie.insert("2620:1f::", 32, "omniti").unwrap();
    trie.insert("75.49.0.0", 16, "boom").unwrap();

    assert_eq!(trie.find("10.120.2.1").unwrap(), Some(&"rfc1918"));
    assert_eq!(trie.find("10.80.117.4").unwrap(), Some(&"my special place"));
    assert_eq!(trie.find("2001:470:0:76::3").unwrap(), Some(&"he"));
    assert_eq!(trie.find("2001:470:1::1").unwrap(), Some(&"website"));
    assert_eq!(trie.find("2620:0:0:0::2").unwrap(), None);
    assert_eq!(trie.find("2620:1f:0:1::1").unwrap(), Some(&"omniti"));
    assert_eq!(trie.find("1.2.3.4").unwrap(), None);
    assert_eq!(trie.find("75.49.14.236").unwrap(), Some(&"boom"));
}

#[test]
fn default_route_per_family() {
    let mut trie = IpTrie::new();
    trie.insert("0.0.0.0", 0, "v4-default").unwrap();
    trie.insert("10.0.0.0", 8, "ten").unwrap();

    assert_eq!(trie.find("1.2.3.4").unwrap(), Some(&"v4-default"));
    assert_eq!(trie.find("255.255.255.255").unwrap(), Some(&"v4-default"));
    assert_eq!(trie.find("10.0.0.1").unwrap(), Some(&"ten"));
    // the IPv4 default does not cover IPv6
    assert_eq!(trie.find("::1").unwrap(), None);

    trie.insert("::", 0, "v6-default").unwrap();
    assert_eq!(trie.find("2001:db8::1").unwrap(), Some(&"v6-default"));
    let m = trie.find_match("2001:db8::1").unwrap().unwrap();
    assert_eq!(m.prefix.to_string(), "::/0");
}

#[test]
fn families_never_cross_match() {
    let mut trie = IpTrie::new();
    // ::a00:0/104 has the same low bits as 10.0.0.0/8 under an IPv4-compatible mapping,
    // and 0a00::/8 shares its leading bits with 10.0.0.0/8 when left-aligned
    trie.insert("::a00:0", 104, "v6-compat").unwrap();
    trie.insert("a00::", 8, "v6-left").unwrap();
    assert_eq!(trie.find("10.1.2.3").unwrap(), None);

    trie.insert("10.0.0.0", 8, "v4").unwrap();
    assert_eq!(trie.find("10.1.2.3").unwrap(), Some(&"v4"));
    assert_eq!(trie.find("a01::").unwrap(), Some(&"v6-left"));
    assert_eq!(trie.find("::a01:203").unwrap(), Some(&"v6-compat"));
    assert_eq!(trie.family_len(Family::V4), 1);
    assert_eq!(trie.family_len(Family::V6), 2);

    // mapped IPv4 text is an IPv6 address and stays in the IPv6 table
    assert_eq!(trie.find("::ffff:10.1.2.3").unwrap(), None);
}

#[test]
fn overwrite_keeps_last_value() {
    let mut trie = IpTrie::new();
    assert_eq!(trie.insert("10.1.2.3", 8, 1).unwrap(), None);
    assert_eq!(trie.insert("10.9.9.9", 8, 2).unwrap(), Some(1));
    assert_eq!(trie.len(), 1);
    assert_eq!(trie.find("10.200.0.0").unwrap(), Some(&2));
    assert_eq!(trie.get("10.0.0.0", 8).unwrap(), Some(&2));
}

#[test]
fn every_host_address_round_trips() {
    let mut trie = IpTrie::new();
    let hosts = ["192.0.2.1", "198.51.100.255", "2001:db8::dead:beef", "fe80::1"];
    for (i, h) in hosts.iter().enumerate() {
        let width = if h.contains(':') { 128 } else { 32 };
        trie.insert(h, width, i).unwrap();
    }
    for (i, h) in hosts.iter().enumerate() {
        assert_eq!(trie.find(h).unwrap(), Some(&i));
    }
}

#[test]
fn empty_trie_finds_nothing() {
    let trie: IpTrie<()> = IpTrie::new();
    assert_eq!(trie.find("1.2.3.4").unwrap(), None);
    assert_eq!(trie.find("::").unwrap(), None);
    assert!(matches!(trie.find("1.2.3"), Err(Error::InvalidAddress(_))));
}

#[test]
fn remove_only_touches_exact_prefix() {
    let mut trie = IpTrie::new();
    trie.insert("10.0.0.0", 8, "a").unwrap();
    trie.insert("10.1.0.0", 16, "b").unwrap();
    trie.insert("10.1.1.0", 24, "c").unwrap();

    assert_eq!(trie.remove("10.1.0.0", 16).unwrap(), Some("b"));
    assert_eq!(trie.remove("10.1.0.0", 16).unwrap(), None);
    assert_eq!(trie.find("10.1.1.1").unwrap(), Some(&"c"));
    assert_eq!(trie.find("10.1.2.1").unwrap(), Some(&"a"));
    assert!(!trie.contains("10.1.0.0", 16).unwrap());
    assert!(matches!(trie.remove("10.1.0.0", 40), Err(Error::InvalidPrefixLength { .. })));

    let nets: Vec<String> = trie.iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(nets, ["10.0.0.0/8", "10.1.1.0/24"]);
}

#[test]
fn get_mut_updates_in_place() {
    let mut trie = IpTrie::new();
    trie.insert("2620:1f::", 32, vec!["omniti"]).unwrap();
    trie.get_mut("2620:1f::", 32).unwrap().unwrap().push("again");
    assert_eq!(trie.find("2620:1f::9").unwrap().map(Vec::len), Some(2));
    assert_eq!(trie.get_mut("2620:1f::", 33).unwrap(), None);
}

#[test]
fn concurrent_readers_share_a_built_trie() {
    let mut trie = IpTrie::new();
    for i in 0..=255u32 {
        trie.insert(&format!("10.{i}.0.0"), 16, i).unwrap();
    }
    trie.insert("10.0.0.0", 8, 1_000).unwrap();
    let trie = Arc::new(trie);

    let threads = num_cpus::get().max(2);
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let t = Arc::clone(&trie);
            let b = Arc::clone(&barrier);
            thread::spawn(move || {
                b.wait();
                for i in 0..=255u32 {
                    assert_eq!(t.find(&format!("10.{i}.7.7")).unwrap(), Some(&i));
                }
                assert_eq!(t.find("11.0.0.1").unwrap(), None);
            })
        })
        .collect();
    for h in handles {
        h.join().expect("reader thread failed");
    }
}

#[test]
fn stress_test_timing() {
    const NUM_KEYS: u32 = 50_000;
    let mut trie = IpTrie::with_capacity(2 * NUM_KEYS as usize, 1);
    for i in 0..NUM_KEYS {
        let ip = std::net::Ipv4Addr::from(i << 8);
        trie.insert(&ip.to_string(), 24, i).unwrap();
    }
    assert_eq!(trie.len(), NUM_KEYS as usize);

    let start = Instant::now();
    for i in 0..NUM_KEYS {
        let ip = std::net::Ipv4Addr::from((i << 8) | 0x7f);
        assert_eq!(trie.find_addr(ip.into()), Some(&i));
    }
    let elapsed = start.elapsed();
    let avg = elapsed.as_nanos() as f64 / NUM_KEYS as f64;
    println!("avg lookup ({} keys): {:.0} ns", NUM_KEYS, avg);
}
