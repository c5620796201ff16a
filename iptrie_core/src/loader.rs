//! Batch loading of line-oriented CIDR files.
//!
//! Each line reads `prefix/length<whitespace>value`; the value runs to the end
//! of the line. Blank lines and `#` comments are ignored. Lines that do not
//! parse, or that the trie rejects, are logged and skipped; only I/O errors
//! abort a load.

use crate::errors::Error;
use crate::table::IpTrie;
use log::{info, warn};
use metrics::counter;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One parsed line of a CIDR file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrLine<'a> {
    pub address: &'a str,
    pub prefix_len: u32,
    pub value: &'a str,
}

/// Outcome of a batch load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines inserted, replacements included.
    pub loaded: usize,
    /// Lines that overwrote an earlier entry with the same prefix.
    pub replaced: usize,
    pub skipped: usize,
}

/// Parse a single line; `line_no` is only used in the error.
///
/// Returns `Ok(None)` for blank and comment lines. The value may be empty as
/// long as whitespace separates it from the length.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<CidrLine<'_>>, Error> {
    let line = line.trim_start();
    if line.trim_end().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let malformed = |reason| Error::MalformedLine {
        line: line_no,
        reason,
    };

    let (address, rest) = line.split_once('/').ok_or(malformed("missing '/'"))?;
    if address.is_empty() {
        return Err(malformed("empty address"));
    }
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return Err(malformed("missing prefix length"));
    }
    let (len_text, tail) = rest.split_at(digits);
    if !tail.starts_with(char::is_whitespace) {
        return Err(malformed("missing value"));
    }
    let prefix_len = len_text
        .parse::<u32>()
        .map_err(|_| malformed("prefix length out of range"))?;

    Ok(Some(CidrLine {
        address,
        prefix_len,
        value: tail.trim(),
    }))
}

fn skip(report: &mut LoadReport, what: fmt::Arguments<'_>) {
    warn!("skipping {what}");
    report.skipped += 1;
    counter!("iptrie_loader_skipped_total").increment(1);
}

/// Load every line of `reader` into `trie`, converting values with `map`.
///
/// Lines that are not UTF-8 are skipped like any other malformed line.
pub fn load<R, V, F>(trie: &mut IpTrie<V>, mut reader: R, mut map: F) -> Result<LoadReport, Error>
where
    R: BufRead,
    F: FnMut(&str) -> V,
{
    let mut report = LoadReport::default();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let parsed = std::str::from_utf8(raw)
            .map_err(|_| Error::MalformedLine {
                line: line_no,
                reason: "not valid UTF-8",
            })
            .and_then(|line| parse_line(line, line_no));
        let entry = match parsed {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                skip(&mut report, format_args!("{e}"));
                continue;
            }
        };
        match trie.insert(entry.address, entry.prefix_len, map(entry.value)) {
            Ok(old) => {
                report.loaded += 1;
                if old.is_some() {
                    report.replaced += 1;
                }
            }
            Err(e) => {
                skip(&mut report, format_args!("line {line_no}: {e}"));
            }
        }
    }
    info!(
        "loaded {} entries ({} replaced, {} skipped)",
        report.loaded, report.replaced, report.skipped
    );
    Ok(report)
}

/// Open `path` and [`load`] it.
pub fn load_path<P, V, F>(trie: &mut IpTrie<V>, path: P, map: F) -> Result<LoadReport, Error>
where
    P: AsRef<Path>,
    F: FnMut(&str) -> V,
{
    let file = File::open(path.as_ref())?;
    load(trie, BufReader::new(file), map)
}
