use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iptrie_core::{load_path, IpTrie, LoadReport};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Addresses timed by `bench` when none are given.
const DEFAULT_BENCH_ADDRS: [&str; 5] = [
    "66.225.209.7",
    "199.15.227.10",
    "1.2.3.4",
    "224.0.2.3",
    "10.0.2.3",
];

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arg {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a CIDR file and report insert throughput
    Load {
        #[arg(help = "File of `prefix/length value` lines")]
        file: PathBuf,
    },
    /// Resolve addresses against a CIDR file
    Lookup {
        file: PathBuf,
        #[arg(required = true)]
        addrs: Vec<String>,
    },
    /// Time repeated lookups against a CIDR file
    Bench {
        file: PathBuf,
        #[arg(short, long, default_value_t = 100_000, help = "Lookups per address")]
        iterations: u32,
        addrs: Vec<String>,
    },
}

fn load(file: &Path) -> Result<(IpTrie<String>, LoadReport, f64)> {
    let mut trie = IpTrie::new();
    let start = Instant::now();
    let report = load_path(&mut trie, file, str::to_owned)
        .with_context(|| format!("loading {}", file.display()))?;
    Ok((trie, report, start.elapsed().as_secs_f64()))
}

fn run_load(file: &Path) -> Result<()> {
    let (trie, report, elapsed) = load(file)?;
    println!("{} entries in {:.3} seconds", report.loaded, elapsed);
    println!("{:.0} add/sec", report.loaded as f64 / elapsed.max(f64::EPSILON));
    if report.skipped > 0 {
        println!("{} lines skipped", report.skipped);
    }
    info!("{} prefixes over {} nodes", trie.len(), trie.node_count());
    Ok(())
}

fn run_lookup(file: &Path, addrs: &[String]) -> Result<()> {
    let (trie, _, _) = load(file)?;
    for addr in addrs {
        match trie.find_match(addr)? {
            Some(m) => println!("{addr} -> {} {}", m.prefix, m.value),
            None => println!("{addr} -> (none)"),
        }
    }
    Ok(())
}

fn run_bench(file: &Path, iterations: u32, addrs: &[String]) -> Result<()> {
    let (trie, report, elapsed) = load(file)?;
    println!("{} entries in {:.3} seconds", report.loaded, elapsed);

    let defaults: Vec<String> = DEFAULT_BENCH_ADDRS.iter().map(|s| s.to_string()).collect();
    let addrs = if addrs.is_empty() { &defaults[..] } else { addrs };
    for addr in addrs {
        // reject bad input before timing
        trie.find(addr)?;
        let start = Instant::now();
        for _ in 0..iterations {
            std::hint::black_box(trie.find(std::hint::black_box(addr))?);
        }
        let secs = start.elapsed().as_secs_f64().max(f64::EPSILON);
        println!("{addr} performance: {:.0} lookups/sec", f64::from(iterations) / secs);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let arg = Arg::parse();
    match arg.command {
        Command::Load { file } => run_load(&file),
        Command::Lookup { file, addrs } => run_lookup(&file, &addrs),
        Command::Bench {
            file,
            iterations,
            addrs,
        } => run_bench(&file, iterations, &addrs),
    }
}
