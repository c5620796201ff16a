//! In-memory IPv4/IPv6 longest-prefix-match table.
//!
//! ```
//! use iptrie_core::IpTrie;
//!
//! let mut table = IpTrie::new();
//! table.insert("10.0.0.0", 8, "rfc1918")?;
//! table.insert("10.80.0.0", 12, "my special place")?;
//!
//! assert_eq!(table.find("10.120.2.1")?, Some(&"rfc1918"));
//! assert_eq!(table.find("10.80.117.4")?, Some(&"my special place"));
//! assert_eq!(table.find("1.2.3.4")?, None);
//! # Ok::<(), iptrie_core::Error>(())
//! ```

pub mod address;
pub mod constants;
pub mod errors;
pub mod handle_registry;
pub mod helpers;
pub mod loader;
pub mod patricia;
pub mod table;
pub mod telemetry;
pub mod types;

// Public module for C API functions
pub mod public_api;

pub use errors::Error;
pub use loader::{load, load_path, LoadReport};
pub use patricia::PatriciaTrie;
pub use table::IpTrie;
pub use types::{Family, Match};

use once_cell::sync::OnceCell;

// ---- logging bootstraper -------------------------------------------------
// Hosts reaching us through the C ABI cannot install a Rust logger, so the
// first handle created there installs env_logger (RUST_LOG) once.
pub(crate) fn ensure_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let _ = env_logger::builder()
            .format_timestamp(None)
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}
