//! Empirical data cache geometry: associativity, capacity and line size, measured purely from
//! pointer-chasing latency.
pub mod config;
pub mod error;
pub mod measure;
pub mod report;
pub mod rng;
pub mod search;
pub mod stats;
pub mod sweep;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use measure::{Measurer, Probe, SampleSet, Topology};
pub use report::{CacheGeometry, run};
pub use workspace::{Sink, Workspace};

/// Bytes per probe buffer word
pub const WORD_BYTES: u64 = std::mem::size_of::<u64>() as u64;

const BINARY_UNITS: [(u64, &str); 3] = [(1 << 30, "GiB"), (1 << 20, "MiB"), (1 << 10, "KiB")];

/// Largest binary unit not exceeding `bytes`
fn binary_unit(bytes: u64) -> (u64, &'static str) {
    BINARY_UNITS
        .iter()
        .copied()
        .find(|&(scale, _)| bytes >= scale)
        .unwrap_or((1, "B"))
}

/// Byte count with two decimals in the largest fitting unit, e.g. `48.00 KiB`
pub fn format_size(bytes: u64) -> String {
    let (scale, unit) = binary_unit(bytes);
    format!("{:.2} {unit}", bytes as f64 / scale as f64)
}

/// Whole units right-aligned to four columns, e.g. `  32 KiB`
pub fn format_size_fixed_int(bytes: u64) -> String {
    let (scale, unit) = binary_unit(bytes);
    format!("{:>4} {unit}", bytes / scale)
}
