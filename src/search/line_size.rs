use crate::config::Config;
use crate::error::Result;
use crate::measure::{Measurer, Probe, Topology};
use crate::stats;
use log::debug;
use std::time::Duration;

/// Line size in words from per-stride medians, `medians[i]` taken at `min_stride << i`.
///
/// Picks the largest slowdown between adjacent strides (at least 1.0, later strides win ties)
/// and returns half the stride it ends at. Returns 1 when no pair qualifies.
pub fn pick_line_stride(min_stride: u64, medians: &[Duration]) -> u64 {
    let mut line_stride = 1;
    let mut max_speedup = 1.0;

    for (i, pair) in medians.windows(2).enumerate() {
        let stride = min_stride << (i + 1);
        let speedup = stats::ratio(pair[1], pair[0]);
        if speedup >= max_speedup {
            max_speedup = speedup;
            line_stride = stride / 2;
        }
    }

    line_stride
}

/// Walk lookbehind chains filling the whole probe budget at doubling strides
pub fn find_line_stride<P: Probe>(measurer: &mut Measurer<P>, config: &Config) -> Result<u64> {
    let mut medians = Vec::new();
    let mut stride = config.min_line_stride;

    while stride <= config.max_line_stride {
        let spots = config.max_check_words / stride;
        let measured = measurer.measure(stride, [spots], Topology::Lookbehind)?;
        let result = measured.median(spots)?;
        debug!("stride={stride} result={result:?}");
        medians.push(result);
        stride *= 2;
    }

    Ok(pick_line_stride(config.min_line_stride, &medians))
}
