//! Ties the searches together and derives the reported cache parameters.
use crate::WORD_BYTES;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::measure::{Measurer, Probe};
use crate::search::{find_jump, find_line_stride, find_rest_spots};
use log::info;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub associativity: u64,
    /// Bytes
    pub cache_size: u64,
    /// Bytes
    pub cache_line_size: u64,
}

impl CacheGeometry {
    /// `rest_spots` is the converged capacity sweep, `jump` the spot count of the capacity
    /// cliff at `initial_stride`, `line_stride` the line size in words
    pub fn derive(
        initial_stride: u64,
        rest_spots: &[u64],
        jump: u64,
        line_stride: u64,
    ) -> Result<Self> {
        let smallest = rest_spots
            .first()
            .copied()
            .filter(|&s| s > 0)
            .ok_or(Error::NoCandidates)?;
        if jump == 0 {
            return Err(Error::BoundaryNotFound);
        }

        Ok(CacheGeometry {
            associativity: jump / smallest,
            cache_size: jump * initial_stride * WORD_BYTES,
            cache_line_size: line_stride * WORD_BYTES,
        })
    }
}

impl fmt::Display for CacheGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "associativity={} cache_size={} cache_line_size={}",
            self.associativity, self.cache_size, self.cache_line_size
        )
    }
}

/// Capacity and associativity first, then line size
pub fn run<P: Probe>(measurer: &mut Measurer<P>, config: &Config) -> Result<CacheGeometry> {
    config.validate()?;

    info!("Measuring cache associativity and size");
    let rest_spots = find_rest_spots(measurer, config)?;
    let jump = find_jump(measurer, config, &rest_spots)?.ok_or(Error::BoundaryNotFound)?;

    info!("Measuring cache line size");
    let line_stride = find_line_stride(measurer, config)?;

    CacheGeometry::derive(config.initial_stride, &rest_spots, jump, line_stride)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_values_from_search_results() {
        let geometry = CacheGeometry::derive(2, &[1, 2, 4], 16, 4).unwrap();
        assert_eq!(
            geometry,
            CacheGeometry {
                associativity: 16,
                cache_size: 256,
                cache_line_size: 32,
            }
        );
        assert_eq!(
            geometry.to_string(),
            "associativity=16 cache_size=256 cache_line_size=32"
        );
    }

    #[test]
    fn zero_jump_is_not_reported() {
        assert_eq!(
            CacheGeometry::derive(2, &[1, 2], 0, 8),
            Err(Error::BoundaryNotFound)
        );
        assert_eq!(CacheGeometry::derive(2, &[], 16, 8), Err(Error::NoCandidates));
    }
}
