use crate::error::{Error, Result};

/// Methodology constants for one measurement run. All sizes are in 64-bit words.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Smallest stride probed; cache size is reported relative to it
    pub initial_stride: u64,
    /// Largest working set the capacity sweep builds
    pub max_discover_words: u64,
    /// Probe buffer length, also the chain budget of the line-size search
    pub max_check_words: u64,
    pub clutter_words: u64,
    /// Alignment of both buffers in bytes
    pub page_size: usize,
    pub trials: u64,
    /// Pointer dereferences per warm-up and per timed pass
    pub walk_ops: u64,
    /// Working-set threshold of the spot count growth policy
    pub growth_step: u64,
    pub lookbehind: u64,
    pub min_line_stride: u64,
    pub max_line_stride: u64,
    pub jump_ratio: f64,
    pub plateau_ratio: f64,
    pub smoothing: f64,
    /// Stride at which the associativity search gives up
    pub max_rest_stride: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_stride: 2,
            max_discover_words: 1 << 15,
            max_check_words: 1 << 24,
            clutter_words: 1 << 23,
            page_size: 16384,
            trials: 9,
            walk_ops: 1 << 20,
            growth_step: 1 << 9,
            lookbehind: 16,
            min_line_stride: 2,
            max_line_stride: 128,
            jump_ratio: 1.045,
            plateau_ratio: 1.12,
            smoothing: 0.5,
            max_rest_stride: 1 << 15,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let nonzero = [
            ("initial_stride", self.initial_stride),
            ("max_discover_words", self.max_discover_words),
            ("max_check_words", self.max_check_words),
            ("clutter_words", self.clutter_words),
            ("trials", self.trials),
            ("walk_ops", self.walk_ops),
            ("growth_step", self.growth_step),
            ("min_line_stride", self.min_line_stride),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(Error::InvalidConfig(format!("{name} must be non-zero")));
        }
        if !self.page_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "page_size {} is not a power of two",
                self.page_size
            )));
        }
        if self.min_line_stride > self.max_line_stride {
            return Err(Error::InvalidConfig(format!(
                "line stride range {}..={} is empty",
                self.min_line_stride, self.max_line_stride
            )));
        }
        if self.max_line_stride > self.max_check_words {
            return Err(Error::InvalidConfig(format!(
                "max_line_stride {} exceeds the probe buffer",
                self.max_line_stride
            )));
        }
        // stride-doubled sweeps reach up to four times the discovery bound
        if self.max_discover_words.saturating_mul(4) > self.max_check_words {
            return Err(Error::InvalidConfig(format!(
                "discovery bound {} words does not fit the probe buffer of {} words",
                self.max_discover_words, self.max_check_words
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(Error::InvalidConfig(format!(
                "smoothing {} outside [0, 1]",
                self.smoothing
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_line_range() {
        let config = Config {
            min_line_stride: 64,
            max_line_stride: 8,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_trials() {
        let config = Config {
            trials: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
