//! The three searches over noisy walk timings.
//!
//! Each search is split into a measuring function, which drives a [`Measurer`], and a pure
//! decision function over the resulting [`SampleSet`] or medians, so the decisions can be
//! checked against fabricated timings.
//!
//! [`Measurer`]: crate::measure::Measurer
//! [`SampleSet`]: crate::measure::SampleSet
mod capacity;
mod line_size;

pub use capacity::{find_jump, find_rest_spots, locate_jump, stride_distances};
pub use line_size::{find_line_stride, pick_line_stride};
