//! # Measurement
//!
//! The [`Probe`] trait is the seam between the searches and the hardware: the real
//! implementation is [`Workspace`](crate::workspace::Workspace), tests plug in closures that
//! return fabricated durations. [`Measurer`] repeats a probe over trials and spot counts and
//! collects everything into a [`SampleSet`].
use crate::error::{Error, Result};
use crate::rng::Lcg;
use crate::stats;
use crate::workspace::Sink;
use log::{debug, info};
use std::collections::BTreeMap;
use std::time::Duration;

/// Shape of the chain a measurement walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Shuffled forward chain walked through node midpoints
    ShuffledForward,
    /// Forward chain detouring through an earlier node's midpoint
    Lookbehind,
}

impl Topology {
    /// Word offset into the first node where the timed walk starts
    pub fn start_offset(self, stride: u64) -> u64 {
        match self {
            Topology::ShuffledForward => stride / 2,
            Topology::Lookbehind => 0,
        }
    }
}

/// Something that can build a chain and time a walk over it
pub trait Probe {
    fn measure(
        &mut self,
        topology: Topology,
        stride: u64,
        spots: u64,
        rng: &mut Lcg,
        sink: &mut Sink,
    ) -> Result<Duration>;
}

/// Any `(topology, stride, spots) -> duration` closure is a probe with scripted timings
impl<F> Probe for F
where
    F: FnMut(Topology, u64, u64) -> Duration,
{
    fn measure(
        &mut self,
        topology: Topology,
        stride: u64,
        spots: u64,
        _rng: &mut Lcg,
        _sink: &mut Sink,
    ) -> Result<Duration> {
        Ok(self(topology, stride, spots))
    }
}

/// Durations per spot count, in trial order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: BTreeMap<u64, Vec<Duration>>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spots: u64, sample: Duration) {
        self.samples.entry(spots).or_default().push(sample);
    }

    pub fn samples(&self, spots: u64) -> Result<&[Duration]> {
        self.samples
            .get(&spots)
            .map(Vec::as_slice)
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingSamples { spots })
    }

    pub fn total(&self, spots: u64) -> Result<Duration> {
        self.samples(spots).map(stats::sum)
    }

    pub fn median(&self, spots: u64) -> Result<Duration> {
        self.samples(spots)
            .ok()
            .and_then(stats::median)
            .ok_or(Error::MissingSamples { spots })
    }

    pub fn spot_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.keys().copied()
    }
}

impl FromIterator<(u64, Duration)> for SampleSet {
    fn from_iter<T: IntoIterator<Item = (u64, Duration)>>(iter: T) -> Self {
        let mut set = SampleSet::new();
        for (spots, sample) in iter {
            set.push(spots, sample);
        }
        set
    }
}

/// Runs a probe over trials and spot counts with a reproducible shuffle per configuration
pub struct Measurer<P> {
    probe: P,
    rng: Lcg,
    sink: Sink,
    trials: u64,
}

impl<P: Probe> Measurer<P> {
    pub fn new(probe: P, trials: u64) -> Self {
        Measurer {
            probe,
            rng: Lcg::default(),
            sink: Sink::default(),
            trials,
        }
    }

    /// For each trial, measure every spot count at `stride`. The generator is reseeded with
    /// `spots + trial` before every single measurement.
    pub fn measure<I>(&mut self, stride: u64, spots: I, topology: Topology) -> Result<SampleSet>
    where
        I: IntoIterator<Item = u64>,
    {
        let spots: Vec<u64> = spots.into_iter().collect();
        let mut results = SampleSet::new();

        for trial in 0..self.trials {
            info!(
                "stride {}; iteration {} out of {}",
                stride,
                trial + 1,
                self.trials
            );
            for &count in &spots {
                self.rng.reseed(count.wrapping_add(trial));
                let elapsed =
                    self.probe
                        .measure(topology, stride, count, &mut self.rng, &mut self.sink)?;
                debug!("{topology:?} stride={stride} spots={count} elapsed={elapsed:?}");
                results.push(count, elapsed);
            }
        }

        Ok(results)
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}

impl<P> std::fmt::Debug for Measurer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Measurer")
            .field("trials", &self.trials)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}
