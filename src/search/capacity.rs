use crate::config::Config;
use crate::error::{Error, Result};
use crate::measure::{Measurer, Probe, SampleSet, Topology};
use crate::stats;
use crate::sweep::make_spots;
use log::debug;
use std::collections::BTreeSet;

/// Compare two stride-adjacent sweeps.
///
/// Returns `(full, half)`: the summed cube-root distances between `prev` and `new` at the same
/// spot count, and between `prev` and `new` at half the spot count (rounded up).
pub fn stride_distances(
    prev: &SampleSet,
    new: &SampleSet,
    spots: &[u64],
) -> Result<(f64, f64)> {
    let mut full = 0.0;
    let mut half = 0.0;
    for &count in spots {
        let before = prev.total(count)?;
        full += stats::cbrt_distance(before, new.total(count)?);
        half += stats::cbrt_distance(before, new.total(count / 2 + count % 2)?);
    }
    Ok((full, half))
}

/// Double the stride until halving the spot count stops tracking the previous sweep better
/// than keeping it. Returns the sweep at that point, rescaled to the initial stride.
pub fn find_rest_spots<P: Probe>(
    measurer: &mut Measurer<P>,
    config: &Config,
) -> Result<Vec<u64>> {
    let initial = config.initial_stride;
    let mut stride = initial;
    let mut all_spots = make_spots(stride, config.max_discover_words, config.growth_step);
    if all_spots.is_empty() {
        return Err(Error::NoCandidates);
    }
    let mut prev = measurer.measure(
        stride,
        all_spots.iter().copied(),
        Topology::ShuffledForward,
    )?;

    loop {
        stride *= 2;
        if stride > config.max_rest_stride {
            return Err(Error::NoConvergence {
                max_stride: config.max_rest_stride,
            });
        }

        let new_spots: BTreeSet<u64> = all_spots
            .iter()
            .flat_map(|&count| [count, count / 2])
            .filter(|&count| count > 0)
            .collect();
        let new = measurer.measure(stride, new_spots, Topology::ShuffledForward)?;

        let (full, half) = stride_distances(&prev, &new, &all_spots)?;
        debug!("stride={stride} full_distance={full} half_distance={half}");

        if full < half {
            debug!("final stride={stride}");
            for &count in &all_spots {
                debug!(
                    "spots={} prev={:?} full={:?} half={:?}",
                    count,
                    prev.total(count)?,
                    new.total(count)?,
                    new.total(count / 2 + count % 2)?
                );
            }
            let scale = stride / 2 / initial;
            return Ok(all_spots.into_iter().map(|count| count * scale).collect());
        }

        all_spots = make_spots(stride, config.max_discover_words, config.growth_step);
        prev = new;
    }
}

/// First candidate after which the walk gets at least `jump_ratio` slower immediately and at
/// least `plateau_ratio` slower on the smoothed remainder. `None` if no candidate qualifies.
pub fn locate_jump(
    measured: &SampleSet,
    candidates: &[u64],
    config: &Config,
) -> Result<Option<u64>> {
    let totals = candidates
        .iter()
        .map(|&count| measured.total(count))
        .collect::<Result<Vec<_>>>()?;

    let alpha = config.smoothing;
    let mut smooth_suffix: Vec<f64> = totals.iter().map(|t| t.as_secs_f64()).collect();
    for i in (1..smooth_suffix.len()).rev() {
        smooth_suffix[i - 1] = smooth_suffix[i - 1] * alpha + smooth_suffix[i] * (1.0 - alpha);
    }

    for (i, &count) in candidates.iter().enumerate() {
        debug!(
            "spots={} result={:?} smooth_suffix={:.6}",
            count, totals[i], smooth_suffix[i]
        );
    }

    for i in 0..candidates.len().saturating_sub(1) {
        let current = totals[i].as_secs_f64();
        let step_up = stats::ratio(totals[i + 1], totals[i]);
        let plateau = smooth_suffix[i + 1] / current;
        if step_up >= config.jump_ratio && plateau >= config.plateau_ratio {
            debug!("returning spots={}", candidates[i]);
            return Ok(Some(candidates[i]));
        }
    }

    Ok(None)
}

/// Measure every candidate at the initial stride and locate the capacity cliff
pub fn find_jump<P: Probe>(
    measurer: &mut Measurer<P>,
    config: &Config,
    candidates: &[u64],
) -> Result<Option<u64>> {
    let measured = measurer.measure(
        config.initial_stride,
        candidates.iter().copied(),
        Topology::ShuffledForward,
    )?;
    locate_jump(&measured, candidates, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn crafted(points: &[(u64, u64)]) -> SampleSet {
        // three identical trials per spot count
        points
            .iter()
            .flat_map(|&(spots, micros)| [(spots, Duration::from_micros(micros)); 3])
            .collect()
    }

    #[test]
    fn finds_engineered_jump() {
        let candidates = [2, 4, 8, 16, 32, 64, 128];
        let set = crafted(&[
            (2, 1000),
            (4, 1000),
            (8, 1000),
            (16, 1000),
            (32, 1050),
            (64, 1300),
            (128, 1300),
        ]);
        assert_eq!(
            locate_jump(&set, &candidates, &Config::default()),
            Ok(Some(16))
        );
    }

    #[test]
    fn isolated_spike_is_not_a_jump() {
        let candidates = [2, 4, 8, 16, 32];
        let set = crafted(&[(2, 1000), (4, 1000), (8, 1200), (16, 1000), (32, 1000)]);
        assert_eq!(locate_jump(&set, &candidates, &Config::default()), Ok(None));
    }

    #[test]
    fn flat_timings_have_no_jump() {
        let candidates = [1, 2, 3];
        let set = crafted(&[(1, 500), (2, 510), (3, 520)]);
        assert_eq!(locate_jump(&set, &candidates, &Config::default()), Ok(None));
        assert_eq!(locate_jump(&set, &[], &Config::default()), Ok(None));
    }

    #[test]
    fn unmeasured_candidate_is_an_error() {
        let set = crafted(&[(1, 500)]);
        assert_eq!(
            locate_jump(&set, &[1, 2], &Config::default()),
            Err(Error::MissingSamples { spots: 2 })
        );
    }

    #[test]
    fn distances_compare_same_and_halved_spots() {
        let prev = crafted(&[(1, 1000), (2, 2000), (4, 4000)]);
        let new = crafted(&[(1, 1000), (2, 2000), (4, 4000)]);
        let (full, half) = stride_distances(&prev, &new, &[1, 2, 4]).unwrap();
        assert_eq!(full, 0.0);
        assert!(half > 0.0);
    }

    #[test]
    fn rest_spots_converge_when_stride_stops_mattering() {
        let config = Config {
            max_discover_words: 1 << 10,
            trials: 2,
            ..Config::default()
        };
        // working set scales with stride up to 4, then stride no longer matters
        let probe = |_: Topology, stride: u64, spots: u64| {
            Duration::from_micros(spots * stride.min(4))
        };
        let mut measurer = Measurer::new(probe, config.trials);
        let spots = find_rest_spots(&mut measurer, &config).unwrap();

        let expected: Vec<u64> = make_spots(4, 1 << 10, config.growth_step)
            .into_iter()
            .map(|s| s * 2)
            .collect();
        assert_eq!(spots, expected);
    }

    #[test]
    fn rest_spots_give_up_at_max_stride() {
        let config = Config {
            max_discover_words: 1 << 10,
            max_rest_stride: 16,
            trials: 1,
            ..Config::default()
        };
        let probe = |_: Topology, _: u64, _: u64| Duration::from_micros(10);
        let mut measurer = Measurer::new(probe, config.trials);
        assert_eq!(
            find_rest_spots(&mut measurer, &config),
            Err(Error::NoConvergence { max_stride: 16 })
        );
    }
}
