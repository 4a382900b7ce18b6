//! # Workspace
//!
//! Owns the two page-aligned buffers every measurement runs in: the probe buffer, where the
//! chains are embedded, and the clutter buffer, which is swept before each timed pass so the
//! previous measurement leaves nothing useful behind in the cache.
//!
//! A chain link is stored as a word index from the probe buffer base and only turned into an
//! address inside the walk loop, so the whole chain always lives in one contiguous allocation.
use crate::config::Config;
use crate::error::{Error, Result};
use crate::measure::{Probe, Topology};
use crate::rng::Lcg;
use crate::{WORD_BYTES, format_size_fixed_int};
use log::{Level, debug, log_enabled};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::hint::black_box;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::time::{Duration, Instant};

/// Zero-initialised run of `u64` words with a caller-chosen alignment
pub struct AlignedBuffer {
    ptr: NonNull<u64>,
    len: usize,
    layout: Layout,
}

impl AlignedBuffer {
    pub fn new(len: usize, align: usize) -> Result<Self> {
        let align = align.max(std::mem::align_of::<u64>());
        let layout_err = Error::Layout {
            bytes: len.saturating_mul(WORD_BYTES as usize),
            align,
        };
        // round up to whole pages
        let bytes = len
            .checked_mul(WORD_BYTES as usize)
            .and_then(|b| b.max(1).checked_next_multiple_of(align))
            .ok_or(layout_err.clone())?;
        let layout = Layout::from_size_align(bytes, align).map_err(|_| layout_err)?;

        // SAFETY: layout has a non-zero size
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<u64>()).ok_or(Error::Allocation { bytes, align })?;

        Ok(AlignedBuffer { ptr, len, layout })
    }

    pub fn as_ptr(&self) -> *const u64 {
        self.ptr.as_ptr()
    }
}

impl Deref for AlignedBuffer {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        // SAFETY: ptr is a live zero-initialised allocation of at least len words
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u64] {
        // SAFETY: as above, and &mut self guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with this exact layout
        unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}

/// Optimisation barrier for values read during a walk.
///
/// Folding the walk's running sum in here keeps the compiler from proving the timed loop dead.
#[derive(Debug, Default)]
pub struct Sink {
    total: u64,
}

impl Sink {
    pub fn absorb(&mut self, value: u64) {
        self.total = black_box(self.total.wrapping_add(value));
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[derive(Debug)]
pub struct Workspace {
    probe: AlignedBuffer,
    clutter: AlignedBuffer,
    walk_ops: u64,
    lookbehind: u64,
}

impl Workspace {
    /// Allocate both buffers; fails if either allocation does
    pub fn new(config: &Config) -> Result<Self> {
        let probe = AlignedBuffer::new(config.max_check_words as usize, config.page_size)?;
        let clutter = AlignedBuffer::new(config.clutter_words as usize, config.page_size)?;
        Ok(Workspace {
            probe,
            clutter,
            walk_ops: config.walk_ops,
            lookbehind: config.lookbehind,
        })
    }

    /// Read-only view of the probe buffer
    pub fn probe(&self) -> &[u64] {
        &self.probe
    }

    fn check_fits(&self, stride: u64, spots: u64) -> Result<()> {
        if stride == 0 || spots == 0 {
            return Err(Error::InvalidConfig(format!(
                "empty chain (stride {stride}, spots {spots})"
            )));
        }
        match stride.checked_mul(spots) {
            Some(words) if words <= self.probe.len() as u64 => Ok(()),
            _ => Err(Error::WorkingSetTooLarge {
                stride,
                spots,
                capacity: self.probe.len(),
            }),
        }
    }

    /// Node `i` links to node `i + 1`, the last node back to node 0
    pub fn build_forward(&mut self, stride: u64, spots: u64) -> Result<()> {
        self.check_fits(stride, spots)?;
        let stride = stride as usize;
        let spots = spots as usize;
        for i in 0..spots - 1 {
            self.probe[i * stride] = ((i + 1) * stride) as u64;
        }
        self.probe[(spots - 1) * stride] = 0;
        Ok(())
    }

    /// Fisher-Yates over the node head values. The result is a permutation of the heads but
    /// not necessarily a single cycle.
    pub fn shuffle(&mut self, stride: u64, spots: u64, rng: &mut Lcg) -> Result<()> {
        self.check_fits(stride, spots)?;
        let stride = stride as usize;
        for i in (1..spots).rev() {
            let j = (rng.next() % (i + 1)) as usize;
            self.probe.swap(i as usize * stride, j * stride);
        }
        Ok(())
    }

    /// Forward chain, shuffled, with every midpoint linking to the midpoint of the node its
    /// head links to
    pub fn build_shuffled(&mut self, stride: u64, spots: u64, rng: &mut Lcg) -> Result<()> {
        self.build_forward(stride, spots)?;
        self.shuffle(stride, spots, rng)?;

        let half = stride / 2;
        let stride = stride as usize;
        for i in 0..spots as usize {
            let head = i * stride;
            self.probe[head + half as usize] = self.probe[head] + half;
        }
        Ok(())
    }

    /// Forward chain where node `i` detours through the midpoint of the node `lookbehind`
    /// places earlier, which holds node `i`'s original link
    pub fn build_lookbehind(&mut self, stride: u64, spots: u64) -> Result<()> {
        self.build_forward(stride, spots)?;

        let back = self.lookbehind % spots;
        let half = stride / 2;
        for i in 0..spots {
            let behind = (i + spots - back) % spots;
            let mid = (behind * stride + half) as usize;
            let head = (i * stride) as usize;
            self.probe[mid] = self.probe[head];
            self.probe[head] = mid as u64;
        }
        Ok(())
    }

    /// Debug line describing how much of a freshly shuffled chain the walk from node 0 reaches
    pub fn coverage_line(&self, stride: u64, spots: u64) -> String {
        format!(
            "shuffled chain of {} ({} spots) covers {:?} nodes from its head",
            format_size_fixed_int(stride * spots * WORD_BYTES).trim_start(),
            spots,
            self.cycle_len(0, spots)
        )
    }

    /// Number of links followed from `start` until it is reached again, or `None` if that takes
    /// more than `limit` steps
    pub fn cycle_len(&self, start: u64, limit: u64) -> Option<u64> {
        let mut idx = self.probe.get(start as usize).copied()?;
        for steps in 1..=limit {
            if idx == start {
                return Some(steps);
            }
            idx = *self.probe.get(idx as usize)?;
        }
        None
    }

    /// Sweep the clutter buffer, warm up from the chain head, then time `walk_ops` dereferences
    /// starting at word `start`
    #[inline(never)]
    pub fn walk(&mut self, start: u64, sink: &mut Sink) -> Duration {
        let mut sum = 0u64;

        for word in self.clutter.iter_mut() {
            sum = sum.wrapping_add(*word);
            *word ^= 1;
        }

        let base = self.probe.as_ptr();
        let len = self.probe.len() as u64;
        debug_assert!(start < len);
        let start = start.min(len - 1);

        // SAFETY (both loops): the buffer starts zeroed and the builders only ever store word
        // indices below `len`, so every value read is an in-bounds index
        let mut idx = 0u64;
        for _ in 0..self.walk_ops {
            idx = unsafe { *base.add(idx as usize) };
            sum = sum.wrapping_add(idx);
        }

        idx = start;
        let begin = Instant::now();
        for _ in 0..self.walk_ops {
            idx = unsafe { *base.add(idx as usize) };
            sum = sum.wrapping_add(idx);
        }
        let elapsed = begin.elapsed();

        sink.absorb(sum);
        elapsed
    }
}

impl Probe for Workspace {
    fn measure(
        &mut self,
        topology: Topology,
        stride: u64,
        spots: u64,
        rng: &mut Lcg,
        sink: &mut Sink,
    ) -> Result<Duration> {
        match topology {
            Topology::ShuffledForward => {
                self.build_shuffled(stride, spots, rng)?;
                if log_enabled!(Level::Debug) {
                    debug!("{}", self.coverage_line(stride, spots));
                }
            }
            Topology::Lookbehind => self.build_lookbehind(stride, spots)?,
        }
        Ok(self.walk(topology.start_offset(stride), sink))
    }
}
