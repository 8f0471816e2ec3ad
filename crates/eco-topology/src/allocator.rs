//! Priority Band Allocator
//!
//! Issues listener-rule priorities grouped into bands. The first call for a
//! band returns the band start, every later call the previous value plus
//! one. Bands never interact, and issued values are never handed out again:
//! the counter only moves forward.
//!
//! The allocator guarantees uniqueness *within* a band. Keeping bands from
//! overlapping is the caller's job (the assembler checks it before anything
//! is built).

use eco_config::MAX_RULE_PRIORITY;
use serde::Serialize;
use std::collections::BTreeMap;

/// Allocation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Priorities start at 1
    #[error("band start {0} is not a valid priority")]
    InvalidBand(u32),

    /// The band already issued `capacity` priorities
    #[error("band {band_start} exhausted after {capacity} priorities")]
    BandExhausted { band_start: u32, capacity: u32 },

    /// Next priority would pass the listener ceiling
    #[error("band {band_start} would issue {priority}, above the ceiling {max_priority}")]
    CeilingExceeded {
        band_start: u32,
        priority: u32,
        max_priority: u32,
    },
}

/// Last issued priority per band start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBandState {
    last_issued: BTreeMap<u32, u32>,
}

impl PriorityBandState {
    /// Last priority issued in `band_start`, if any
    #[inline]
    #[must_use]
    pub fn last_issued(&self, band_start: u32) -> Option<u32> {
        self.last_issued.get(&band_start).copied()
    }

    /// Bands touched so far, ascending
    pub fn bands(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.last_issued.iter().map(|(&b, &l)| (b, l))
    }

    /// Number of bands touched so far
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.last_issued.len()
    }

    /// Whether no priority was issued yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_issued.is_empty()
    }
}

/// Monotonic per-band priority counter
///
/// One instance per build run, passed by `&mut` to every router call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityBandAllocator {
    state: PriorityBandState,
    band_capacity: u32,
    max_priority: u32,
}

impl PriorityBandAllocator {
    /// Create an allocator issuing at most `band_capacity` priorities per band
    /// and never above `max_priority`
    #[must_use]
    pub fn new(band_capacity: u32, max_priority: u32) -> Self {
        Self {
            state: PriorityBandState::default(),
            band_capacity,
            max_priority,
        }
    }

    /// Per-band capacity
    #[inline]
    #[must_use]
    pub fn band_capacity(&self) -> u32 {
        self.band_capacity
    }

    /// Highest priority ever issued
    #[inline]
    #[must_use]
    pub fn max_priority(&self) -> u32 {
        self.max_priority
    }

    /// Next priority in `band_start`
    ///
    /// Must be called exactly once per routing rule: there is no dedup
    /// memory, a second call always yields a new value.
    pub fn next_priority(&mut self, band_start: u32) -> Result<u32, AllocationError> {
        if band_start == 0 {
            return Err(AllocationError::InvalidBand(band_start));
        }

        let next = match self.state.last_issued(band_start) {
            None => band_start,
            Some(last) => {
                let issued = last - band_start + 1;
                if issued >= self.band_capacity {
                    return Err(AllocationError::BandExhausted {
                        band_start,
                        capacity: self.band_capacity,
                    });
                }
                last.checked_add(1).ok_or(AllocationError::CeilingExceeded {
                    band_start,
                    priority: u32::MAX,
                    max_priority: self.max_priority,
                })?
            }
        };
        if self.band_capacity == 0 {
            return Err(AllocationError::BandExhausted {
                band_start,
                capacity: 0,
            });
        }
        if next > self.max_priority {
            return Err(AllocationError::CeilingExceeded {
                band_start,
                priority: next,
                max_priority: self.max_priority,
            });
        }

        self.state.last_issued.insert(band_start, next);
        tracing::debug!("Issued priority {} in band {}", next, band_start);
        Ok(next)
    }

    /// Last priority issued in `band_start`, if any
    #[inline]
    #[must_use]
    pub fn last_issued(&self, band_start: u32) -> Option<u32> {
        self.state.last_issued(band_start)
    }

    /// Snapshot of every band's counter
    #[inline]
    #[must_use]
    pub fn state(&self) -> &PriorityBandState {
        &self.state
    }
}

impl Default for PriorityBandAllocator {
    /// No per-band cap beyond the listener ceiling
    fn default() -> Self {
        Self::new(MAX_RULE_PRIORITY, MAX_RULE_PRIORITY)
    }
}
