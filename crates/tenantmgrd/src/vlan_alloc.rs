//! VLAN id allocation.
//!
//! [`VlanBitmap`] tracks which ids of a bounded range are taken and hands out
//! the lowest free one. The fabric is the source of truth, so the bitmap is
//! rebuilt from the observed VLAN inventory before every allocation.
//! [`VlanAllocator`] wraps it in an async mutex that the caller holds from
//! the rescan until the new VLAN has been created on the fabric.

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{TenantMgrError, TenantMgrResult};

/// Lowest VLAN id handed out by default.
pub const DEFAULT_MIN_VLAN_ID: u16 = 1;

/// Highest VLAN id handed out by default.
pub const DEFAULT_MAX_VLAN_ID: u16 = 256;

/// Highest id the 802.1Q header can carry for a usable VLAN.
pub const MAX_VALID_VLAN_ID: u16 = 4094;

const WORD_BITS: usize = 64;

/// Bitmap over the inclusive id range `[min, max]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanBitmap {
    min: u16,
    max: u16,
    words: Vec<u64>,
}

impl VlanBitmap {
    /// Creates an empty bitmap; rejects an empty or out-of-range span.
    pub fn new(min: u16, max: u16) -> TenantMgrResult<Self> {
        if min == 0 || min > max || max > MAX_VALID_VLAN_ID {
            return Err(TenantMgrError::Config(format!(
                "VLAN range [{}, {}] must satisfy 1 <= min <= max <= {}",
                min, max, MAX_VALID_VLAN_ID
            )));
        }
        let span = usize::from(max - min) + 1;
        Ok(Self {
            min,
            max,
            words: vec![0; span.div_ceil(WORD_BITS)],
        })
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    fn slot(&self, id: u16) -> Option<(usize, u64)> {
        if id < self.min || id > self.max {
            return None;
        }
        let offset = usize::from(id - self.min);
        Some((offset / WORD_BITS, 1u64 << (offset % WORD_BITS)))
    }

    pub fn is_used(&self, id: u16) -> bool {
        self.slot(id)
            .is_some_and(|(word, bit)| self.words[word] & bit != 0)
    }

    /// Marks an id as taken. Returns false if it is outside the range.
    pub fn mark_used(&mut self, id: u16) -> bool {
        match self.slot(id) {
            Some((word, bit)) => {
                self.words[word] |= bit;
                true
            }
            None => false,
        }
    }

    /// Frees an id. Returns true if it was taken.
    pub fn release(&mut self, id: u16) -> bool {
        match self.slot(id) {
            Some((word, bit)) => {
                let was_used = self.words[word] & bit != 0;
                self.words[word] &= !bit;
                was_used
            }
            None => false,
        }
    }

    /// Replaces the bitmap contents with the observed ids.
    ///
    /// Ids outside the range are ignored.
    pub fn resync(&mut self, observed: impl IntoIterator<Item = u16>) {
        self.words.iter_mut().for_each(|w| *w = 0);
        for id in observed {
            self.mark_used(id);
        }
    }

    /// Lowest free id, without taking it.
    pub fn lowest_free(&self) -> Option<u16> {
        (self.min..=self.max).find(|id| !self.is_used(*id))
    }

    /// Takes and returns the lowest free id.
    pub fn allocate(&mut self) -> TenantMgrResult<u16> {
        let id = self.lowest_free().ok_or(TenantMgrError::VlanExhausted {
            min: self.min,
            max: self.max,
        })?;
        self.mark_used(id);
        Ok(id)
    }

    pub fn used_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Process-wide VLAN allocator.
#[derive(Debug)]
pub struct VlanAllocator {
    bitmap: Mutex<VlanBitmap>,
}

impl VlanAllocator {
    pub fn new(min: u16, max: u16) -> TenantMgrResult<Self> {
        Ok(Self {
            bitmap: Mutex::new(VlanBitmap::new(min, max)?),
        })
    }

    /// Locks the bitmap.
    ///
    /// Hold the guard across rescan, allocation and VLAN creation so that
    /// two cycles never pick the same id.
    pub async fn lock(&self) -> MutexGuard<'_, VlanBitmap> {
        self.bitmap.lock().await
    }
}

impl Default for VlanAllocator {
    fn default() -> Self {
        Self {
            bitmap: Mutex::new(VlanBitmap {
                min: DEFAULT_MIN_VLAN_ID,
                max: DEFAULT_MAX_VLAN_ID,
                words: vec![0; usize::from(DEFAULT_MAX_VLAN_ID).div_ceil(WORD_BITS)],
            }),
        }
    }
}
