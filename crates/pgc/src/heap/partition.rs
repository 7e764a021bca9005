//! Partition - Fixed-size heap region served by bump allocation
//!
//! A partition is one contiguous anonymous mapping. Blocks are laid out
//! back to back from the base of the mapping up to `top`; the bytes past
//! `top` are unallocated tail. Partitions are never unmapped while the
//! collector lives, so block addresses stay valid until a compaction
//! deliberately moves them.

use memmap2::MmapMut;

use crate::error::{GcError, Result};
use crate::memory::align_up;
use crate::object::header::{BlockHeader, HEADER_SIZE};

/// One fixed-capacity heap region
pub struct Partition {
    map: MmapMut,
    capacity: usize,
    /// Bytes consumed by allocation, from the mapping base
    top: usize,
    /// Scratch cursor used only while planning a compaction
    compact_top: usize,
}

impl Partition {
    /// Map a new partition of at least `capacity` bytes
    ///
    /// The mapping is rounded up to the system page size and starts
    /// zero-filled.
    pub fn new(capacity: usize) -> Result<Self> {
        let len = align_up(capacity, page_size::get());
        let map = MmapMut::map_anon(len).map_err(|source| GcError::OutOfMemory {
            requested: len,
            source,
        })?;

        Ok(Self {
            map,
            capacity: len,
            top: 0,
            compact_top: 0,
        })
    }

    /// Base address of the mapping
    #[inline]
    pub fn base(&self) -> usize {
        self.map.as_ptr() as usize
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed by allocation
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    /// Unallocated bytes at the tail
    #[inline]
    pub fn free_tail(&self) -> usize {
        self.capacity - self.top
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base() && addr < self.base() + self.capacity
    }

    pub(crate) fn set_top(&mut self, top: usize) {
        debug_assert!(top <= self.capacity);
        self.top = top;
    }

    #[inline]
    pub(crate) fn compact_top(&self) -> usize {
        self.compact_top
    }

    pub(crate) fn set_compact_top(&mut self, offset: usize) {
        debug_assert!(offset <= self.capacity);
        self.compact_top = offset;
    }

    /// Carve the next block header out of the tail
    ///
    /// The caller must have checked `free_tail()` first.
    pub(crate) fn bump(&mut self, payload_size: usize) -> *mut BlockHeader {
        debug_assert!(self.free_tail() >= HEADER_SIZE + payload_size);
        let header = (self.base() + self.top) as *mut BlockHeader;
        self.top += HEADER_SIZE + payload_size;
        header
    }

    /// Iterate the blocks laid out in this partition
    ///
    /// The iterator reads each header's `size` field to find the next
    /// block, so headers ahead of the cursor must stay intact while
    /// iterating; mutating already-visited blocks is fine.
    pub fn blocks(&self) -> BlockIter {
        BlockIter {
            cursor: self.base(),
            end: self.base() + self.top,
        }
    }
}

/// Address-order walk over the blocks of one partition
pub struct BlockIter {
    cursor: usize,
    end: usize,
}

impl Iterator for BlockIter {
    type Item = *mut BlockHeader;

    fn next(&mut self) -> Option<*mut BlockHeader> {
        if self.cursor >= self.end {
            return None;
        }
        let header = self.cursor as *mut BlockHeader;
        let size = unsafe { (*header).size };
        self.cursor += HEADER_SIZE + size;
        Some(header)
    }
}
