//! Heap Module - Partition chain and allocation paths
//!
//! The heap owns a chain of fixed-size partitions ordered by creation age.
//! Allocation bumps out of the `active` partition; when its tail cannot
//! hold the next block the chain advances to an existing successor or maps
//! a fresh partition. Partitions are never unmapped; collections make
//! their space reusable, and `active` may move backward afterwards.
//!
//! In sweep mode the heap additionally keeps size-classed free lists of
//! reclaimed blocks, consulted before any bump allocation.

pub mod partition;

pub use partition::{BlockIter, Partition};

use crate::error::{GcError, Result};
use crate::logging::{GcEvent, GcLogger};
use crate::memory::zero_memory;
use crate::object::header::{BlockHeader, GC_WORD_CLEAR, GC_WORD_FREE, HEADER_SIZE, WORD_SIZE};
use crate::object::ObjectDescriptor;
use crate::stats::GcStats;

/// Number of free-list size classes (sweep mode)
pub const SIZE_CLASS_COUNT: usize = 16;

/// Upper payload bound of the smallest size class
const SMALLEST_CLASS_LIMIT: usize = 32;

/// Size-classed free lists over reclaimed blocks
///
/// Bins hold header addresses; classes double from
/// `SMALLEST_CLASS_LIMIT` upward, with the last bin open-ended. Rebuilt
/// from scratch by every sweep.
pub(crate) struct FreeLists {
    bins: [Vec<usize>; SIZE_CLASS_COUNT],
}

impl FreeLists {
    fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| Vec::new()),
        }
    }

    fn class_of(size: usize) -> usize {
        let mut class = 0;
        let mut limit = SMALLEST_CLASS_LIMIT;
        while class + 1 < SIZE_CLASS_COUNT && size > limit {
            class += 1;
            limit <<= 1;
        }
        class
    }

    pub(crate) fn clear(&mut self) {
        for bin in &mut self.bins {
            bin.clear();
        }
    }

    pub(crate) fn push(&mut self, header: *mut BlockHeader) {
        let size = unsafe { (*header).size };
        debug_assert!(unsafe { (*header).gc_word } == GC_WORD_FREE);
        self.bins[Self::class_of(size)].push(header as usize);
    }

    /// Pop the first free block whose payload can hold `payload_size`
    pub(crate) fn take_fit(&mut self, payload_size: usize) -> Option<*mut BlockHeader> {
        for class in Self::class_of(payload_size)..SIZE_CLASS_COUNT {
            let bin = &mut self.bins[class];
            let found = bin
                .iter()
                .position(|&addr| unsafe { (*(addr as *const BlockHeader)).size } >= payload_size);
            if let Some(pos) = found {
                return Some(bin.swap_remove(pos) as *mut BlockHeader);
            }
        }
        None
    }

    pub(crate) fn block_count(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }
}

/// The managed heap: partition chain plus free lists
pub struct Heap {
    partitions: Vec<Partition>,
    /// Index of the partition currently serving bump allocations
    active: usize,
    partition_size: usize,
    free_lists: FreeLists,
}

impl Heap {
    /// Create an empty heap; the first partition is mapped lazily by the
    /// first allocation that needs it.
    pub fn new(partition_size: usize) -> Self {
        Self {
            partitions: Vec::new(),
            active: 0,
            partition_size,
            free_lists: FreeLists::new(),
        }
    }

    /// Partition chain in age order, oldest first
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub(crate) fn partitions_mut(&mut self) -> &mut [Partition] {
        &mut self.partitions
    }

    /// Index of the partition currently serving allocations
    pub fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn set_active(&mut self, index: usize) {
        debug_assert!(self.partitions.is_empty() || index < self.partitions.len());
        self.active = index;
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Bytes consumed by blocks across all partitions, free blocks included
    pub fn used_bytes(&self) -> usize {
        self.partitions.iter().map(Partition::top).sum()
    }

    pub fn free_list_blocks(&self) -> usize {
        self.free_lists.block_count()
    }

    pub(crate) fn clear_free_lists(&mut self) {
        self.free_lists.clear();
    }

    pub(crate) fn push_free(&mut self, header: *mut BlockHeader) {
        self.free_lists.push(header);
    }

    /// Guarantee the active partition can hold one more block of
    /// `payload_size` bytes
    ///
    /// Advances `active` past partitions whose tail is too small; the
    /// skipped tail is not recorded as free space, only a collection
    /// reclaims it. Maps a fresh partition when no successor exists.
    pub(crate) fn ensure_capacity(
        &mut self,
        payload_size: usize,
        logger: &mut GcLogger,
        stats: &mut GcStats,
    ) -> Result<()> {
        let needed = HEADER_SIZE + payload_size;
        if needed > self.partition_size {
            return Err(GcError::AllocationTooLarge {
                requested: payload_size,
                limit: self.partition_size - HEADER_SIZE,
            });
        }

        if self.partitions.is_empty() {
            self.grow(logger, stats)?;
        }

        while self.partitions[self.active].free_tail() < needed {
            if self.active + 1 < self.partitions.len() {
                self.active += 1;
            } else {
                self.grow(logger, stats)?;
                self.active = self.partitions.len() - 1;
            }
        }

        Ok(())
    }

    fn grow(&mut self, logger: &mut GcLogger, stats: &mut GcStats) -> Result<()> {
        let partition = Partition::new(self.partition_size)?;
        log::debug!(
            "mapped partition {} at {:#x} ({} bytes)",
            self.partitions.len(),
            partition.base(),
            partition.capacity()
        );
        logger.emit(GcEvent::PartitionCreated {
            addr: partition.base(),
            size: partition.capacity(),
        });
        stats.record_partition();
        self.partitions.push(partition);
        Ok(())
    }

    /// Bump a zeroed block out of the active partition
    ///
    /// The caller must have run `ensure_capacity` first.
    pub(crate) fn bump_block(
        &mut self,
        payload_size: usize,
        descriptor: Option<&'static ObjectDescriptor>,
    ) -> *mut u8 {
        let header = self.partitions[self.active].bump(payload_size);
        unsafe {
            (*header).size = payload_size;
            (*header).gc_word = GC_WORD_CLEAR;
            (*header).descriptor = descriptor;
            let payload = (*header).payload();
            zero_memory(payload as usize, payload_size);
            payload
        }
    }

    /// Reuse a swept block that fits `payload_size`, if any
    ///
    /// Splits the block when the remainder can hold a header plus one
    /// word; the split-off tail goes back on the free lists so the
    /// partition stays gap-free.
    pub(crate) fn alloc_from_free_list(
        &mut self,
        payload_size: usize,
        descriptor: Option<&'static ObjectDescriptor>,
    ) -> Option<*mut u8> {
        let header = self.free_lists.take_fit(payload_size)?;
        unsafe {
            let block_size = (*header).size;
            debug_assert!(block_size >= payload_size);

            let remainder = block_size - payload_size;
            if remainder >= HEADER_SIZE + WORD_SIZE {
                (*header).size = payload_size;
                let rest =
                    (header as usize + HEADER_SIZE + payload_size) as *mut BlockHeader;
                (*rest).size = remainder - HEADER_SIZE;
                (*rest).gc_word = GC_WORD_FREE;
                (*rest).descriptor = None;
                self.free_lists.push(rest);
            }

            (*header).gc_word = GC_WORD_CLEAR;
            (*header).descriptor = descriptor;
            let payload = (*header).payload();
            zero_memory(payload as usize, (*header).size);
            Some(payload)
        }
    }

    /// Walk every partition and assert the block layout is intact:
    /// contiguous blocks with nonzero word-multiple sizes landing exactly
    /// on each partition's allocation top, and no mark or forwarding
    /// residue outside a collection cycle.
    pub fn verify(&self) {
        for (index, partition) in self.partitions.iter().enumerate() {
            let mut cursor = 0usize;
            while cursor < partition.top() {
                let header = (partition.base() + cursor) as *const BlockHeader;
                let size = unsafe { (*header).size };
                assert!(
                    size > 0,
                    "partition {}: zero-size block at offset {}",
                    index,
                    cursor
                );
                assert_eq!(
                    size % WORD_SIZE,
                    0,
                    "partition {}: misaligned block size {} at offset {}",
                    index,
                    size,
                    cursor
                );
                let gc_word = unsafe { (*header).gc_word };
                assert!(
                    gc_word == GC_WORD_CLEAR || gc_word == GC_WORD_FREE,
                    "partition {}: stale GC word {:#x} at offset {}",
                    index,
                    gc_word,
                    cursor
                );
                cursor += HEADER_SIZE + size;
            }
            assert_eq!(
                cursor,
                partition.top(),
                "partition {}: block walk must land exactly on the allocation top",
                index
            );
        }
        assert!(self.partitions.is_empty() || self.active < self.partitions.len());
    }
}
