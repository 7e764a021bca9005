//! Block Header - Metadata for managed blocks
//!
//! Block Layout (64-bit):
//! ┌─────────────────────────────────────────┐
//! │         Size (8 bytes)                  │  <- payload bytes, word multiple
//! ├─────────────────────────────────────────┤
//! │         GC Word (8 bytes)               │  <- mark flag / forwarding ptr
//! ├─────────────────────────────────────────┤
//! │      Descriptor (8 bytes)               │  <- Option<&ObjectDescriptor>
//! ├─────────────────────────────────────────┤
//! │         Payload (size bytes)            │  <- handed to the host
//! └─────────────────────────────────────────┘
//!
//! The GC word is a single overloaded slot:
//! - `0` between collections (live, unmarked)
//! - `1` during marking (reachable)
//! - a forwarding header address during compaction planning (reachable;
//!   a real address is never `0` or `1`, so the encodings cannot collide)
//! - `usize::MAX` for a sweep-mode free-list block

use crate::memory::align_up;
use crate::object::ObjectDescriptor;

/// Size of the block header in bytes (24 on 64-bit)
pub const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

/// Pointer size; every payload size is rounded up to a multiple of this
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// GC word value of a live block between collections
pub const GC_WORD_CLEAR: usize = 0;

/// GC word value of a reachable block during marking
pub const GC_WORD_MARKED: usize = 1;

/// GC word tag for a sweep-mode free-list block
pub const GC_WORD_FREE: usize = usize::MAX;

/// Block Header
///
/// Every managed block starts with this header; the payload follows
/// immediately. The payload pointer handed to the host is
/// `header address + HEADER_SIZE`, so the header can always be recovered
/// from a payload pointer by a fixed negative offset.
#[repr(C)]
pub struct BlockHeader {
    /// Payload size in bytes; nonzero multiple of `WORD_SIZE`
    pub size: usize,
    /// Overloaded mark flag / forwarding pointer / free tag
    pub gc_word: usize,
    /// Per-type callbacks; `None` means no references and silent reclamation
    pub descriptor: Option<&'static ObjectDescriptor>,
}

impl BlockHeader {
    /// Address of this block's payload
    #[inline]
    pub fn payload(&self) -> *mut u8 {
        (self as *const BlockHeader as usize + HEADER_SIZE) as *mut u8
    }

    /// Total footprint of the block, header included
    #[inline]
    pub fn footprint(&self) -> usize {
        HEADER_SIZE + self.size
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.gc_word != GC_WORD_CLEAR
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.gc_word == GC_WORD_FREE
    }

    /// Forwarding destination recorded during compaction planning
    #[inline]
    pub fn forwarding(&self) -> *mut BlockHeader {
        self.gc_word as *mut BlockHeader
    }
}

/// Recover the header from a payload pointer
///
/// # Safety
/// `payload` must point to the first byte of a managed payload.
#[inline]
pub unsafe fn header_of(payload: *mut u8) -> *mut BlockHeader {
    payload.sub(HEADER_SIZE) as *mut BlockHeader
}

/// Round a requested payload size up to the block granularity
///
/// Zero-byte requests round up to one word so that every block occupies
/// space and every payload address is distinct.
#[inline]
pub fn round_payload_size(size: usize) -> usize {
    if size == 0 {
        WORD_SIZE
    } else {
        align_up(size, WORD_SIZE)
    }
}
