//! Object Model - Descriptors and the tracing contract
//!
//! The host describes each object type with an [`ObjectDescriptor`]: a
//! `trace` callback that enumerates the object's outbound references, and a
//! `finalize` callback run once when the object is reclaimed. The same
//! `trace` callback serves two collection roles: during marking the
//! supplied operation marks each child, and during compaction it rewrites
//! each reference slot to the child's new address.

pub mod header;

pub use header::{header_of, round_payload_size, BlockHeader, HEADER_SIZE, WORD_SIZE};

/// Operation the collector applies to each enumerated reference slot.
///
/// A trace callback receives one of these and must invoke it with the
/// **address of every reference slot** inside the payload, exactly once
/// per slot. Slots must hold either null or a pointer to the first byte
/// of a live managed payload.
pub type TraceOp<'a> = &'a mut dyn FnMut(*mut *mut u8);

/// Per-type reference enumerator supplied by the host.
///
/// Must not allocate, must not trigger collection, and must be idempotent
/// under repeated invocation with the same operation.
pub type TraceFn = fn(payload: *mut u8, op: TraceOp<'_>);

/// Per-type reclamation hook supplied by the host.
///
/// Runs exactly once, after the object has become unreachable. The payload
/// bytes are intact but any managed references inside them are stale by
/// the time this runs; treat the payload as opaque bytes and release only
/// external resources. Must not allocate or trigger collection.
pub type FinalizeFn = fn(payload: *mut u8);

/// Per-type callback descriptor
///
/// Stored by reference in every block header; host programs declare one
/// `static` descriptor per object type.
///
/// # Examples
///
/// ```rust
/// use pgc::{ObjectDescriptor, TraceOp};
///
/// // An object whose first word is a reference to another managed object.
/// fn trace_single_ref(payload: *mut u8, op: TraceOp<'_>) {
///     op(payload as *mut *mut u8);
/// }
///
/// static SINGLE_REF: ObjectDescriptor = ObjectDescriptor {
///     trace: Some(trace_single_ref),
///     finalize: None,
/// };
/// ```
#[derive(Clone, Copy)]
pub struct ObjectDescriptor {
    /// Enumerates outbound references; `None` means the object holds none.
    pub trace: Option<TraceFn>,
    /// Releases external resources on reclamation; `None` means silent.
    pub finalize: Option<FinalizeFn>,
}

impl std::fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDescriptor")
            .field("trace", &self.trace.is_some())
            .field("finalize", &self.finalize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_noop(_payload: *mut u8, _op: TraceOp<'_>) {}

    #[test]
    fn test_descriptor_debug() {
        let desc = ObjectDescriptor {
            trace: Some(trace_noop),
            finalize: None,
        };
        let repr = format!("{:?}", desc);
        assert!(repr.contains("trace: true"));
        assert!(repr.contains("finalize: false"));
    }

    #[test]
    fn test_trace_op_invocation() {
        let mut seen: Vec<usize> = Vec::new();
        let mut op = |slot: *mut *mut u8| seen.push(slot as usize);

        let mut fake_slot: *mut u8 = std::ptr::null_mut();
        let slot_addr = &mut fake_slot as *mut *mut u8;

        fn trace_one(payload: *mut u8, op: TraceOp<'_>) {
            op(payload as *mut *mut u8);
        }
        trace_one(slot_addr as *mut u8, &mut op);

        assert_eq!(seen, vec![slot_addr as usize]);
    }
}
