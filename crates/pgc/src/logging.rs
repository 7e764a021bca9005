//! Event Logging - Diagnostic event stream
//!
//! Every observable collector action can be reported as a [`GcEvent`] to a
//! pluggable [`EventSink`]. The stream is silent unless enabled through
//! `GcConfig::trace` or an explicit sink installation.
//!
//! Event granularity:
//! - cycle level: `CycleStart`, `CycleEnd`
//! - partition level: `PartitionCreated`
//! - block level: `BlockAllocated`, `BlockMarked`, `BlockRelocated`,
//!   `BlockFinalized`
//! - slot level: `ReferenceUpdated`

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Diagnostic event emitted by the collector
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEvent {
    /// A new partition was mapped
    PartitionCreated { addr: usize, size: usize },

    /// A block was handed to the host (payload address, payload size)
    BlockAllocated { addr: usize, size: usize },

    /// A block was found reachable during marking
    BlockMarked { addr: usize, size: usize },

    /// A live block moved during compaction (payload addresses)
    BlockRelocated { src: usize, dst: usize },

    /// A reference slot was rewritten to a forwarded address
    ReferenceUpdated { slot: usize, old: usize, new: usize },

    /// A dead block's finalizer ran
    BlockFinalized { addr: usize },

    /// A collection cycle began
    CycleStart { cycle: u64, mode: &'static str },

    /// A collection cycle completed
    CycleEnd {
        cycle: u64,
        live_blocks: u64,
        reclaimed_bytes: u64,
    },
}

/// Receiver for the diagnostic event stream
pub trait EventSink {
    fn emit(&mut self, event: &GcEvent);
}

/// Sink that prints events to stdout, human-readable or as JSON lines
pub struct ConsoleSink {
    /// Emit one JSON object per line instead of the human format
    pub json: bool,
    /// Prefix each line with a wall-clock timestamp
    pub timestamps: bool,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            json: false,
            timestamps: true,
        }
    }
}

impl ConsoleSink {
    fn print_human(event: &GcEvent) {
        match event {
            GcEvent::PartitionCreated { addr, size } => {
                println!("[gc] partition created at {:#x} ({} bytes)", addr, size);
            },
            GcEvent::BlockAllocated { addr, size } => {
                println!("[gc] block allocated at {:#x} ({} bytes)", addr, size);
            },
            GcEvent::BlockMarked { addr, size } => {
                println!("[gc] block marked at {:#x} ({} bytes)", addr, size);
            },
            GcEvent::BlockRelocated { src, dst } => {
                println!("[gc] block relocated {:#x} -> {:#x}", src, dst);
            },
            GcEvent::ReferenceUpdated { slot, old, new } => {
                println!(
                    "[gc] reference at {:#x} updated {:#x} -> {:#x}",
                    slot, old, new
                );
            },
            GcEvent::BlockFinalized { addr } => {
                println!("[gc] block finalized at {:#x}", addr);
            },
            GcEvent::CycleStart { cycle, mode } => {
                println!("[gc] cycle {} started ({})", cycle, mode);
            },
            GcEvent::CycleEnd {
                cycle,
                live_blocks,
                reclaimed_bytes,
            } => {
                println!(
                    "[gc] cycle {} completed ({} live blocks, {} bytes reclaimed)",
                    cycle, live_blocks, reclaimed_bytes
                );
            },
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: &GcEvent) {
        if self.timestamps {
            let now = chrono::Local::now();
            print!("[{}] ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        }

        if self.json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{}", line);
            }
        } else {
            Self::print_human(event);
        }
    }
}

/// Sink that drops every event
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &GcEvent) {}
}

/// Sink that records events in memory, for tests and tooling
///
/// Cloning the sink clones a handle to the same buffer, so a test can keep
/// one handle while the collector owns the other.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<GcEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GcEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Gatekeeper in front of the configured sink
///
/// Owned by the collector; every emission site goes through [`emit`], which
/// is a no-op when the stream is disabled.
///
/// [`emit`]: GcLogger::emit
pub struct GcLogger {
    enabled: bool,
    sink: Box<dyn EventSink>,
}

impl GcLogger {
    pub fn new(enabled: bool, sink: Box<dyn EventSink>) -> Self {
        Self { enabled, sink }
    }

    /// Logger that never constructs or delivers events
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            sink: Box::new(NullSink),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn emit(&mut self, event: GcEvent) {
        if self.enabled {
            self.sink.emit(&event);
        }
    }
}
