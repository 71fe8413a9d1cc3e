//! The single-slot fault channel.

use starling_core::{FaultCode, FaultRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Fixed-capacity channel through which any thread of a launch reports a
/// runtime-checked fault without crashing the whole batch.
///
/// The slot is guarded by an atomic claim: the first reporter wins and
/// writes the record; later violators' reports are discarded (their
/// threads still halt their own further writes). The host drains and
/// clears the slot after the launch completes.
#[derive(Debug, Default)]
pub struct FaultChannel {
    claimed: AtomicBool,
    slot: Mutex<Option<FaultRecord>>,
}

impl FaultChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fault. Returns `true` if this report won the slot.
    pub fn raise(
        &self,
        thread: u32,
        code: FaultCode,
        message: String,
        origin: &'static str,
    ) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let record = FaultRecord {
            thread,
            code,
            message,
            origin,
        };
        *self.slot.lock().expect("fault slot poisoned") = Some(record);
        true
    }

    /// Returns `true` if a fault has been claimed.
    pub fn is_raised(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Drain the recorded fault, clearing the channel for the next launch.
    /// Host-side only; must not race a launch in flight.
    pub fn take(&self) -> Option<FaultRecord> {
        let record = self.slot.lock().expect("fault slot poisoned").take();
        self.claimed.store(false, Ordering::Release);
        record
    }
}
