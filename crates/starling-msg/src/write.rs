//! Device-side outbound message emission.

use std::error::Error;
use std::fmt;

/// Errors from an emission call, surfaced by the execution context as
/// runtime-checked faults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitError {
    /// The agent already emitted a message in this launch. The slot is
    /// overwritten anyway, so with runtime checks disabled the last write
    /// wins; with checks enabled the launch faults.
    AlreadyEmitted,
    /// The payload width does not match the message definition.
    WidthMismatch {
        /// Supplied payload width.
        got: usize,
        /// Width the message definition requires.
        expected: usize,
    },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyEmitted => write!(f, "message already emitted this launch"),
            Self::WidthMismatch { got, expected } => {
                write!(f, "payload width {got} does not match message width {expected}")
            }
        }
    }
}

impl Error for EmitError {}

/// Write-once-per-agent handle over one thread's outbound staging slot.
///
/// Emission copies the payload into the slot and, when the launch's
/// message output is optional, raises the thread's message-emitted flag so
/// the host-side compaction keeps the slot.
#[derive(Debug)]
pub struct MessageWriteHandle<'a> {
    slot: &'a mut [f32],
    flag: Option<&'a mut u32>,
    emitted: bool,
}

impl<'a> MessageWriteHandle<'a> {
    /// Bind a handle to one thread's staging slot and optional flag entry.
    pub fn bind(slot: &'a mut [f32], flag: Option<&'a mut u32>) -> Self {
        Self {
            slot,
            flag,
            emitted: false,
        }
    }

    /// Emit a message with the given payload.
    ///
    /// At most one emission per agent per launch is honored; a second call
    /// overwrites the slot and reports [`EmitError::AlreadyEmitted`] for
    /// the context to raise as a fault.
    pub fn emit(&mut self, payload: &[f32]) -> Result<(), EmitError> {
        if payload.len() != self.slot.len() {
            return Err(EmitError::WidthMismatch {
                got: payload.len(),
                expected: self.slot.len(),
            });
        }
        self.slot.copy_from_slice(payload);
        if let Some(flag) = self.flag.as_deref_mut() {
            *flag = 1;
        }
        if self.emitted {
            return Err(EmitError::AlreadyEmitted);
        }
        self.emitted = true;
        Ok(())
    }

    /// Returns `true` if this thread has emitted.
    pub fn has_emitted(&self) -> bool {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_fills_slot_and_raises_flag() {
        let mut slot = [0.0f32; 3];
        let mut flag = 0u32;
        let mut handle = MessageWriteHandle::bind(&mut slot, Some(&mut flag));
        handle.emit(&[1.0, 2.0, 3.0]).unwrap();
        assert!(handle.has_emitted());
        drop(handle);
        assert_eq!(slot, [1.0, 2.0, 3.0]);
        assert_eq!(flag, 1);
    }

    #[test]
    fn non_emitting_thread_leaves_flag_clear() {
        let mut slot = [0.0f32; 3];
        let mut flag = 0u32;
        let handle = MessageWriteHandle::bind(&mut slot, Some(&mut flag));
        assert!(!handle.has_emitted());
        drop(handle);
        assert_eq!(flag, 0);
    }

    #[test]
    fn second_emit_reports_and_overwrites() {
        let mut slot = [0.0f32; 2];
        let mut handle = MessageWriteHandle::bind(&mut slot, None);
        handle.emit(&[1.0, 2.0]).unwrap();
        let err = handle.emit(&[3.0, 4.0]).unwrap_err();
        assert_eq!(err, EmitError::AlreadyEmitted);
        // Last write wins in the slot itself.
        drop(handle);
        assert_eq!(slot, [3.0, 4.0]);
    }

    #[test]
    fn width_mismatch_rejected_without_side_effects() {
        let mut slot = [0.0f32; 2];
        let mut flag = 0u32;
        let mut handle = MessageWriteHandle::bind(&mut slot, Some(&mut flag));
        let err = handle.emit(&[1.0]).unwrap_err();
        assert!(matches!(err, EmitError::WidthMismatch { got: 1, expected: 2 }));
        assert!(!handle.has_emitted());
        drop(handle);
        assert_eq!(flag, 0);
    }
}
