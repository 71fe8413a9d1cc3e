//! The per-thread execution context.

use smallvec::SmallVec;

use rand::RngExt;
use starling_core::{AgentId, AgentLayout, FaultCode, VariableId};
use starling_msg::{MessageReadHandle, MessageWriteHandle};

use crate::fault::FaultChannel;
use crate::rng::AgentRng;

const EMPTY: &[f32] = &[];

/// One thread's staged birth slot: the newborn's row plus the thread's
/// birth outcome flag entry.
#[derive(Debug)]
pub struct BirthSlot<'a> {
    /// Row slot in the launch's birth staging buffer.
    pub slot: &'a mut [f32],
    /// This thread's entry in the birth outcome flag array.
    pub flag: &'a mut u32,
}

/// Per-thread facade over one agent's data for the duration of a launch.
///
/// Bound to exactly one agent index: read/write access to that agent's own
/// variables only, read-only inbound message iteration, write-once outbound
/// emission, a private random sub-stream, and — when the model enables it —
/// birth staging. Constructed fresh per thread per launch, after the bounds
/// check and never for thread indices at or beyond the population size.
///
/// After this thread reports a runtime-checked fault, its further writes
/// through [`set_scalar`](Self::set_scalar), [`set_var`](Self::set_var),
/// [`emit`](Self::emit), and [`spawn`](Self::spawn) become no-ops; reads
/// and random draws continue to work.
pub struct AgentContext<'a> {
    thread: u32,
    id: AgentId,
    layout: &'a AgentLayout,
    vars: SmallVec<[&'a mut [f32]; 8]>,
    rng: &'a mut AgentRng,
    messages: MessageReadHandle<'a>,
    out: Option<MessageWriteHandle<'a>>,
    birth: Option<BirthSlot<'a>>,
    checks: bool,
    faults: &'a FaultChannel,
    halted: bool,
}

impl<'a> AgentContext<'a> {
    /// Bind a context to one agent's column slices and launch handles.
    ///
    /// Called by the launch wrapper for each in-bounds thread; tests may
    /// construct one directly over small buffers.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thread: u32,
        id: AgentId,
        layout: &'a AgentLayout,
        vars: SmallVec<[&'a mut [f32]; 8]>,
        rng: &'a mut AgentRng,
        messages: MessageReadHandle<'a>,
        out: Option<MessageWriteHandle<'a>>,
        birth: Option<BirthSlot<'a>>,
        checks: bool,
        faults: &'a FaultChannel,
    ) -> Self {
        debug_assert_eq!(vars.len(), layout.len());
        Self {
            thread,
            id,
            layout,
            vars,
            rng,
            messages,
            out,
            birth,
            checks,
            faults,
            halted: false,
        }
    }

    /// This thread's agent index within the launch.
    pub fn index(&self) -> u32 {
        self.thread
    }

    /// The bound agent's identifier.
    pub fn id(&self) -> AgentId {
        self.id
    }

    fn fault(&mut self, code: FaultCode, message: String, origin: &'static str) {
        if self.checks {
            self.faults.raise(self.thread, code, message, origin);
            self.halted = true;
        }
    }

    /// Read one of the bound agent's variables.
    ///
    /// An unknown variable ID raises [`FaultCode::UnknownVariable`] and
    /// reads as empty.
    pub fn var(&mut self, variable: VariableId) -> &[f32] {
        if variable.0 as usize >= self.vars.len() {
            self.fault(
                FaultCode::UnknownVariable,
                format!("variable {variable} is not in the agent layout"),
                concat!(file!(), ":", line!()),
            );
            return EMPTY;
        }
        &self.vars[variable.0 as usize]
    }

    /// The first component of a variable, or 0.0 on an unknown ID.
    pub fn scalar(&mut self, variable: VariableId) -> f32 {
        self.var(variable).first().copied().unwrap_or(0.0)
    }

    /// Overwrite one of the bound agent's variables.
    ///
    /// A no-op after this thread has faulted. Width mismatches raise
    /// [`FaultCode::IndexOutOfBounds`].
    pub fn set_var(&mut self, variable: VariableId, value: &[f32]) {
        if self.halted {
            return;
        }
        match self.vars.get_mut(variable.0 as usize) {
            Some(slot) if slot.len() == value.len() => slot.copy_from_slice(value),
            Some(slot) => {
                let expected = slot.len();
                self.fault(
                    FaultCode::IndexOutOfBounds,
                    format!(
                        "variable {variable} has {expected} components, got {}",
                        value.len()
                    ),
                    concat!(file!(), ":", line!()),
                );
            }
            None => {
                self.fault(
                    FaultCode::UnknownVariable,
                    format!("variable {variable} is not in the agent layout"),
                    concat!(file!(), ":", line!()),
                );
            }
        }
    }

    /// Overwrite the first component of a variable.
    pub fn set_scalar(&mut self, variable: VariableId, value: f32) {
        if self.halted {
            return;
        }
        match self.vars.get_mut(variable.0 as usize) {
            Some(slot) if !slot.is_empty() => slot[0] = value,
            _ => self.fault(
                FaultCode::UnknownVariable,
                format!("variable {variable} is not in the agent layout"),
                concat!(file!(), ":", line!()),
            ),
        }
    }

    /// The inbound message handle bound to this launch.
    pub fn messages(&self) -> &MessageReadHandle<'a> {
        &self.messages
    }

    /// Emit this agent's outbound message.
    ///
    /// At most one emission per launch is honored: a second call raises
    /// [`FaultCode::DuplicateEmission`] (with runtime checks disabled the
    /// last write wins). Emitting from a function with no outbound binding
    /// raises [`FaultCode::UnknownMessage`].
    pub fn emit(&mut self, payload: &[f32]) {
        if self.halted {
            return;
        }
        let Some(out) = self.out.as_mut() else {
            self.fault(
                FaultCode::UnknownMessage,
                "message output is not enabled for this agent function".into(),
                concat!(file!(), ":", line!()),
            );
            return;
        };
        match out.emit(payload) {
            Ok(()) => {}
            Err(starling_msg::EmitError::AlreadyEmitted) => self.fault(
                FaultCode::DuplicateEmission,
                "agent emitted a second message this launch".into(),
                concat!(file!(), ":", line!()),
            ),
            Err(starling_msg::EmitError::WidthMismatch { got, expected }) => self.fault(
                FaultCode::IndexOutOfBounds,
                format!("payload width {got} does not match message width {expected}"),
                concat!(file!(), ":", line!()),
            ),
        }
    }

    /// Stage a newborn agent with the given initial variable values (full
    /// layout row) and raise this thread's birth flag.
    ///
    /// Raises [`FaultCode::BirthNotEnabled`] if the model did not enable
    /// agent output for this function.
    pub fn spawn(&mut self, row: &[f32]) {
        if self.halted {
            return;
        }
        let Some(birth) = self.birth.as_mut() else {
            self.fault(
                FaultCode::BirthNotEnabled,
                "agent output is not enabled for this agent function".into(),
                concat!(file!(), ":", line!()),
            );
            return;
        };
        if row.len() != birth.slot.len() {
            let expected = birth.slot.len();
            self.fault(
                FaultCode::IndexOutOfBounds,
                format!("birth row width {} does not match layout width {expected}", row.len()),
                concat!(file!(), ":", line!()),
            );
            return;
        }
        birth.slot.copy_from_slice(row);
        *birth.flag = 1;
    }

    /// This thread's private random sub-stream.
    pub fn rng(&mut self) -> &mut AgentRng {
        self.rng
    }

    /// A uniform draw in `[0, 1)` from the private sub-stream.
    pub fn random(&mut self) -> f32 {
        self.rng.random()
    }

    /// Returns `true` if this thread has reported a fault and halted its
    /// own writes.
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}
