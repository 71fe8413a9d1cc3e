//! The user-supplied agent transition function trait.

use crate::context::AgentContext;
use starling_core::AgentStatus;

/// Per-agent transition logic, invoked once per agent per launch.
///
/// # Contract
///
/// - `run()` receives a context bound to exactly one agent and may touch
///   only that agent's variables, its private random stream, and the
///   message handles the launch bound.
/// - Implementations are `&self` and stateless; mutable state lives in
///   agent variables. The same function value is shared by every thread
///   of a launch.
/// - Returning [`AgentStatus::Dead`] removes the agent — but only if the
///   model enabled death handling for this function; otherwise the launch
///   faults when runtime checks are on.
///
/// # Object safety
///
/// The trait is object-safe; the engine stores functions as
/// `Box<dyn AgentFunction>`.
///
/// # Examples
///
/// A function that drains energy and dies at zero:
///
/// ```
/// use starling_exec::{AgentContext, AgentFunction};
/// use starling_core::{AgentStatus, VariableId};
///
/// struct Decay {
///     energy: VariableId,
/// }
///
/// impl AgentFunction for Decay {
///     fn name(&self) -> &str { "decay" }
///
///     fn run(&self, ctx: &mut AgentContext<'_>) -> AgentStatus {
///         let e = ctx.scalar(self.energy) - 1.0;
///         ctx.set_scalar(self.energy, e);
///         if e <= 0.0 { AgentStatus::Dead } else { AgentStatus::Alive }
///     }
/// }
/// ```
pub trait AgentFunction: Send + Sync + 'static {
    /// Human-readable name for error reporting and metrics.
    fn name(&self) -> &str;

    /// Execute the transition for one agent.
    fn run(&self, ctx: &mut AgentContext<'_>) -> AgentStatus;
}
