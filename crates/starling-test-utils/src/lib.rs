//! Test utilities and stub agent functions for Starling development.
//!
//! Provides layout builders and canned [`AgentFunction`] implementations
//! for constructing test scenarios without boilerplate.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use starling_core::{AgentLayout, AgentStatus, VariableDef};
use starling_exec::{AgentContext, AgentFunction};

/// Build a layout from `(name, components)` pairs.
pub fn layout_of(vars: &[(&str, u32)]) -> AgentLayout {
    let mut layout = AgentLayout::new();
    for (name, components) in vars {
        layout
            .register(VariableDef::vector(*name, *components))
            .unwrap_or_else(|| panic!("duplicate test variable '{name}'"));
    }
    layout
}

/// An agent function that always returns a fixed status.
pub struct ConstStatus {
    pub name: &'static str,
    pub status: AgentStatus,
}

impl AgentFunction for ConstStatus {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentStatus {
        self.status
    }
}

/// An agent function that counts its invocations across all threads.
pub struct CountingFunction {
    pub name: &'static str,
    pub calls: Arc<AtomicU64>,
}

impl CountingFunction {
    pub fn new(name: &'static str) -> (Self, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        (
            Self {
                name,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl AgentFunction for CountingFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentStatus {
        self.calls.fetch_add(1, Ordering::Relaxed);
        AgentStatus::Alive
    }
}
