//! The top-level parallel launch entry point.
//!
//! [`launch`] binds one agent function, one population, and the launch's
//! message/birth/death resources, then runs the function once per agent.
//! Thread indices are partitioned into fixed-size coordination groups;
//! each group is one parallel task that stages the inbound message header
//! once before any member executes (the group-shared scratch staging and
//! barrier of a SIMT target collapse to per-task staging here, at no
//! change in semantics), then runs its members in thread-index order.

use rayon::prelude::*;
use smallvec::SmallVec;

use starling_core::{AgentId, AgentLayout, AgentStatus, FaultCode, NamespaceHash};
use starling_msg::{InboundHeader, MessageListRef, MessageReadHandle, MessageWriteHandle};

use crate::context::{AgentContext, BirthSlot};
use crate::fault::FaultChannel;
use crate::function::AgentFunction;
use crate::rng::AgentRng;

/// Threads per coordination group.
pub const GROUP_SIZE: usize = 64;

/// Namespace hashes identifying one launch's bindings.
///
/// Absent roles (no inbound message, no birth target) carry
/// [`NamespaceHash::NONE`].
#[derive(Clone, Copy, Debug)]
pub struct LaunchHashes {
    /// The owning simulation instance.
    pub instance: NamespaceHash,
    /// The agent function being launched.
    pub function: NamespaceHash,
    /// The inbound message binding, if any.
    pub message_in: NamespaceHash,
    /// The outbound message binding, if any.
    pub message_out: NamespaceHash,
    /// The birth target, if agent output is enabled.
    pub birth: NamespaceHash,
}

impl LaunchHashes {
    /// Hashes for a launch with no message or birth bindings.
    pub fn bare(instance: NamespaceHash, function: NamespaceHash) -> Self {
        Self {
            instance,
            function,
            message_in: NamespaceHash::NONE,
            message_out: NamespaceHash::NONE,
            birth: NamespaceHash::NONE,
        }
    }
}

/// Outbound message resources for one launch: the staging slots and, when
/// message output is optional, the per-thread emitted flag array.
#[derive(Debug)]
pub struct MessageOutBinding<'a> {
    /// Payload width in f32 slots.
    pub width: usize,
    /// Row-major staging buffer, one slot per thread.
    pub slots: &'a mut [f32],
    /// Message-emitted outcome flags; `None` when output is required.
    pub flags: Option<&'a mut [u32]>,
}

/// Birth resources for one launch: the staging rows and the per-thread
/// birth flag array.
#[derive(Debug)]
pub struct BirthBinding<'a> {
    /// Newborn row width (the agent layout's row width).
    pub width: usize,
    /// Row-major staging buffer, one slot per thread.
    pub slots: &'a mut [f32],
    /// Birth outcome flags.
    pub flags: &'a mut [u32],
}

/// Everything one launch needs, assembled by the host driver.
///
/// Population columns are lent for the duration of the launch; each thread
/// owns its own index in every column exclusively. Absent optional pieces
/// mean the corresponding feature is statically disabled for this agent
/// function.
pub struct LaunchArgs<'a> {
    /// Identifying hashes for this launch.
    pub hashes: LaunchHashes,
    /// Live agent count; exactly this many threads do work.
    pub pop_no: usize,
    /// The population's agent layout.
    pub layout: &'a AgentLayout,
    /// Identifier column, aligned with the variable columns.
    pub ids: &'a [AgentId],
    /// One mutable column per variable, in layout order.
    pub columns: Vec<&'a mut [f32]>,
    /// Inbound message binding: staged header plus the opaque list.
    pub message_in: Option<(InboundHeader, MessageListRef<'a>)>,
    /// Outbound message binding.
    pub message_out: Option<MessageOutBinding<'a>>,
    /// Birth binding.
    pub birth: Option<BirthBinding<'a>>,
    /// Death outcome flags; `None` when death handling is disabled.
    pub death_flags: Option<&'a mut [u32]>,
    /// Per-thread random sub-streams (at least `pop_no` slots).
    pub rng: &'a mut [AgentRng],
    /// Whether runtime checks are enabled for this launch.
    pub checks: bool,
    /// The launch's fault channel.
    pub faults: &'a FaultChannel,
}

/// One coordination group's exclusive slices of every launch resource.
struct GroupTask<'a> {
    base: usize,
    ids: &'a [AgentId],
    columns: SmallVec<[&'a mut [f32]; 8]>,
    death: Option<&'a mut [u32]>,
    msg_slots: Option<&'a mut [f32]>,
    msg_flags: Option<&'a mut [u32]>,
    birth_slots: Option<&'a mut [f32]>,
    birth_flags: Option<&'a mut [u32]>,
    rng: &'a mut [AgentRng],
}

fn split_opt<'a, T>(opt: &mut Option<&'a mut [T]>, len: usize) -> Option<&'a mut [T]> {
    match opt.take() {
        Some(s) => {
            let (head, tail) = s.split_at_mut(len);
            *opt = Some(tail);
            Some(head)
        }
        None => None,
    }
}

/// Run one agent function over an entire population.
///
/// Launches exactly `pop_no` logical units of work, each bound to a
/// distinct agent index. Units whose derived index reaches `pop_no`
/// terminate before any side effect — in particular before the context
/// construction that claims a random sub-stream. Death status is committed
/// here; message-emitted and birth flags are committed by the context as
/// part of emission.
pub fn launch(function: &dyn AgentFunction, args: LaunchArgs<'_>) {
    let LaunchArgs {
        hashes,
        pop_no,
        layout,
        mut ids,
        mut columns,
        message_in,
        message_out,
        birth,
        mut death_flags,
        mut rng,
        checks,
        faults,
    } = args;

    let widths: Vec<usize> = layout.iter().map(|(_, d)| d.components as usize).collect();
    debug_assert_eq!(ids.len(), pop_no);
    debug_assert!(rng.len() >= pop_no, "rng streams must cover the population");
    debug_assert!(columns
        .iter()
        .zip(&widths)
        .all(|(c, w)| c.len() == pop_no * w));

    let (mut out_slots, mut out_flags, out_width) = match message_out {
        Some(m) => {
            debug_assert_eq!(m.slots.len(), pop_no * m.width);
            (Some(m.slots), m.flags, m.width)
        }
        None => (None, None, 0),
    };
    let (mut birth_slots, mut birth_flags, birth_width) = match birth {
        Some(b) => {
            debug_assert_eq!(b.slots.len(), pop_no * b.width);
            debug_assert_eq!(b.flags.len(), pop_no);
            (Some(b.slots), Some(b.flags), b.width)
        }
        None => (None, None, 0),
    };
    if let Some(d) = death_flags.as_deref() {
        debug_assert_eq!(d.len(), pop_no);
    }

    // Carve every resource into per-group exclusive slices.
    let mut tasks: Vec<GroupTask<'_>> = Vec::with_capacity(pop_no.div_ceil(GROUP_SIZE));
    let mut base = 0usize;
    while base < pop_no {
        let len = GROUP_SIZE.min(pop_no - base);

        let mut group_cols: SmallVec<[&mut [f32]; 8]> = SmallVec::with_capacity(columns.len());
        let mut rest_cols = Vec::with_capacity(columns.len());
        for (col, &w) in columns.into_iter().zip(&widths) {
            let (head, tail) = col.split_at_mut(len * w);
            group_cols.push(head);
            rest_cols.push(tail);
        }
        columns = rest_cols;

        let (group_ids, rest_ids) = ids.split_at(len);
        ids = rest_ids;

        let (group_rng, rest_rng) = std::mem::take(&mut rng).split_at_mut(len);
        rng = rest_rng;

        tasks.push(GroupTask {
            base,
            ids: group_ids,
            columns: group_cols,
            death: split_opt(&mut death_flags, len),
            msg_slots: split_opt(&mut out_slots, len * out_width),
            msg_flags: split_opt(&mut out_flags, len),
            birth_slots: split_opt(&mut birth_slots, len * birth_width),
            birth_flags: split_opt(&mut birth_flags, len),
            rng: group_rng,
        });
        base += len;
    }

    tasks.into_par_iter().for_each(|task| {
        run_group(
            function,
            task,
            &widths,
            layout,
            hashes,
            message_in,
            out_width,
            birth_width,
            pop_no,
            checks,
            faults,
        );
    });
}

#[allow(clippy::too_many_arguments)]
fn run_group(
    function: &dyn AgentFunction,
    mut task: GroupTask<'_>,
    widths: &[usize],
    layout: &AgentLayout,
    hashes: LaunchHashes,
    message_in: Option<(InboundHeader, MessageListRef<'_>)>,
    out_width: usize,
    birth_width: usize,
    pop_no: usize,
    checks: bool,
    faults: &FaultChannel,
) {
    // Stage the combined name hash and grid header once for the whole
    // group, before any member reads agent data.
    let staged: Option<InboundHeader> = message_in.map(|(header, _)| header);

    for local in 0..GROUP_SIZE {
        let thread = task.base + local;
        // Terminate before context construction: inactive units must not
        // claim a random sub-stream or touch any buffer.
        if thread >= pop_no {
            return;
        }

        let mut vars: SmallVec<[&mut [f32]; 8]> = SmallVec::with_capacity(widths.len());
        for (col, &w) in task.columns.iter_mut().zip(widths) {
            vars.push(&mut col[local * w..(local + 1) * w]);
        }

        let read = match (staged, message_in) {
            (Some(header), Some((_, list))) => {
                MessageReadHandle::bind(hashes.function, hashes.message_in, header, list)
            }
            _ => MessageReadHandle::inert(),
        };

        let msg_flags = &mut task.msg_flags;
        let out = task.msg_slots.as_mut().map(|slots| {
            let slot = &mut slots[local * out_width..(local + 1) * out_width];
            let flag = msg_flags.as_mut().map(|f| &mut f[local]);
            MessageWriteHandle::bind(slot, flag)
        });

        let birth = match (task.birth_slots.as_mut(), task.birth_flags.as_mut()) {
            (Some(slots), Some(flags)) => Some(BirthSlot {
                slot: &mut slots[local * birth_width..(local + 1) * birth_width],
                flag: &mut flags[local],
            }),
            _ => None,
        };

        let mut ctx = AgentContext::new(
            thread as u32,
            task.ids[local],
            layout,
            vars,
            &mut task.rng[local],
            read,
            out,
            birth,
            checks,
            faults,
        );
        let status = function.run(&mut ctx);
        drop(ctx);

        // Commit the death outcome. With a death flag array the returned
        // status is written unconditionally; without one, a Dead return is
        // a configuration fault (undetected when checks are off).
        match task.death.as_mut() {
            Some(flags) => flags[local] = status.as_flag(),
            None => {
                if status == AgentStatus::Dead && checks {
                    faults.raise(
                        thread as u32,
                        FaultCode::DeathNotEnabled,
                        format!(
                            "agent function '{}' returned Dead but death handling is disabled",
                            function.name()
                        ),
                        concat!(file!(), ":", line!()),
                    );
                }
            }
        }
    }
}
