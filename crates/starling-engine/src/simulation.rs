//! The lockstep simulation driver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indexmap::IndexMap;

use starling_core::{
    AgentId, AgentLayout, IdSource, MessageId, MessageRegistry, NamespaceHash, StepError,
};
use starling_exec::{
    launch, AgentFunction, BirthBinding, FaultChannel, LaunchArgs, LaunchHashes,
    MessageOutBinding, RngStreams,
};
use starling_msg::MessageStore;
use starling_pop::{BirthStage, Population, PopulationError};
use starling_scan::exclusive_scan;

use crate::config::{ConfigError, ModelConfig};
use crate::metrics::StepMetrics;

/// Counter distinguishing concurrently constructed simulations.
static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// One agent function with its bindings resolved to IDs and hashes.
struct CompiledFunction {
    name: String,
    hash: NamespaceHash,
    function: Box<dyn AgentFunction>,
    allows_death: bool,
    message_in: Option<(MessageId, NamespaceHash)>,
    message_out: Option<(MessageId, NamespaceHash)>,
    out_optional: bool,
    birth_hash: Option<NamespaceHash>,
}

struct CompiledLayer {
    functions: Vec<CompiledFunction>,
}

/// Result of a successful step.
#[derive(Clone, Debug)]
pub struct StepResult {
    /// Timing and outcome metrics for this step.
    pub metrics: StepMetrics,
}

/// A running simulation: one population, its message stores, random
/// streams, identifier source, and fault channel.
///
/// Each [`step`](Self::step) executes every layer in order. Within a
/// layer, launches run to completion and their side effects are applied
/// before the next layer starts, so message visibility advances exactly at
/// layer boundaries.
pub struct Simulation {
    instance: NamespaceHash,
    layout: AgentLayout,
    registry: MessageRegistry,
    stores: IndexMap<MessageId, MessageStore>,
    layers: Vec<CompiledLayer>,
    population: Population,
    rng: RngStreams,
    ids: IdSource,
    faults: FaultChannel,
    checks: bool,
    steps: u64,
}

impl Simulation {
    /// Validate a model configuration and build the simulation.
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        let registry = config.validate()?;

        let instance = NamespaceHash::of_instance(INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
            .combine(NamespaceHash::of(&config.name));

        let mut stores = IndexMap::new();
        for (def, topology) in &config.messages {
            let id = registry
                .id_of(&def.name)
                .expect("message registered during validation");
            stores.insert(id, MessageStore::new(def.clone(), *topology));
        }

        let birth_hash = NamespaceHash::of("_agent_birth");
        let layers = config
            .layers
            .into_iter()
            .map(|layer| CompiledLayer {
                functions: layer
                    .functions
                    .into_iter()
                    .map(|def| {
                        let name = def.function.name().to_string();
                        CompiledFunction {
                            hash: NamespaceHash::of(&name),
                            name,
                            function: def.function,
                            allows_death: def.allows_death,
                            message_in: def.message_in.map(|m| {
                                let id = registry.id_of(&m).expect("validated");
                                (id, NamespaceHash::of(&m))
                            }),
                            message_out: def.message_out.as_ref().map(|out| {
                                let id = registry.id_of(&out.message).expect("validated");
                                (id, NamespaceHash::of(&out.message))
                            }),
                            out_optional: def.message_out.map(|out| out.optional).unwrap_or(false),
                            birth_hash: def.births.then_some(birth_hash),
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            instance,
            layout: config.layout.clone(),
            registry,
            stores,
            layers,
            population: Population::new(config.layout, config.capacity),
            rng: RngStreams::seeded(config.seed, 0),
            ids: IdSource::new(1),
            faults: FaultChannel::new(),
            checks: config.checks,
            steps: 0,
        })
    }

    /// The live population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The message registry.
    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// A message store by name (readable list as of the last index build).
    pub fn message(&self, name: &str) -> Option<&MessageStore> {
        let id = self.registry.id_of(name)?;
        self.stores.get(&id)
    }

    /// Steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Seed one agent before (or between) steps, drawing its identifier
    /// from the shared source.
    pub fn spawn(&mut self, row: &[f32]) -> Result<AgentId, PopulationError> {
        let id = self.ids.reserve(1);
        self.population.push(id, row)?;
        Ok(id)
    }

    /// Execute one step: every layer, in order.
    ///
    /// On a runtime-checked fault the step is aborted with
    /// [`StepError::FaultRaised`] — side effects of launches that
    /// completed earlier in the step remain applied, the faulting launch's
    /// outcome flags are discarded.
    pub fn step(&mut self) -> Result<StepResult, StepError> {
        let started = Instant::now();
        let mut metrics = StepMetrics::default();

        for layer_index in 0..self.layers.len() {
            for function_index in 0..self.layers[layer_index].functions.len() {
                self.run_function(layer_index, function_index, &mut metrics)?;
            }
        }

        self.steps += 1;
        metrics.total_us = started.elapsed().as_micros() as u64;
        metrics.population = self.population.len() as u64;
        Ok(StepResult { metrics })
    }

    fn run_function(
        &mut self,
        layer_index: usize,
        function_index: usize,
        metrics: &mut StepMetrics,
    ) -> Result<(), StepError> {
        let pop_no = self.population.len();

        let cf = &self.layers[layer_index].functions[function_index];
        let name = cf.name.clone();
        let hashes = LaunchHashes {
            instance: self.instance,
            function: cf.hash,
            message_in: cf.message_in.map(|(_, h)| h).unwrap_or(NamespaceHash::NONE),
            message_out: cf.message_out.map(|(_, h)| h).unwrap_or(NamespaceHash::NONE),
            birth: cf.birth_hash.unwrap_or(NamespaceHash::NONE),
        };
        let allows_death = cf.allows_death;
        let message_in = cf.message_in;
        let message_out = cf.message_out;
        let out_optional = cf.out_optional;
        let births = cf.birth_hash.is_some();

        // Per-launch outcome resources. Absence of an array means the
        // feature is statically disabled for this function.
        let mut death_flags: Option<Vec<u32>> = allows_death.then(|| vec![0u32; pop_no]);
        let mut staging = message_out.map(|(id, _)| {
            self.stores
                .get(&id)
                .expect("message store built at construction")
                .begin_staging(pop_no)
        });
        let mut msg_flags: Option<Vec<u32>> =
            (message_out.is_some() && out_optional).then(|| vec![0u32; pop_no]);
        let mut birth_stage: Option<BirthStage> =
            births.then(|| BirthStage::new(&self.layout, pop_no));
        let mut birth_flags: Option<Vec<u32>> = births.then(|| vec![0u32; pop_no]);

        self.rng.ensure(pop_no);

        {
            let function: &dyn AgentFunction =
                &*self.layers[layer_index].functions[function_index].function;
            let inbound = message_in.map(|(id, msg_hash)| {
                let store = self.stores.get(&id).expect("message store built");
                (store.header(hashes.function, msg_hash), store.list())
            });
            let (ids, columns) = self.population.lend();

            let args = LaunchArgs {
                hashes,
                pop_no,
                layout: &self.layout,
                ids,
                columns,
                message_in: inbound,
                message_out: staging.as_mut().map(|s| MessageOutBinding {
                    width: s.width(),
                    slots: s.rows_mut(),
                    flags: msg_flags.as_mut().map(|f| f.as_mut_slice()),
                }),
                birth: match (birth_stage.as_mut(), birth_flags.as_mut()) {
                    (Some(stage), Some(flags)) => Some(BirthBinding {
                        width: stage.width(),
                        slots: stage.rows_mut(),
                        flags: flags.as_mut_slice(),
                    }),
                    _ => None,
                },
                death_flags: death_flags.as_mut().map(|f| f.as_mut_slice()),
                rng: self.rng.streams_mut(),
                checks: self.checks,
                faults: &self.faults,
            };

            let launch_started = Instant::now();
            launch(function, args);
            metrics
                .launch_us
                .push((name.clone(), launch_started.elapsed().as_micros() as u64));
        }

        // A populated fault record is a hard failure of this step.
        if let Some(fault) = self.faults.take() {
            return Err(StepError::FaultRaised {
                function: name,
                fault,
            });
        }

        // Death: keep ALIVE agents, preserving relative order.
        if let Some(flags) = death_flags.take() {
            let scan = exclusive_scan(&flags);
            metrics.agents_died += pop_no as u64 - u64::from(scan.kept);
            self.population.apply_deaths(&flags, &scan);
        }

        // Message output: the compacted staging becomes the readable list
        // and the topology's index is refreshed.
        if let (Some((id, _)), Some(staging)) = (message_out, staging.take()) {
            let dense = match msg_flags.take() {
                Some(flags) => {
                    let scan = exclusive_scan(&flags);
                    staging.compact(&flags, &scan)
                }
                None => staging.into_rows(),
            };
            let store = self.stores.get_mut(&id).expect("message store built");
            let width = store.def().width();
            if width > 0 {
                metrics.messages_emitted += (dense.len() / width) as u64;
            }
            store.build_index(dense);
        }

        // Birth: identifiers are reserved in one block and assigned in
        // compacted order, so assignment is deterministic given thread
        // index.
        if let (Some(stage), Some(flags)) = (birth_stage.take(), birth_flags.take()) {
            let scan = exclusive_scan(&flags);
            if scan.kept > 0 {
                let kept = scan.kept_len();
                let requested = self.population.len() + kept;
                if requested > self.population.capacity() {
                    return Err(StepError::CapacityExceeded {
                        requested,
                        capacity: self.population.capacity(),
                    });
                }
                let base = self.ids.reserve(scan.kept);
                let rows = stage.compact(&flags, &scan);
                self.population
                    .append_births(base, &rows)
                    .expect("capacity checked before applying births");
                metrics.agents_born += kept as u64;
            }
        }

        Ok(())
    }
}
