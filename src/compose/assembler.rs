//! Topology Assembler
//!
//! An ordered pipeline of named tier-build steps. Order is hand-specified
//! per deployment profile; each step declares which earlier tiers it
//! depends on, and the assembler rejects a step whose declared dependency
//! has not been built. Each step receives the accumulated handles of every
//! tier built so far and returns its own.

use indexmap::IndexMap;
use tracing::info;

use crate::compose::tier::TierHandles;
use crate::errors::{ComposeError, ComposeResult};
use crate::template::Topology;

/// Handles of every tier built so far, keyed by tier name.
#[derive(Debug, Default)]
pub struct BuiltTiers {
    handles: IndexMap<String, TierHandles>,
}

impl BuiltTiers {
    /// Handles of a previously built tier.
    pub fn get(&self, tier: &str) -> ComposeResult<&TierHandles> {
        self.handles
            .get(tier)
            .ok_or_else(|| ComposeError::unresolved(tier, "tier has not been built"))
    }

    /// Whether the named tier has been built.
    pub fn contains(&self, tier: &str) -> bool {
        self.handles.contains_key(tier)
    }

    /// Built tier names, in build order.
    pub fn tier_names(&self) -> Vec<String> {
        self.handles.keys().cloned().collect()
    }
}

type BuildFn<'a, Ctx> =
    Box<dyn Fn(&mut Topology, &Ctx, &BuiltTiers) -> ComposeResult<TierHandles> + 'a>;

struct TierStep<'a, Ctx> {
    name: String,
    depends_on: Vec<String>,
    build: BuildFn<'a, Ctx>,
}

/// Ordered tier-build pipeline over a profile context `Ctx`.
pub struct Assembler<'a, Ctx> {
    steps: Vec<TierStep<'a, Ctx>>,
}

impl<'a, Ctx> Default for Assembler<'a, Ctx> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<'a, Ctx> Assembler<'a, Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named step with its declared dependencies.
    pub fn step<F>(mut self, name: impl Into<String>, depends_on: &[&str], build: F) -> Self
    where
        F: Fn(&mut Topology, &Ctx, &BuiltTiers) -> ComposeResult<TierHandles> + 'a,
    {
        self.steps.push(TierStep {
            name: name.into(),
            depends_on: depends_on.iter().map(|dep| dep.to_string()).collect(),
            build: Box::new(build),
        });
        self
    }

    /// Run every step in declaration order.
    ///
    /// A step whose declared dependency is missing, or whose name repeats an
    /// already-built tier, aborts the whole assembly; nothing is emitted for
    /// a partially assembled topology because serialization happens only
    /// after assembly returns.
    pub fn run(self, topology: &mut Topology, context: &Ctx) -> ComposeResult<BuiltTiers> {
        let mut built = BuiltTiers::default();
        for step in self.steps {
            if built.contains(&step.name) {
                return Err(ComposeError::configuration(
                    &step.name,
                    "name",
                    "tier name repeats an already-built tier",
                ));
            }
            for dependency in &step.depends_on {
                if !built.contains(dependency) {
                    return Err(ComposeError::configuration(
                        &step.name,
                        "depends_on",
                        format!("declared dependency '{dependency}' has not been built"),
                    ));
                }
            }
            info!(tier = %step.name, "building tier");
            let handles = (step.build)(topology, context, &built)?;
            built.handles.insert(step.name, handles);
        }
        Ok(built)
    }
}
