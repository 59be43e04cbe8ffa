//! A pipeline: the three-phase (perception, planning, other) grouping of
//! component executors that `ExecutorBase::run_until_switch` drives each
//! tick, plus the always-run set that executes regardless of which
//! pipeline is active.

use std::sync::{Arc, Mutex};

use component::ComponentExecutor;
use indexmap::IndexMap;

/// A shared, interned component executor. The same instance may appear in
/// several phases across several pipelines, and in the always-run set, so
/// it is reference-counted rather than owned by any one of them.
pub type SharedExecutor = Arc<Mutex<ComponentExecutor>>;

/// One phase's components, in computation-graph scheduling-priority order.
pub type Phase = IndexMap<String, SharedExecutor>;

/// The component names assigned to one pipeline's three phases, by name —
/// the shape a caller builds before handing it to
/// `ExecutorBase::add_pipeline`, which resolves each name against the
/// interning map and validates the result against the computation-graph
/// descriptor.
#[derive(Debug, Clone, Default)]
pub struct PipelineSpec {
    /// Components that sense the world. Run first each tick.
    pub perception: Vec<String>,
    /// Components that decide what to do. Run second.
    pub planning: Vec<String>,
    /// Everything else (e.g. control, actuation). Run last.
    pub other: Vec<String>,
}

impl PipelineSpec {
    /// Creates an empty pipeline spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a name to the perception phase.
    pub fn perceive(mut self, name: impl Into<String>) -> Self {
        self.perception.push(name.into());
        self
    }

    /// Appends a name to the planning phase.
    pub fn plan(mut self, name: impl Into<String>) -> Self {
        self.planning.push(name.into());
        self
    }

    /// Appends a name to the `other` phase.
    pub fn act(mut self, name: impl Into<String>) -> Self {
        self.other.push(name.into());
        self
    }
}

/// A resolved pipeline: every phase's components, already looked up and
/// ordered to match the computation-graph descriptor.
#[derive(Clone, Default)]
pub struct Pipeline {
    pub(crate) perception: Phase,
    pub(crate) planning: Phase,
    pub(crate) other: Phase,
}

impl Pipeline {
    /// The perception phase.
    pub fn perception(&self) -> &Phase {
        &self.perception
    }

    /// The planning phase.
    pub fn planning(&self) -> &Phase {
        &self.planning
    }

    /// The `other` phase.
    pub fn other(&self) -> &Phase {
        &self.other
    }
}
