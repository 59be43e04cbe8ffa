#![deny(
    trivial_numeric_casts,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    unused_results
)]
#![warn(rust_2021_compatibility, unreachable_pub)]

//! The computation-graph descriptor and its validator: checks that every
//! component's declared inputs are produced upstream (by an earlier phase
//! or an earlier component in the same phase) and that every output the
//! graph requires of a component is one the component actually declares.

use std::collections::{HashMap, HashSet};

use blackboard::fields::{self, FieldRef};
use indexmap::IndexMap;

/// One entry of the computation-graph descriptor: a component's declared
/// inputs and (required) outputs, in the order scheduling priority is
/// assigned within its phase.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    /// The component's name, as it appears in the pipeline.
    pub name: String,
    /// Fields this component consumes, or `[FieldRef::All]`.
    pub inputs: Vec<FieldRef>,
    /// Fields this component is required to produce, or `[FieldRef::All]`.
    pub outputs: Vec<FieldRef>,
}

/// An ordered, duplicate-free sequence of [`ComponentSpec`]s. Order defines
/// scheduling priority within a phase.
#[derive(Debug, Clone, Default)]
pub struct GraphDescriptor {
    entries: IndexMap<String, ComponentSpec>,
}

impl GraphDescriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component spec. Rejects a name already present.
    pub fn insert(&mut self, spec: ComponentSpec) -> Result<(), GraphError> {
        if self.entries.contains_key(&spec.name) {
            return Err(GraphError::DuplicateComponent { name: spec.name });
        }
        let _ = self.entries.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Returns `true` if a spec with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Looks up a spec by name.
    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.entries.get(name)
    }

    /// Iterates specs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentSpec)> {
        self.entries.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A graph-validation failure, naming the offending component and the rule
/// it violated.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum GraphError {
    /// The descriptor already had an entry with this name.
    #[error("duplicate component '{name}' in computation graph")]
    DuplicateComponent {
        /// The repeated name.
        name: String,
    },

    /// The descriptor names a component that has no corresponding runtime
    /// executor.
    #[error("component '{name}' declared in the computation graph was never constructed")]
    MissingComponent {
        /// The declared but absent component name.
        name: String,
    },

    /// A runtime component's name does not appear in the descriptor.
    #[error("component '{name}' is present at runtime but not declared in the computation graph")]
    UnknownComponent {
        /// The undeclared component name.
        name: String,
    },

    /// A component declared `"all"` as one input among several, instead of
    /// its sole input.
    #[error("component '{component}' declares \"all\" alongside other named inputs")]
    MixedAllInput {
        /// The offending component.
        component: String,
    },

    /// A declared input is not produced by any earlier component in this
    /// phase, nor by an earlier phase, nor by an earlier `"all"` producer.
    #[error("component '{component}' requires input '{field}', which nothing upstream produces")]
    UnsatisfiedInput {
        /// The offending component.
        component: String,
        /// The unproduced field.
        field: String,
    },

    /// A required output is not among the component's own declared
    /// outputs.
    #[error("component '{component}' is required to produce '{field}', but does not declare it as an output")]
    MissingOutput {
        /// The offending component.
        component: String,
        /// The missing field.
        field: String,
    },
}

/// Validates one phase's components against the computation-graph
/// descriptor, in declared order, threading forward the set of fields
/// already provided by earlier phases. Returns the cumulative
/// produced-field set (to be passed as `already_provided` to the next
/// phase).
///
/// `declared_outputs` maps every constructed component's name to the
/// outputs its runtime instance actually declares; it is a plain snapshot
/// rather than a borrow of the components themselves, since a single
/// instance may be shared across several phases/pipelines behind shared
/// ownership the caller holds. `phase_names` is the subset, in whatever
/// order the caller enumerated them, that belongs to the phase being
/// validated right now. Processing itself walks the descriptor's own
/// order, not `phase_names`' order, since scheduling priority is a
/// property of the computation-graph descriptor.
pub fn validate(
    descriptor: &GraphDescriptor,
    declared_outputs: &HashMap<String, Vec<FieldRef>>,
    phase_names: &[String],
    already_provided: &HashSet<FieldRef>,
) -> Result<HashSet<FieldRef>, GraphError> {
    let phase_set: HashSet<&str> = phase_names.iter().map(String::as_str).collect();
    let mut provided = already_provided.clone();
    let mut all_produced = false;

    for (name, spec) in descriptor.iter() {
        if !phase_set.contains(name) {
            continue;
        }

        let outputs = declared_outputs
            .get(name)
            .ok_or_else(|| GraphError::MissingComponent { name: name.to_string() })?;

        if spec.inputs.iter().any(FieldRef::is_all) && spec.inputs.len() != 1 {
            return Err(GraphError::MixedAllInput { component: name.to_string() });
        }

        for input in &spec.inputs {
            if let FieldRef::Named(_) = input {
                if !all_produced && !provided.contains(input) {
                    return Err(GraphError::UnsatisfiedInput {
                        component: name.to_string(),
                        field: input.to_string(),
                    });
                }
            }
        }

        for output in &spec.outputs {
            if !outputs.contains(output) {
                return Err(GraphError::MissingOutput {
                    component: name.to_string(),
                    field: output.to_string(),
                });
            }

            match output {
                FieldRef::All => all_produced = true,
                FieldRef::Named(field_name) => {
                    if !fields::is_known_field(field_name) {
                        tracing::warn!(component = %name, field = %field_name, "component declares an output outside the blackboard schema");
                    }
                }
            }

            let _ = provided.insert(output.clone());
        }
    }

    for name in phase_names {
        if !descriptor.contains(name) {
            return Err(GraphError::UnknownComponent { name: name.clone() });
        }
    }

    Ok(provided)
}
