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

//! Loads the mission's computation-graph configuration from YAML, resolves
//! each component descriptor through an injected [`ComponentFactory`] (a
//! build-time registry rather than runtime reflection), and assembles the
//! validated [`graph::GraphDescriptor`] the executor needs before it can
//! build a single pipeline.

use std::{collections::HashSet, fs::File, io::BufReader, io::Read, path::Path};

use blackboard::fields::FieldRef;
use component::Component;
use graph::{ComponentSpec, GraphDescriptor};
use serde::Deserialize;
use serde_yaml::Value;
use validator::Validate;

/// Errors raised while loading or resolving the computation-graph
/// configuration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read or parsed.
    #[error("invalid configuration file '{file}': {message}")]
    InvalidConfig {
        /// The path to the config file.
        file: String,
        /// The underlying reason.
        message: String,
    },

    /// Two computation-graph entries share the same name.
    #[error("duplicate component '{name}' in computation graph (config file '{file}')")]
    DuplicateComponent {
        /// The path to the config file.
        file: String,
        /// The repeated name.
        name: String,
    },

    /// The injected `ComponentFactory` could not construct this component.
    #[error("component '{name}' (type '{type_name}') could not be created: {reason}")]
    ComponentNotCreated {
        /// The component's declared name.
        name: String,
        /// The component's declared type.
        type_name: String,
        /// The underlying reason.
        reason: String,
    },

    /// Graph validation (duplicate name at insertion time) failed while
    /// assembling the descriptor.
    #[error("computation graph is malformed: {0}")]
    Graph(#[from] graph::GraphError),
}

/// A component's constructor arguments: a raw, lazily-interpreted YAML
/// value (a list maps to positional args, a mapping maps to named args),
/// resolved by the factory rather than by this crate, keeping each entry
/// as a raw `serde_yaml::Value` until the factory needs it.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ComponentArgs(Value);

impl ComponentArgs {
    /// The raw YAML value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The args as a mapping, if this was declared as one.
    pub fn as_mapping(&self) -> Option<&serde_yaml::Mapping> {
        self.0.as_mapping()
    }

    /// The args as a sequence, if this was declared as one.
    pub fn as_sequence(&self) -> Option<&Vec<Value>> {
        self.0.as_sequence()
    }
}

fn default_true() -> bool {
    true
}

/// The full per-component descriptor form: `{type, module?, args?,
/// multiprocess?, essential?, rate?, print?, debug?}`, plus `name` (defaults
/// to `type` when absent) and `inputs`/`outputs` (empty by default), so the
/// computation-graph descriptor can be built directly from configuration
/// rather than requiring a second, code-side declaration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FullComponentDescriptor {
    /// The name this component is addressed by in pipelines. Defaults to
    /// `type` when absent.
    pub name: Option<String>,
    /// The component's implementation type, resolved by the injected
    /// [`ComponentFactory`].
    #[serde(rename = "type")]
    pub type_name: String,
    /// An optional module/namespace hint passed through to the factory
    /// alongside `type_name`.
    pub module: Option<String>,
    /// Constructor arguments, list- or mapping-shaped.
    #[serde(default)]
    pub args: Option<ComponentArgs>,
    /// Whether this component should be wrapped in a multi-process
    /// executor (trait seam only — see DESIGN.md).
    #[serde(default)]
    pub multiprocess: bool,
    /// Whether this component's unhealth should trigger a pipeline switch
    /// to `recovery`.
    #[serde(default = "default_true")]
    pub essential: bool,
    /// Overrides `Component::rate()` when present.
    #[validate(range(min = 0.0))]
    pub rate: Option<f64>,
    /// Whether captured stdout/stderr should also be echoed to the real
    /// streams.
    #[serde(default = "default_true")]
    pub print: bool,
    /// Whether a `ChildDebugger` should be installed on this component.
    #[serde(default = "default_true")]
    pub debug: bool,
    /// Blackboard fields this component consumes, or `["all"]`.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Blackboard fields this component is required to produce, or
    /// `["all"]`.
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// A single computation-graph entry: either a bare `"module.Class"`-shaped
/// name (used as both the pipeline name and the factory type), or the full
/// descriptor record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ComponentDescriptor {
    /// `{type, module?, args?, ...}`.
    Full(FullComponentDescriptor),
    /// A bare component name, e.g. `sensor`.
    Bare(String),
}

impl ComponentDescriptor {
    /// The name this component is addressed by within pipelines.
    pub fn name(&self) -> &str {
        match self {
            ComponentDescriptor::Bare(name) => name,
            ComponentDescriptor::Full(full) => full.name.as_deref().unwrap_or(&full.type_name),
        }
    }

    /// The implementation type resolved by the factory.
    pub fn type_name(&self) -> &str {
        match self {
            ComponentDescriptor::Bare(name) => name,
            ComponentDescriptor::Full(full) => &full.type_name,
        }
    }

    /// Constructor arguments, if any were declared.
    pub fn args(&self) -> Option<&ComponentArgs> {
        match self {
            ComponentDescriptor::Bare(_) => None,
            ComponentDescriptor::Full(full) => full.args.as_ref(),
        }
    }

    /// Whether this component should be wrapped in a multi-process
    /// executor.
    pub fn multiprocess(&self) -> bool {
        match self {
            ComponentDescriptor::Bare(_) => false,
            ComponentDescriptor::Full(full) => full.multiprocess,
        }
    }

    /// Whether this component's unhealth should trigger a pipeline switch
    /// to `recovery`. Defaults to `true`.
    pub fn essential(&self) -> bool {
        match self {
            ComponentDescriptor::Bare(_) => true,
            ComponentDescriptor::Full(full) => full.essential,
        }
    }

    /// The descriptor's rate override, if any (wins over
    /// `Component::rate()` — see DESIGN.md).
    pub fn rate(&self) -> Option<f64> {
        match self {
            ComponentDescriptor::Bare(_) => None,
            ComponentDescriptor::Full(full) => full.rate,
        }
    }

    /// Whether captured stdout/stderr should be echoed to the real
    /// streams. Defaults to `true`.
    pub fn print(&self) -> bool {
        match self {
            ComponentDescriptor::Bare(_) => true,
            ComponentDescriptor::Full(full) => full.print,
        }
    }

    /// Whether a `ChildDebugger` should be installed. Defaults to `true`.
    pub fn debug(&self) -> bool {
        match self {
            ComponentDescriptor::Bare(_) => true,
            ComponentDescriptor::Full(full) => full.debug,
        }
    }

    /// The declared inputs, as blackboard field references.
    pub fn inputs(&self) -> Vec<FieldRef> {
        match self {
            ComponentDescriptor::Bare(_) => Vec::new(),
            ComponentDescriptor::Full(full) => full.inputs.iter().map(|s| FieldRef::from(s.as_str())).collect(),
        }
    }

    /// The declared required outputs, as blackboard field references.
    pub fn outputs(&self) -> Vec<FieldRef> {
        match self {
            ComponentDescriptor::Bare(_) => Vec::new(),
            ComponentDescriptor::Full(full) => full.outputs.iter().map(|s| FieldRef::from(s.as_str())).collect(),
        }
    }

    fn validate_ranges(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            ComponentDescriptor::Bare(_) => Ok(()),
            ComponentDescriptor::Full(full) => full.validate(),
        }
    }
}

/// `run.computation_graph`.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputationGraphConfig {
    /// The computation-graph entries, in scheduling-priority order.
    pub components: Vec<ComponentDescriptor>,
}

/// `run`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Whether the `"disengaged"` hardware fault should be treated as a
    /// real fault rather than suppressed. Defaults to `false`.
    #[serde(default)]
    pub require_engaged: bool,
    /// The computation graph to build and validate.
    pub computation_graph: ComputationGraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct RootConfig {
    run: RunConfig,
}

/// Builds a `Component` instance given a resolved name and type, through a
/// build-time registry rather than runtime reflection. Implementors
/// typically hold a `HashMap<&str, fn(...) -> Box<dyn Component>>` keyed by
/// `type_name`.
pub trait ComponentFactory: Send + Sync {
    /// Constructs the component named `name` of type `type_name`, with
    /// `args` as its constructor arguments.
    fn create(&self, name: &str, type_name: &str, args: Option<&ComponentArgs>) -> Result<Box<dyn Component>, ConfigError>;
}

/// One resolved computation-graph entry: the constructed component plus
/// the descriptor fields the executor needs to build a `ComponentExecutor`.
pub struct ResolvedComponent {
    /// The component's declared name.
    pub name: String,
    /// The constructed component instance.
    pub component: Box<dyn Component>,
    /// Whether this component is essential to its pipeline.
    pub essential: bool,
    /// The descriptor's rate override, if any.
    pub rate_override: Option<f64>,
    /// Whether to echo captured I/O to the real streams.
    pub print: bool,
    /// Whether to install a `ChildDebugger`.
    pub debug: bool,
    /// Whether this component was declared `multiprocess`.
    pub multiprocess: bool,
}

/// The fully resolved configuration: the validated computation-graph
/// descriptor, the constructed components in declared order, and the
/// hardware-fault policy.
pub struct ResolvedComputationGraph {
    /// Whether the `"disengaged"` hardware fault should be treated as
    /// real.
    pub require_engaged: bool,
    /// The validated computation-graph descriptor.
    pub descriptor: GraphDescriptor,
    /// Every resolved component, in declared order.
    pub components: Vec<ResolvedComponent>,
}

/// Loads and resolves a mission configuration file.
pub struct Config;

impl Config {
    /// Loads `path`, resolving every computation-graph entry through
    /// `factory` and assembling the validated descriptor. Rejects
    /// duplicate component names (`ConfigError::DuplicateComponent`), out
    /// of range rate overrides, and factory construction failures.
    pub fn load(path: impl AsRef<Path>, factory: &dyn ComponentFactory) -> Result<ResolvedComputationGraph, ConfigError> {
        let file_name = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).map_err(|err| ConfigError::InvalidConfig {
            file: file_name.clone(),
            message: err.to_string(),
        })?;
        let mut contents = String::new();
        BufReader::new(file)
            .read_to_string(&mut contents)
            .map_err(|err| ConfigError::InvalidConfig {
                file: file_name.clone(),
                message: err.to_string(),
            })?;
        Self::load_str(&contents, &file_name, factory)
    }

    /// Loads from an in-memory YAML document, as `load` does, but without
    /// touching the filesystem — used by this crate's own tests and the
    /// `demos/` runnable example.
    pub fn load_str(yaml: &str, source_name: &str, factory: &dyn ComponentFactory) -> Result<ResolvedComputationGraph, ConfigError> {
        let root: RootConfig = serde_yaml::from_str(yaml).map_err(|err| ConfigError::InvalidConfig {
            file: source_name.to_string(),
            message: err.to_string(),
        })?;

        let mut descriptor = GraphDescriptor::new();
        let mut seen = HashSet::new();
        let mut components = Vec::with_capacity(root.run.computation_graph.components.len());

        for entry in root.run.computation_graph.components {
            entry.validate_ranges().map_err(|err| ConfigError::InvalidConfig {
                file: source_name.to_string(),
                message: err.to_string(),
            })?;

            let name = entry.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateComponent {
                    file: source_name.to_string(),
                    name,
                });
            }

            tracing::debug!(component = %name, r#type = entry.type_name(), "resolving computation-graph entry");
            let component = factory
                .create(&name, entry.type_name(), entry.args())
                .map_err(|err| ConfigError::ComponentNotCreated {
                    name: name.clone(),
                    type_name: entry.type_name().to_string(),
                    reason: err.to_string(),
                })?;

            descriptor.insert(ComponentSpec {
                name: name.clone(),
                inputs: entry.inputs(),
                outputs: entry.outputs(),
            })?;

            components.push(ResolvedComponent {
                name,
                component,
                essential: entry.essential(),
                rate_override: entry.rate(),
                print: entry.print(),
                debug: entry.debug(),
                multiprocess: entry.multiprocess(),
            });
        }

        Ok(ResolvedComputationGraph {
            require_engaged: root.run.require_engaged,
            descriptor,
            components,
        })
    }
}
