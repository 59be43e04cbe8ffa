//! List of labels for a process or a component invocation.

/// List of labels identifying a single component invocation within a tick,
/// attached to the tracing spans emitted by the executor and the component
/// executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLabels {
    /// The phase the component runs in (`perception`, `planning`, `other`,
    /// `always_run`).
    pub task_cat: String,
    /// The component name as declared in the computation graph.
    pub task_id: String,
    /// The pipeline the component is currently running under.
    pub task_source: String,
}

impl TaskLabels {
    /// Create a new `TaskLabels` instance.
    pub fn new(task_cat: &str, task_id: &str, task_source: &str) -> Self {
        Self {
            task_cat: task_cat.into(),
            task_id: task_id.into(),
            task_source: task_source.into(),
        }
    }

    /// Create a unique task id.
    pub fn unique_id(&self) -> String {
        format!("{}:{}:{}", self.task_cat, self.task_id, self.task_source)
    }
}
