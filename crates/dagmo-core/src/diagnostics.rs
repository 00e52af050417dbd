//! Non-fatal conversion diagnostics.

use serde::Serialize;
use tracing::warn;

/// Label used for warnings that belong to no unit.
pub const MODULE_SCOPE: &str = "<module>";

/// Kind of construct a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Construct {
    /// A decorator keyword with no known counterpart.
    DecoratorArgument,
    /// A positional decorator argument.
    PositionalDecoratorArgument,
    /// Notebook API left in a pipeline unit.
    NotebookApi,
    /// Pipeline framework API left in a notebook cell.
    FrameworkApi,
    /// A use of the execution context that is not pure reporting.
    ContextUsage,
    /// An injected resource parameter.
    ResourceParameter,
    /// A query-call argument with no counterpart, or an indirect query call.
    QueryArgument,
    /// A `return` before the end of a unit body.
    EarlyReturn,
    /// A `from ... import *`.
    StarImport,
    /// A top-level statement that is not a unit.
    TopLevelStatement,
    /// A name written by several units.
    AmbiguousProducer,
    /// A declared upstream that no unit produces.
    UnresolvedUpstream,
    /// An argument of the definitions object other than `assets`.
    DefinitionsArgument,
}

impl std::fmt::Display for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DecoratorArgument => "decorator argument",
            Self::PositionalDecoratorArgument => "positional decorator argument",
            Self::NotebookApi => "notebook API",
            Self::FrameworkApi => "framework API",
            Self::ContextUsage => "context usage",
            Self::ResourceParameter => "resource parameter",
            Self::QueryArgument => "query argument",
            Self::EarlyReturn => "early return",
            Self::StarImport => "star import",
            Self::TopLevelStatement => "top-level statement",
            Self::AmbiguousProducer => "ambiguous producer",
            Self::UnresolvedUpstream => "unresolved upstream",
            Self::DefinitionsArgument => "definitions argument",
        };
        f.write_str(name)
    }
}

/// A construct the converter passed through or dropped without a
/// recognized rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsupportedConstructWarning {
    /// Name of the affected unit, or [`MODULE_SCOPE`].
    pub unit: String,
    pub construct: Construct,
    pub message: String,
}

impl std::fmt::Display for UnsupportedConstructWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.unit, self.message, self.construct)
    }
}

/// Collects warnings over one conversion.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<UnsupportedConstructWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn push(&mut self, unit: impl Into<String>, construct: Construct, message: impl Into<String>) {
        let warning = UnsupportedConstructWarning {
            unit: unit.into(),
            construct,
            message: message.into(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Record a warning about module-level content.
    pub fn module(&mut self, construct: Construct, message: impl Into<String>) {
        self.push(MODULE_SCOPE, construct, message);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[UnsupportedConstructWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<UnsupportedConstructWarning> {
        self.warnings
    }
}
