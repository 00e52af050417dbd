//! Core engine for dagmo.
//!
//! This crate provides:
//! - Python source parsing that preserves comments and layout
//! - Name binding analysis for dependency inference
//! - The intermediate unit model shared by both conversion directions
//! - Recognized decorator, parameter, statement and query-call shapes
//! - Dependency graph with cycle detection and stable ordering
//! - PEP 723 script metadata translation
//! - Conversion configuration and diagnostics

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod model;
pub mod pattern;
pub mod python;

pub use config::{ConversionConfig, NotebookDialect, PipelineDialect, QueryDialect};
pub use diagnostics::{Construct, Diagnostics, UnsupportedConstructWarning};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, UnitId};
pub use metadata::ScriptMetadata;
pub use model::{DecoratorArg, Module, Unit, UnitKind, UnitParam, unit_name};
pub use pattern::{ArgRole, DecoratorShape, FrameworkScope, ParamRole, QueryCall, StatementShape};
