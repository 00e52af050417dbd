//! Python source handling.
//!
//! This module provides:
//! - Syntax trees from tree-sitter, with syntax errors as parse errors
//! - Statement-level parsing that keeps original text and comments
//! - Name binding analysis for dependency inference
//! - String literal evaluation and docstring rendering
//! - Call and argument list helpers

pub mod call;
pub mod literal;
pub mod scope;
pub mod syntax;
pub(crate) mod tree;

pub use call::{Argument, Call};
pub use scope::{Bindings, analyze};
pub use syntax::{
    ClassDef, Decorator, FunctionDef, ImportItem, Item, ItemKind, Param, ParamKind, ParsedModule,
    Statement, StatementKind, has_own_return, indent, is_main_guard, parse_module, simple_assignment,
};
