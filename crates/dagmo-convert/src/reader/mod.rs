//! Readers turning source text into the unit model.
//!
//! Each reader walks the top-level items of one form, keeps what maps to
//! a unit, and reports or silently skips everything else.

pub(crate) mod notebook;
pub(crate) mod pipeline;

use dagmo_core::python::call::{self, Argument};
use dagmo_core::{ArgRole, DecoratorArg};

/// Turn decorator call arguments into model arguments.
fn decorator_args(args: Vec<Argument>, role: impl Fn(Option<&str>) -> ArgRole) -> Vec<DecoratorArg> {
    args.into_iter()
        .map(|arg| DecoratorArg {
            role: role(arg.keyword.as_deref()),
            key: arg.keyword,
            value: arg.value,
        })
        .collect()
}

/// Upstream names listed in a `deps=[...]` value.
///
/// String entries give their value, bare names their own text. Other
/// entries are returned in the second list, unchanged.
fn dep_names(value: &str) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut opaque = Vec::new();
    for item in call::sequence_items(value) {
        if let Some(name) = call::string_expression(&item) {
            names.push(name);
        } else if is_identifier(&item) {
            names.push(item);
        } else {
            opaque.push(item);
        }
    }
    (names, opaque)
}

/// True if `text` is a single non-keyword name.
fn is_identifier(text: &str) -> bool {
    call::dotted_name(text).is_some_and(|path| path.len() == 1)
}
