//! Source emission for both forms.
//!
//! Output is a list of sections separated by two blank lines, ending in a
//! single newline. Nothing here depends on hash order, so emission is
//! deterministic.

mod notebook;
mod pipeline;

pub(crate) use notebook::NotebookGenerator;
pub(crate) use pipeline::PipelineGenerator;

use dagmo_core::python::{Statement, indent, literal};
use dagmo_core::Module;

const INDENT: &str = "    ";

/// Module docstring and metadata block, when present.
fn header(module: &Module) -> Vec<String> {
    let mut sections = Vec::new();
    if let Some(preamble) = module.preamble.as_deref().filter(|p| !p.is_empty()) {
        sections.push(literal::docstring(preamble, ""));
    }
    if let Some(metadata) = &module.metadata {
        sections.push(metadata.render());
    }
    sections
}

fn join(sections: Vec<String>) -> String {
    let mut out = sections.join("\n\n\n");
    out.push('\n');
    out
}

/// Body statements indented one level, comments and blank lines kept.
fn body(statements: &[Statement]) -> Vec<String> {
    let mut lines = Vec::new();
    for statement in statements {
        for line in &statement.leading {
            if line.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{INDENT}{line}"));
            }
        }
        lines.push(indent(&statement.text, INDENT));
    }
    lines
}
