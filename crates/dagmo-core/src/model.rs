//! Intermediate model shared by both conversion directions.

use std::collections::BTreeSet;

use crate::metadata::ScriptMetadata;
use crate::pattern::{ArgRole, ParamRole};
use crate::python::{ImportItem, Statement};

/// What a unit is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitKind {
    /// Ordinary computation.
    #[default]
    Code,
    /// Computation built around the embedded-query call.
    Sql,
    /// Nothing but imports.
    ImportOnly,
    /// Documentation text.
    Markdown,
    /// Interactive controls or layout.
    Ui,
    /// Shows a value without producing one.
    DisplayOnly,
}

impl UnitKind {
    /// True for kinds that become pipeline assets.
    pub fn is_convertible(self) -> bool {
        matches!(self, Self::Code | Self::Sql)
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Code => "CODE",
            Self::Sql => "SQL",
            Self::ImportOnly => "IMPORT_ONLY",
            Self::Markdown => "MARKDOWN",
            Self::Ui => "UI",
            Self::DisplayOnly => "DISPLAY_ONLY",
        };
        f.write_str(name)
    }
}

/// A decorator argument as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorArg {
    pub key: Option<String>,
    /// Source text of the value.
    pub value: String,
    pub role: ArgRole,
}

impl DecoratorArg {
    pub fn render(&self) -> String {
        match &self.key {
            Some(key) => format!("{key}={}", self.value),
            None => self.value.clone(),
        }
    }
}

/// A parameter of the source definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitParam {
    pub name: String,
    pub role: ParamRole,
}

impl UnitParam {
    pub fn data(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ParamRole::Data,
        }
    }
}

/// One convertible block of source: a notebook cell or a pipeline asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unit {
    pub kind: UnitKind,
    pub name: String,
    /// Name of the source function.
    pub function: String,
    /// True for an `async def`.
    pub is_async: bool,
    pub params: Vec<UnitParam>,
    /// Body statements, without the docstring and the final notebook return.
    pub body: Vec<Statement>,
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    /// Ordering-only upstream names.
    pub deps: Vec<String>,
    /// Exported names, in order.
    pub outputs: Vec<String>,
    /// True when the unit exports several named outputs.
    pub multi_output: bool,
    pub doc: Option<String>,
    pub decorator_args: Vec<DecoratorArg>,
    pub order_index: usize,
    /// 1-based source line of the definition.
    pub line: usize,
}

impl Unit {
    /// Body as one block of source text at column zero.
    pub fn body_text(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for statement in &self.body {
            lines.extend(statement.leading.iter().map(String::as_str));
            lines.push(&statement.text);
        }
        lines.join("\n")
    }

    /// Names of parameters with the given role.
    pub fn params_with(&self, role: ParamRole) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(move |p| p.role == role)
            .map(|p| p.name.as_str())
    }

    /// Drop blank lines ahead of the first body statement. Removing or
    /// hoisting statements can leave the separator of a removed statement
    /// at the top of the body.
    pub fn trim_leading_blank_lines(&mut self) {
        if let Some(first) = self.body.first_mut() {
            let blank = first
                .leading
                .iter()
                .take_while(|line| line.trim().is_empty())
                .count();
            first.leading.drain(..blank);
        }
    }
}

/// Name of a unit.
///
/// A function name other than `_` wins, then the first public output, and
/// finally a name derived from the position.
pub fn unit_name(function: &str, outputs: &[String], order_index: usize) -> String {
    if function != "_" && !function.is_empty() {
        return function.to_string();
    }
    outputs
        .iter()
        .find(|o| !o.starts_with('_'))
        .cloned()
        .unwrap_or_else(|| format!("cell_{order_index}"))
}

/// A module in either form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    /// Module docstring.
    pub preamble: Option<String>,
    pub metadata: Option<ScriptMetadata>,
    /// Module-level imports, framework imports excluded.
    pub imports: Vec<ImportItem>,
    pub units: Vec<Unit>,
}

impl Module {
    pub fn convertible_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.kind.is_convertible())
    }

    /// Add an import unless one with the same rendering is present.
    /// Returns true if it was added.
    pub fn add_import(&mut self, item: ImportItem) -> bool {
        let rendered = item.render();
        if self.imports.iter().any(|i| i.render() == rendered) {
            return false;
        }
        self.imports.push(item);
        true
    }

    /// Append a paragraph to the module docstring.
    pub fn append_preamble(&mut self, text: &str) {
        match &mut self.preamble {
            Some(preamble) if !preamble.is_empty() => {
                preamble.push_str("\n\n");
                preamble.push_str(text);
            }
            _ => self.preamble = Some(text.to_string()),
        }
    }
}
