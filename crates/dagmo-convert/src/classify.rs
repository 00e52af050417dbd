//! Unit classification.
//!
//! A unit's kind depends only on its own syntax, never on other units, so
//! classification runs before dependency resolution.

use dagmo_core::pattern::{self, QueryCall};
use dagmo_core::python::{Statement, StatementKind};
use dagmo_core::{ConversionConfig, Unit, UnitKind};

/// Kind of a notebook cell. Rules apply in priority order.
pub(crate) fn notebook(unit: &Unit, config: &ConversionConfig) -> UnitKind {
    let dialect = &config.notebook;
    let exports = !unit.outputs.is_empty();
    let sole = match unit.body.as_slice() {
        [only] => Some(only),
        _ => None,
    };

    if !exports && pattern::references_ui(&unit.body_text(), dialect) {
        return UnitKind::Ui;
    }
    if sole.is_some_and(|s| has_query_call(s, &dialect.alias, &config.query.notebook_function)) {
        return UnitKind::Sql;
    }
    if !unit.body.is_empty()
        && unit
            .body
            .iter()
            .all(|s| matches!(s.kind, StatementKind::Import(_)))
    {
        return UnitKind::ImportOnly;
    }
    if !exports && sole.and_then(|s| pattern::markdown_text(s, dialect)).is_some() {
        return UnitKind::Markdown;
    }
    if !exports
        && sole.is_some_and(|s| {
            pattern::is_display_expression(&s.text) || pattern::is_namespace_call(&s.text, &dialect.alias)
        })
    {
        return UnitKind::DisplayOnly;
    }
    UnitKind::Code
}

/// Kind of a pipeline asset: SQL when its only statement, apart from a
/// final `return name`, runs the query call.
pub(crate) fn pipeline(unit: &Unit, config: &ConversionConfig) -> UnitKind {
    let query = &config.query;
    let mut statements: Vec<&Statement> = unit.body.iter().collect();
    if let Some(StatementKind::Return(Some(value))) = statements.last().map(|s| &s.kind) {
        if is_plain_name(value) && statements.len() > 1 {
            statements.pop();
        }
    }
    match statements.as_slice() {
        [only] if has_query_call(only, &query.pipeline_module, &query.pipeline_function) => {
            UnitKind::Sql
        }
        _ => UnitKind::Code,
    }
}

fn has_query_call(statement: &Statement, object: &str, function: &str) -> bool {
    pattern::query_calls(&statement.text, object, function)
        .iter()
        .any(|c| matches!(c, QueryCall::Call(_)))
}

fn is_plain_name(text: &str) -> bool {
    !text.is_empty()
        && !text.starts_with(|c: char| c.is_ascii_digit())
        && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}
