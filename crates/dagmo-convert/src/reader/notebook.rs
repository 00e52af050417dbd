//! Reader for marimo notebooks.

use dagmo_core::python::call::{Call, tuple_items};
use dagmo_core::python::{
    FunctionDef, ItemKind, StatementKind, is_main_guard, parse_module, simple_assignment,
};
use dagmo_core::{
    ArgRole, Construct, ConversionConfig, DecoratorShape, Diagnostics, Module, ParamRole, Result,
    ScriptMetadata, Unit, UnitParam, unit_name,
};
use tracing::{debug, trace};

use super::{decorator_args, dep_names, is_identifier};

/// Read a notebook into a module whose units are the notebook cells, in
/// source order and not yet classified.
pub(crate) fn read(source: &str, config: &ConversionConfig, diagnostics: &mut Diagnostics) -> Result<Module> {
    let parsed = parse_module(source)?;
    let dialect = &config.notebook;

    let mut module = Module {
        preamble: parsed.docstring,
        metadata: ScriptMetadata::extract(source),
        ..Default::default()
    };

    for item in parsed.items {
        match item.kind {
            ItemKind::Import(imports) => {
                for import in imports {
                    if import.root_module() == dialect.package {
                        continue;
                    }
                    if import.is_star() {
                        diagnostics.module(
                            Construct::StarImport,
                            format!("`{}` hides which names it binds", import.render()),
                        );
                    }
                    module.add_import(import);
                }
            }
            ItemKind::Function(function) => {
                let shape = DecoratorShape::find(
                    function
                        .decorators
                        .iter()
                        .map(|d| DecoratorShape::notebook(d, dialect)),
                );
                match shape {
                    DecoratorShape::NotebookCell { args } => {
                        let order_index = module.units.len();
                        let unit = cell(function, args, order_index, config);
                        trace!("Read cell {} at line {}", unit.name, unit.line);
                        module.units.push(unit);
                    }
                    _ => diagnostics.module(
                        Construct::TopLevelStatement,
                        format!(
                            "function `{}` at line {} is not a notebook cell and was dropped",
                            function.name, function.line
                        ),
                    ),
                }
            }
            ItemKind::Class(class) => diagnostics.module(
                Construct::TopLevelStatement,
                format!("class `{}` at line {} was dropped", class.name, class.line),
            ),
            ItemKind::Other => {
                if !is_boilerplate(&item.text, config) {
                    diagnostics.module(
                        Construct::TopLevelStatement,
                        format!("statement at line {} was dropped", item.line),
                    );
                }
            }
        }
    }

    debug!("Read {} notebook cells", module.units.len());
    Ok(module)
}

fn cell(
    function: FunctionDef,
    args: Vec<dagmo_core::python::Argument>,
    order_index: usize,
    config: &ConversionConfig,
) -> Unit {
    let mut body = function.body;
    let outputs = match body.last().map(|s| &s.kind) {
        Some(StatementKind::Return(value)) => {
            let outputs = value
                .as_deref()
                .map(|v| {
                    tuple_items(v)
                        .into_iter()
                        .filter(|name| is_identifier(name) && !name.starts_with('_'))
                        .collect()
                })
                .unwrap_or_default();
            body.pop();
            outputs
        }
        _ => Vec::new(),
    };

    let decorator_args = decorator_args(args, |key| ArgRole::notebook(key, config));
    let deps = decorator_args
        .iter()
        .find(|a| a.key.as_deref() == Some("deps"))
        .map(|a| dep_names(&a.value).0)
        .unwrap_or_default();

    let params = function
        .params
        .iter()
        .map(|p| UnitParam {
            name: p.name.clone(),
            role: ParamRole::notebook(p, config),
        })
        .collect();

    Unit {
        name: unit_name(&function.name, &outputs, order_index),
        function: function.name,
        is_async: function.is_async,
        params,
        body,
        deps,
        outputs,
        decorator_args,
        order_index,
        line: function.line,
        ..Default::default()
    }
}

/// The `__generated_with` line, the app constructor and the main guard.
fn is_boilerplate(text: &str, config: &ConversionConfig) -> bool {
    match simple_assignment(text) {
        Some(("__generated_with", _)) => true,
        Some((target, value)) if target == config.notebook.app_name => Call::parse(value)
            .is_some_and(|call| call.path.first().map(String::as_str) == Some(config.notebook.package.as_str())),
        _ => is_main_guard(text),
    }
}
