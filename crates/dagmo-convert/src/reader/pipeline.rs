//! Reader for dagster asset modules.

use dagmo_core::python::call::{Call, dict_string_keys, sequence_items, string_expression};
use dagmo_core::python::{
    ClassDef, FunctionDef, ItemKind, StatementKind, is_main_guard, literal, parse_module,
    simple_assignment,
};
use dagmo_core::{
    ArgRole, Construct, ConversionConfig, DecoratorShape, Diagnostics, FrameworkScope, Module,
    ParamRole, Result, ScriptMetadata, Unit, UnitParam, unit_name,
};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::{decorator_args, dep_names, is_identifier};

/// A read pipeline module with the names bound to the framework package.
pub(crate) struct PipelineSource {
    pub module: Module,
    pub scope: FrameworkScope,
}

/// Read an asset module. Units are the asset functions, in source order.
pub(crate) fn read(
    source: &str,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<PipelineSource> {
    let parsed = parse_module(source)?;
    let dialect = &config.pipeline;

    let mut module = Module {
        preamble: parsed.docstring,
        metadata: ScriptMetadata::extract(source),
        ..Default::default()
    };

    // Imports and resource classes first, so decorators and annotations
    // resolve regardless of where they appear.
    let mut scope = FrameworkScope::new(&dialect.package);
    let mut resources: FxHashSet<String> = FxHashSet::default();
    for item in &parsed.items {
        match &item.kind {
            ItemKind::Import(imports) => {
                for import in imports {
                    if import.is_star() {
                        diagnostics.module(
                            Construct::StarImport,
                            format!("`{}` hides which names it binds", import.render()),
                        );
                    }
                    if !scope.observe(import) {
                        module.add_import(import.clone());
                    }
                }
            }
            ItemKind::Class(class) if is_resource_class(class, &scope, config) => {
                resources.insert(class.name.clone());
            }
            _ => {}
        }
    }

    for item in parsed.items {
        match item.kind {
            ItemKind::Import(_) => {}
            ItemKind::Function(function) => {
                let shape = DecoratorShape::find(
                    function
                        .decorators
                        .iter()
                        .map(|d| DecoratorShape::pipeline(d, &scope, dialect)),
                );
                let (args, multi) = match shape {
                    DecoratorShape::Asset { args } => (args, false),
                    DecoratorShape::MultiAsset { args } => (args, true),
                    _ => {
                        diagnostics.module(
                            Construct::TopLevelStatement,
                            format!(
                                "function `{}` at line {} is not an asset and was dropped",
                                function.name, function.line
                            ),
                        );
                        continue;
                    }
                };
                let order_index = module.units.len();
                let unit = asset(function, args, multi, order_index, &resources, config, diagnostics);
                trace!("Read asset {} at line {}", unit.name, unit.line);
                module.units.push(unit);
            }
            ItemKind::Class(class) => {
                let what = if resources.contains(&class.name) { "resource class" } else { "class" };
                diagnostics.module(
                    Construct::TopLevelStatement,
                    format!("{what} `{}` at line {} was dropped", class.name, class.line),
                );
            }
            ItemKind::Other => {
                if is_main_guard(&item.text) {
                    continue;
                }
                if let Some(call) = definitions_call(&item.text, &scope, config) {
                    for arg in call.args.iter().filter(|a| a.keyword.as_deref() != Some("assets")) {
                        diagnostics.module(
                            Construct::DefinitionsArgument,
                            format!("`{}` of the definitions object was dropped", arg.render()),
                        );
                    }
                    continue;
                }
                diagnostics.module(
                    Construct::TopLevelStatement,
                    format!("statement at line {} was dropped", item.line),
                );
            }
        }
    }

    debug!("Read {} assets", module.units.len());
    Ok(PipelineSource { module, scope })
}

fn asset(
    function: FunctionDef,
    args: Vec<dagmo_core::python::Argument>,
    multi: bool,
    order_index: usize,
    resources: &FxHashSet<String>,
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Unit {
    let mut body = function.body;
    let doc = match body.first().map(|s| &s.kind) {
        Some(StatementKind::Literal(value)) => {
            let doc = literal::cleandoc(value);
            let docstring = body.remove(0);
            if let Some(next) = body.first_mut() {
                let mut leading = docstring.leading;
                leading.append(&mut next.leading);
                next.leading = leading;
            }
            Some(doc)
        }
        _ => None,
    };

    let mut decorator_args = decorator_args(args, |key| ArgRole::pipeline(key, multi, config));
    let mut name = unit_name(&function.name, &[], order_index);
    if !multi {
        for arg in decorator_args.iter_mut().filter(|a| a.role == ArgRole::Structural) {
            match asset_key(&arg.value) {
                Some(key) => name = key,
                None => arg.role = ArgRole::Unrecognized,
            }
        }
    }

    let outputs = if multi {
        decorator_args
            .iter()
            .find(|a| a.role == ArgRole::Structural)
            .map(|a| dict_string_keys(&a.value))
            .unwrap_or_default()
    } else {
        vec![name.clone()]
    };

    let deps = match decorator_args.iter().find(|a| a.key.as_deref() == Some("deps")) {
        Some(arg) => {
            let (names, opaque) = dep_names(&arg.value);
            for entry in opaque {
                diagnostics.push(
                    &name,
                    Construct::UnresolvedUpstream,
                    format!("dependency `{entry}` is not a plain asset name"),
                );
            }
            names
        }
        None => Vec::new(),
    };

    let params = function
        .params
        .iter()
        .map(|p| UnitParam {
            name: p.name.clone(),
            role: ParamRole::pipeline(p, resources, config),
        })
        .collect();

    let mut unit = Unit {
        function: function.name,
        is_async: function.is_async,
        name,
        params,
        body,
        deps,
        outputs,
        multi_output: multi,
        doc,
        decorator_args,
        order_index,
        line: function.line,
        ..Default::default()
    };
    unit.trim_leading_blank_lines();
    unit
}

/// Asset name given by a static `name="..."` or `key=...` value. A key
/// path names the asset by its last segment.
fn asset_key(value: &str) -> Option<String> {
    let key = string_expression(value).or_else(|| {
        sequence_items(value)
            .last()
            .and_then(|segment| string_expression(segment))
    })?;
    is_identifier(&key).then_some(key)
}

fn is_resource_class(class: &ClassDef, scope: &FrameworkScope, config: &ConversionConfig) -> bool {
    class.bases.iter().any(|base| {
        let path: Vec<String> = base.split('.').map(|s| s.trim().to_string()).collect();
        let member = scope
            .member(&path)
            .map(str::to_string)
            .or_else(|| path.last().cloned())
            .unwrap_or_default();
        config.pipeline.resource_bases.contains(&member)
    })
}

/// The call of `defs = dg.Definitions(...)`.
fn definitions_call(text: &str, scope: &FrameworkScope, config: &ConversionConfig) -> Option<Call> {
    let (_, value) = simple_assignment(text)?;
    let call = Call::parse(value)?;
    (scope.member(&call.path) == Some(config.pipeline.definitions.as_str())).then_some(call)
}
