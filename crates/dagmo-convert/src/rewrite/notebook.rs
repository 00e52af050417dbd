//! Pipeline to notebook rewriting.

use dagmo_core::pattern::{self, FrameworkScope};
use dagmo_core::python::call::tuple_items;
use dagmo_core::python::{Statement, analyze};
use dagmo_core::{
    Construct, ConversionConfig, Diagnostics, Module, ParamRole, Result, Unit, UnitParam,
};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::{QueryRewrite, carry_decorator_args, flag_early_returns, strip_context};

/// Turn a resolved pipeline module into a notebook whose cells are the
/// assets in `order`.
pub(crate) fn rewrite(
    module: Module,
    scope: &FrameworkScope,
    order: &[usize],
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Module> {
    let imported: FxHashSet<String> = module
        .imports
        .iter()
        .flat_map(|i| i.bound_names())
        .collect();

    let mut units: Vec<Option<Unit>> = module.units.into_iter().map(Some).collect();
    let mut cells = Vec::with_capacity(units.len());
    for &i in order {
        let Some(mut unit) = units.get_mut(i).and_then(Option::take) else {
            continue;
        };
        QueryRewrite::to_notebook(config).apply(&mut unit, diagnostics)?;
        strip_context(&mut unit, config, diagnostics);
        drop_resources(&mut unit, diagnostics);
        finish_body(&mut unit, diagnostics)?;
        unit.trim_leading_blank_lines();

        let text = unit.body_text();
        let uses = scope.uses(&text);
        if !uses.is_empty() {
            let names: Vec<String> = uses.iter().map(|u| format!("`{u}`")).collect();
            diagnostics.push(
                unit.name.as_str(),
                Construct::FrameworkApi,
                format!("{} has no notebook counterpart and was kept", names.join(", ")),
            );
        }

        unit.decorator_args = carry_decorator_args(&unit, diagnostics);

        let bindings = analyze(&text).map_err(|e| e.offset_line(unit.line))?;
        let mut params: Vec<String> = unit.reads.iter().cloned().collect();
        params.extend(
            bindings
                .free
                .iter()
                .filter(|n| imported.contains(n.as_str()))
                .cloned(),
        );
        if pattern::references(&text, &config.notebook.alias) {
            params.push(config.notebook.alias.clone());
        }
        params.sort();
        params.dedup();
        unit.params = params
            .into_iter()
            .map(|name| {
                let role = if name == config.notebook.alias {
                    ParamRole::NotebookModule
                } else {
                    ParamRole::Data
                };
                UnitParam { name, role }
            })
            .collect();

        trace!("Rewrote {} into a cell", unit.name);
        cells.push(unit);
    }

    let module_name = &config.query.pipeline_module;
    let mut imports = module.imports;
    if !cells
        .iter()
        .any(|c| pattern::references(&c.body_text(), module_name))
    {
        imports.retain(|i| !(i.names.is_none() && i.module == *module_name && i.alias.is_none()));
    }

    let has_units = !cells.is_empty();
    let metadata = module.metadata.map(|m| {
        m.translate(&config.pipeline.package, &config.notebook.package, has_units)
    });

    debug!("Rewrote {} cells", cells.len());
    Ok(Module {
        preamble: module.preamble,
        metadata,
        imports,
        units: cells,
    })
}

fn drop_resources(unit: &mut Unit, diagnostics: &mut Diagnostics) {
    for name in unit.params_with(ParamRole::Resource) {
        diagnostics.push(
            unit.name.as_str(),
            Construct::ResourceParameter,
            format!("resource `{name}` is provided by the pipeline and was dropped"),
        );
    }
    unit.params.retain(|p| p.role != ParamRole::Resource);
}

/// Translate the final `return` into the assignment a cell exports.
fn finish_body(unit: &mut Unit, diagnostics: &mut Diagnostics) -> Result<()> {
    let last_is_return = unit.body.last().is_some_and(Statement::is_return);
    let checked = if last_is_return { unit.body.len() - 1 } else { unit.body.len() };
    flag_early_returns(&unit.name, &unit.body[..checked], diagnostics);

    let returned = if last_is_return { unit.body.pop() } else { None };
    let Some(statement) = returned else {
        if !unit.outputs.is_empty() {
            unit.body
                .push(Statement::parse(format!("{} = None", unit.outputs.join(" = ")))?);
        }
        return Ok(());
    };

    let expr = statement
        .text
        .trim_start()
        .strip_prefix("return")
        .unwrap_or_default()
        .trim();
    if expr.is_empty() || unit.outputs.is_empty() {
        return Ok(());
    }

    let target = if unit.multi_output {
        if tuple_items(expr) == unit.outputs {
            return Ok(());
        }
        unit.outputs.join(", ")
    } else {
        if expr == unit.name {
            return Ok(());
        }
        unit.name.clone()
    };
    let mut assignment = Statement::parse(format!("{target} = {expr}"))?;
    assignment.leading = statement.leading;
    unit.body.push(assignment);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagmo_core::UnitKind;
    use dagmo_core::python::ImportItem;
    use std::collections::BTreeSet;

    fn asset(name: &str, body: &[&str]) -> Unit {
        Unit {
            kind: UnitKind::Code,
            name: name.to_string(),
            function: name.to_string(),
            body: body.iter().map(|s| Statement::parse(*s).unwrap()).collect(),
            outputs: vec![name.to_string()],
            ..Default::default()
        }
    }

    fn rewrite_one(unit: Unit, imports: Vec<ImportItem>) -> (Module, Diagnostics) {
        let mut scope = FrameworkScope::new("dagster");
        scope.observe(&ImportItem {
            module: "dagster".to_string(),
            names: None,
            alias: Some("dg".to_string()),
        });
        let module = Module {
            imports,
            units: vec![unit],
            ..Default::default()
        };
        let mut diagnostics = Diagnostics::new();
        let out = rewrite(module, &scope, &[0], &ConversionConfig::default(), &mut diagnostics).unwrap();
        (out, diagnostics)
    }

    fn polars() -> ImportItem {
        ImportItem {
            module: "polars".to_string(),
            names: None,
            alias: Some("pl".to_string()),
        }
    }

    #[test]
    fn test_return_becomes_assignment() {
        let mut orders = asset("orders", &["return pl.read_csv(\"orders.csv\")"]);
        orders.body[0].leading = vec!["# read it".to_string()];
        let (out, diagnostics) = rewrite_one(orders, vec![polars()]);
        assert!(diagnostics.is_empty());
        let cell = &out.units[0];
        assert_eq!(cell.body.len(), 1);
        assert_eq!(cell.body[0].text, "orders = pl.read_csv(\"orders.csv\")");
        assert_eq!(cell.body[0].leading, vec!["# read it"]);
        let params: Vec<_> = cell.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["pl"]);
    }

    #[test]
    fn test_return_of_own_name_is_dropped() {
        let (out, _) = rewrite_one(asset("x", &["x = 1", "return x"]), vec![]);
        assert_eq!(out.units[0].body.len(), 1);
        assert_eq!(out.units[0].body[0].text, "x = 1");
    }

    #[test]
    fn test_multi_asset_return() {
        let mut split = asset("split", &["small, large = orders.head(), orders.tail()", "return small, large"]);
        split.multi_output = true;
        split.outputs = vec!["small".to_string(), "large".to_string()];
        split.reads = BTreeSet::from(["orders".to_string()]);
        let (out, _) = rewrite_one(split, vec![]);
        let cell = &out.units[0];
        assert_eq!(cell.body.len(), 1);
        assert_eq!(cell.params[0].name, "orders");

        let mut split = asset("split", &["return orders.head(), orders.tail()"]);
        split.multi_output = true;
        split.outputs = vec!["small".to_string(), "large".to_string()];
        let (out, _) = rewrite_one(split, vec![]);
        assert_eq!(
            out.units[0].body[0].text,
            "small, large = orders.head(), orders.tail()"
        );
    }

    #[test]
    fn test_consumed_asset_without_return() {
        let (out, _) = rewrite_one(asset("marker", &["print(1)"]), vec![]);
        assert_eq!(out.units[0].body[1].text, "marker = None");
    }

    #[test]
    fn test_flags_framework_leftovers() {
        let mut unit = asset(
            "orders",
            &[
                "if warehouse is None:\n    return None",
                "context.log.info(\"x\")",
                "return dg.MaterializeResult()",
            ],
        );
        unit.params = vec![
            UnitParam {
                name: "context".to_string(),
                role: ParamRole::Context,
            },
            UnitParam {
                name: "warehouse".to_string(),
                role: ParamRole::Resource,
            },
        ];
        let (out, diagnostics) = rewrite_one(unit, vec![]);
        let constructs: Vec<_> = diagnostics.warnings().iter().map(|w| w.construct).collect();
        assert_eq!(
            constructs,
            vec![
                Construct::ResourceParameter,
                Construct::EarlyReturn,
                Construct::FrameworkApi,
            ]
        );
        assert!(out.units[0].params.is_empty());
    }

    #[test]
    fn test_query_rewrite_and_duckdb_import() {
        let duckdb = ImportItem {
            module: "duckdb".to_string(),
            names: None,
            alias: None,
        };
        let (out, _) = rewrite_one(
            asset("one", &["return duckdb.sql(\"select 1\")"]),
            vec![duckdb, polars()],
        );
        assert_eq!(out.units[0].body[0].text, "one = mo.sql(\"select 1\")");
        assert_eq!(out.units[0].params[0].name, "mo");
        assert_eq!(out.imports, vec![polars()]);
    }

    #[test]
    fn test_stripped_log_leaves_no_blank_line() {
        let mut unit = asset("orders", &["context.log.info(\"start\")", "return load()"]);
        unit.body[1].leading = vec![String::new()];
        unit.params = vec![UnitParam {
            name: "context".to_string(),
            role: ParamRole::Context,
        }];
        let (out, _) = rewrite_one(unit, vec![]);
        assert_eq!(out.units[0].body_text(), "orders = load()");
    }
}
