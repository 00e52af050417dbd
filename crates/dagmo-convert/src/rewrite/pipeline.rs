//! Notebook to pipeline rewriting.

use dagmo_core::pattern;
use dagmo_core::python::{ImportItem, Statement, StatementKind, literal};
use dagmo_core::{
    Construct, ConversionConfig, Diagnostics, Module, Result, Unit, UnitKind, UnitParam,
};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::{QueryRewrite, carry_decorator_args, flag_early_returns, strip_context};

/// Turn a resolved notebook into a pipeline module whose units are the
/// assets in `order`.
pub(crate) fn rewrite(
    module: Module,
    order: &[usize],
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Module> {
    let mut out = Module {
        preamble: module.preamble,
        imports: module.imports,
        ..Default::default()
    };

    // Source order decides imports and markdown pairing; `order` only
    // decides where assets land.
    let mut docs: FxHashMap<usize, String> = FxHashMap::default();
    let mut units: Vec<Option<Unit>> = Vec::with_capacity(module.units.len());
    for mut unit in module.units {
        match unit.kind {
            UnitKind::ImportOnly => merge_imports(&mut out, &unit, config, diagnostics),
            UnitKind::Code | UnitKind::Sql => hoist_imports(&mut out, &mut unit, config, diagnostics),
            UnitKind::Markdown => {}
            UnitKind::Ui | UnitKind::DisplayOnly => {
                trace!("Dropping {} cell {}", unit.kind, unit.name);
            }
        }
        units.push(Some(unit));
    }
    for i in 0..units.len() {
        let Some(text) = units[i]
            .as_ref()
            .filter(|u| u.kind == UnitKind::Markdown)
            .and_then(|u| u.body.first())
            .and_then(|s| pattern::markdown_text(s, &config.notebook))
        else {
            continue;
        };
        let text = literal::cleandoc(&text);
        let paired = units
            .get(i + 1)
            .and_then(Option::as_ref)
            .is_some_and(|next| next.kind.is_convertible());
        if paired {
            docs.insert(i + 1, text);
        } else {
            out.append_preamble(&text);
        }
    }

    let mut queries = 0;
    for &i in order {
        let Some(mut unit) = units.get_mut(i).and_then(Option::take) else {
            continue;
        };
        unit.doc = docs.remove(&i);
        queries += QueryRewrite::to_pipeline(config).apply(&mut unit, diagnostics)?;
        strip_context(&mut unit, config, diagnostics);
        unit.trim_leading_blank_lines();
        flag_early_returns(&unit.name, &unit.body, diagnostics);

        let text = unit.body_text();
        let alias = &config.notebook.alias;
        if pattern::references(&text, alias) {
            let uses: Vec<String> = pattern::attribute_uses(&text, alias)
                .into_iter()
                .map(|attr| format!("`{alias}.{attr}`"))
                .collect();
            let what = if uses.is_empty() { format!("`{alias}`") } else { uses.join(", ") };
            diagnostics.push(
                unit.name.as_str(),
                Construct::NotebookApi,
                format!("{what} has no pipeline counterpart and was kept"),
            );
        }

        unit.decorator_args = carry_decorator_args(&unit, diagnostics);
        unit.params = unit.reads.iter().map(UnitParam::data).collect();
        if !unit.outputs.is_empty() {
            unit.body
                .push(Statement::parse(format!("return {}", unit.outputs.join(", ")))?);
        }
        out.units.push(unit);
    }

    if queries > 0 {
        let duckdb = ImportItem {
            module: config.query.pipeline_module.clone(),
            names: None,
            alias: None,
        };
        let rendered = duckdb.render();
        out.imports.retain(|i| i.render() != rendered);
        out.imports.insert(0, duckdb);
    }

    let has_units = !out.units.is_empty();
    out.metadata = module.metadata.map(|m| {
        m.translate(&config.notebook.package, &config.pipeline.package, has_units)
    });

    debug!("Rewrote {} assets", out.units.len());
    Ok(out)
}

fn merge_imports(out: &mut Module, unit: &Unit, config: &ConversionConfig, diagnostics: &mut Diagnostics) {
    for statement in &unit.body {
        if let StatementKind::Import(items) = &statement.kind {
            add_imports(out, &unit.name, items, config, diagnostics);
        }
    }
}

/// Move the imports of a code cell to the module import block.
fn hoist_imports(out: &mut Module, unit: &mut Unit, config: &ConversionConfig, diagnostics: &mut Diagnostics) {
    let mut body: Vec<Statement> = Vec::with_capacity(unit.body.len());
    let mut carried: Vec<String> = Vec::new();
    for mut statement in std::mem::take(&mut unit.body) {
        if let StatementKind::Import(items) = &statement.kind {
            add_imports(out, &unit.name, items, config, diagnostics);
            carried.append(&mut statement.leading);
            continue;
        }
        if !carried.is_empty() {
            carried.append(&mut statement.leading);
            statement.leading = std::mem::take(&mut carried);
        }
        body.push(statement);
    }
    unit.body = body;
}

fn add_imports(
    out: &mut Module,
    unit: &str,
    items: &[ImportItem],
    config: &ConversionConfig,
    diagnostics: &mut Diagnostics,
) {
    for item in items {
        if item.root_module() == config.notebook.package {
            continue;
        }
        if item.is_star() {
            diagnostics.push(
                unit,
                Construct::StarImport,
                format!("`{}` hides which names it binds", item.render()),
            );
        }
        out.add_import(item.clone());
    }
}
