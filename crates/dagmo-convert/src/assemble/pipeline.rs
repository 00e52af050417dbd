//! Pipeline module emission.

use dagmo_core::python::literal;
use dagmo_core::{ConversionConfig, DecoratorArg, Module, Unit};

use super::{INDENT, body, header, join};

/// Longest `Definitions` line kept on one line.
const LINE_WIDTH: usize = 88;

/// Emits a pipeline module from rewritten assets.
pub(crate) struct PipelineGenerator<'a> {
    config: &'a ConversionConfig,
}

impl<'a> PipelineGenerator<'a> {
    pub(crate) fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    pub(crate) fn generate(&self, module: &Module) -> String {
        let dialect = &self.config.pipeline;
        let mut sections = header(module);

        let mut imports = vec![format!("import {} as {}", dialect.package, dialect.alias)];
        imports.extend(module.imports.iter().map(|i| i.render()));
        sections.push(imports.join("\n"));

        sections.extend(module.units.iter().map(|unit| self.asset(unit)));

        if self.config.emit_definitions && !module.units.is_empty() {
            sections.push(self.definitions(&module.units));
        }
        join(sections)
    }

    fn asset(&self, unit: &Unit) -> String {
        let mut lines = vec![self.decorator(unit)];
        let params: Vec<&str> = unit.params.iter().map(|p| p.name.as_str()).collect();
        let prefix = if unit.is_async { "async " } else { "" };
        lines.push(format!("{prefix}def {}({}):", unit.name, params.join(", ")));
        if let Some(doc) = &unit.doc {
            lines.push(format!("{INDENT}{}", literal::docstring(doc, INDENT)));
        }
        let statements = body(&unit.body);
        if statements.is_empty() && unit.doc.is_none() {
            lines.push(format!("{INDENT}pass"));
        }
        lines.extend(statements);
        lines.join("\n")
    }

    fn decorator(&self, unit: &Unit) -> String {
        let dialect = &self.config.pipeline;
        let args: Vec<String> = unit.decorator_args.iter().map(DecoratorArg::render).collect();

        if !unit.multi_output {
            let name = format!("@{}.{}", dialect.alias, dialect.asset_decorator);
            return if args.is_empty() { name } else { format!("{name}({})", args.join(", ")) };
        }

        let mut lines = vec![format!("@{}.{}(", dialect.alias, dialect.multi_asset_decorator)];
        lines.push(format!("{INDENT}outs={{"));
        for output in &unit.outputs {
            lines.push(format!(
                "{INDENT}{INDENT}{}: {}.{}(),",
                literal::quoted(output),
                dialect.alias,
                dialect.asset_out
            ));
        }
        lines.push(format!("{INDENT}}},"));
        for arg in args {
            lines.push(format!("{INDENT}{arg},"));
        }
        lines.push(")".to_string());
        lines.join("\n")
    }

    fn definitions(&self, units: &[Unit]) -> String {
        let dialect = &self.config.pipeline;
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        let line = format!(
            "defs = {}.{}(assets=[{}])",
            dialect.alias,
            dialect.definitions,
            names.join(", ")
        );
        if line.len() <= LINE_WIDTH {
            return line;
        }
        let mut lines = vec![
            format!("defs = {}.{}(", dialect.alias, dialect.definitions),
            format!("{INDENT}assets=["),
        ];
        lines.extend(names.iter().map(|n| format!("{INDENT}{INDENT}{n},")));
        lines.push(format!("{INDENT}],"));
        lines.push(")".to_string());
        lines.join("\n")
    }
}
