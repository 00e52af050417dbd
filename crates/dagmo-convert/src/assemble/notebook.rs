//! Notebook emission.

use dagmo_core::python::literal;
use dagmo_core::{ConversionConfig, DecoratorArg, Module, Unit};

use super::{INDENT, body, header, join};

/// Emits a notebook from rewritten cells.
pub(crate) struct NotebookGenerator<'a> {
    config: &'a ConversionConfig,
}

impl<'a> NotebookGenerator<'a> {
    pub(crate) fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    pub(crate) fn generate(&self, module: &Module) -> String {
        let dialect = &self.config.notebook;
        let mut sections = header(module);
        sections.push(format!(
            "import {package}\n\n__generated_with = {version}\n{app} = {package}.App({options})",
            package = dialect.package,
            version = literal::quoted(&dialect.generated_with),
            app = dialect.app_name,
            options = dialect.app_options,
        ));
        sections.push(self.import_cell(module));

        for unit in &module.units {
            if let Some(doc) = &unit.doc {
                sections.push(self.markdown_cell(doc));
            }
            sections.push(self.cell(unit));
        }

        sections.push(format!(
            "if __name__ == \"__main__\":\n{INDENT}{}.run()",
            dialect.app_name
        ));
        join(sections)
    }

    fn decorator(&self, args: &[String]) -> String {
        let dialect = &self.config.notebook;
        if args.is_empty() {
            format!("@{}.{}", dialect.app_name, dialect.cell_decorator)
        } else {
            format!("@{}.{}({})", dialect.app_name, dialect.cell_decorator, args.join(", "))
        }
    }

    /// The first cell: the notebook package and every module import.
    fn import_cell(&self, module: &Module) -> String {
        let alias = &self.config.notebook.alias;
        let mut lines = vec![
            self.decorator(&[]),
            "def _():".to_string(),
            format!("{INDENT}import {} as {alias}", self.config.notebook.package),
        ];
        let mut names = vec![alias.clone()];
        for import in &module.imports {
            lines.push(format!("{INDENT}{}", import.render()));
            for name in import.bound_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        lines.push(format!("{INDENT}{}", returns(&names)));
        lines.join("\n")
    }

    fn markdown_cell(&self, text: &str) -> String {
        let alias = &self.config.notebook.alias;
        let function = &self.config.notebook.markdown_function;
        let hidden = self
            .config
            .notebook
            .framework_args
            .iter()
            .find(|a| *a == "hide_code")
            .map(|a| format!("{a}=True"));
        let mut lines = vec![
            self.decorator(hidden.as_slice()),
            format!("def _({alias}):"),
        ];

        if text.contains("\"\"\"") || text.ends_with('"') {
            lines.push(format!(
                "{INDENT}{alias}.{function}({})",
                literal::docstring(text, INDENT)
            ));
        } else {
            lines.push(format!("{INDENT}{alias}.{function}("));
            lines.push(format!("{INDENT}{INDENT}r\"\"\""));
            for line in text.split('\n') {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{INDENT}{line}"));
                }
            }
            lines.push(format!("{INDENT}\"\"\""));
            lines.push(format!("{INDENT})"));
        }
        lines.push(format!("{INDENT}return"));
        lines.join("\n")
    }

    fn cell(&self, unit: &Unit) -> String {
        let args: Vec<String> = unit.decorator_args.iter().map(DecoratorArg::render).collect();
        let function = if unit.outputs.first() == Some(&unit.name) {
            "_"
        } else {
            unit.name.as_str()
        };
        let params: Vec<&str> = unit.params.iter().map(|p| p.name.as_str()).collect();
        let prefix = if unit.is_async { "async " } else { "" };

        let mut lines = vec![
            self.decorator(&args),
            format!("{prefix}def {function}({}):", params.join(", ")),
        ];
        lines.extend(body(&unit.body));
        lines.push(format!("{INDENT}{}", returns(&unit.outputs)));
        lines.join("\n")
    }
}

/// The final statement of a cell exporting `names`.
fn returns(names: &[String]) -> String {
    match names {
        [] => "return".to_string(),
        [only] => format!("return ({only},)"),
        _ => format!("return ({})", names.join(", ")),
    }
}
