//! Recognized source shapes.
//!
//! Every rewrite rule starts by matching one of the closed shapes below
//! against parsed source. Shapes that match nothing fall into an explicit
//! opaque variant, which the converter passes through and reports.

use std::ops::Range;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::{ConversionConfig, NotebookDialect, PipelineDialect};
use tree_sitter::Node;

use crate::python::call::{Argument, Call, dotted_name, string_expression};
use crate::python::literal;
use crate::python::tree::{self, descendants, is_field_of, named_children, single_expression};
use crate::python::{Decorator, ImportItem, Param, Statement, StatementKind};

/// Shape of a decorator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoratorShape {
    /// `@app.cell` or `@app.cell(...)`.
    NotebookCell { args: Vec<Argument> },
    /// `@dg.asset` or `@dg.asset(...)`.
    Asset { args: Vec<Argument> },
    /// `@dg.multi_asset(...)`.
    MultiAsset { args: Vec<Argument> },
    Opaque,
}

impl DecoratorShape {
    pub fn notebook(decorator: &Decorator, dialect: &NotebookDialect) -> Self {
        match decorator.path.as_slice() {
            [app, cell] if *app == dialect.app_name && *cell == dialect.cell_decorator => {
                Self::NotebookCell {
                    args: decorator.args.clone().unwrap_or_default(),
                }
            }
            _ => Self::Opaque,
        }
    }

    pub fn pipeline(decorator: &Decorator, scope: &FrameworkScope, dialect: &PipelineDialect) -> Self {
        let args = decorator.args.clone().unwrap_or_default();
        match scope.member(&decorator.path) {
            Some(member) if member == dialect.asset_decorator => Self::Asset { args },
            Some(member) if member == dialect.multi_asset_decorator => Self::MultiAsset { args },
            _ => Self::Opaque,
        }
    }

    /// Find the first recognized decorator of a definition.
    pub fn find(shapes: impl IntoIterator<Item = Self>) -> Self {
        shapes
            .into_iter()
            .find(|s| !matches!(s, Self::Opaque))
            .unwrap_or(Self::Opaque)
    }
}

/// How a decorator argument is carried across a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgRole {
    /// Same meaning in both forms; copied verbatim.
    Recognized,
    /// Only meaningful to the notebook editor; dropped silently.
    FrameworkOnly,
    /// Consumed by the converter itself (`outs=`, or the `name=` and
    /// `key=` of a single asset).
    Structural,
    /// Preserved verbatim and reported.
    Unrecognized,
}

impl ArgRole {
    pub fn notebook(key: Option<&str>, config: &ConversionConfig) -> Self {
        match key {
            Some(key) if config.is_recognized_arg(key) => Self::Recognized,
            Some(key) if config.notebook.framework_args.iter().any(|a| a == key) => {
                Self::FrameworkOnly
            }
            _ => Self::Unrecognized,
        }
    }

    pub fn pipeline(key: Option<&str>, multi: bool, config: &ConversionConfig) -> Self {
        match key {
            Some("outs") if multi => Self::Structural,
            Some("name" | "key") if !multi => Self::Structural,
            Some(key) if config.is_recognized_arg(key) => Self::Recognized,
            _ => Self::Unrecognized,
        }
    }
}

/// What a function parameter stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// An upstream value.
    Data,
    /// The pipeline execution context.
    Context,
    /// An injected pipeline resource.
    Resource,
    /// The notebook package alias (`mo`).
    NotebookModule,
}

impl ParamRole {
    pub fn notebook(param: &Param, config: &ConversionConfig) -> Self {
        if param.name == config.notebook.alias {
            Self::NotebookModule
        } else if is_context_param(param, &config.pipeline) {
            Self::Context
        } else {
            Self::Data
        }
    }

    /// `resources` holds resource classes defined in the module itself.
    pub fn pipeline(param: &Param, resources: &FxHashSet<String>, config: &ConversionConfig) -> Self {
        if is_context_param(param, &config.pipeline) {
            return Self::Context;
        }
        let resource = param
            .annotation
            .as_deref()
            .and_then(annotation_class)
            .is_some_and(|class| {
                resources.contains(&class)
                    || config.pipeline.resource_bases.contains(&class)
                    || class.ends_with("Resource")
            });
        if resource { Self::Resource } else { Self::Data }
    }
}

fn is_context_param(param: &Param, dialect: &PipelineDialect) -> bool {
    if param.name == dialect.context_param {
        return true;
    }
    // Any mention counts, so `Optional[dg.AssetExecutionContext]` does too.
    param.annotation.as_deref().is_some_and(|annotation| {
        let Ok(tree) = tree::parse(annotation) else {
            return false;
        };
        descendants(tree.root_node()).into_iter().any(|node| {
            node.kind() == "identifier"
                && dialect.context_types.iter().any(|c| c == tree::text(node, annotation))
        })
    })
}

/// Last segment of a dotted class annotation (`dg.ConfigurableResource`).
fn annotation_class(annotation: &str) -> Option<String> {
    dotted_name(annotation)?.pop()
}

/// Shape of a body statement, as far as context removal cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// A bare `context.log.info(...)` or `context.add_output_metadata(...)` call.
    ContextReport,
    Other,
}

impl StatementShape {
    pub fn of(statement: &Statement, context: &str, dialect: &PipelineDialect) -> Self {
        if statement.kind != StatementKind::Other {
            return Self::Other;
        }
        let Some(call) = Call::parse(&statement.text) else {
            return Self::Other;
        };
        let report = match call.path.as_slice() {
            [object, attribute, _] => {
                object == context && dialect.report_attributes.contains(attribute)
            }
            [object, method] => object == context && dialect.report_methods.contains(method),
            _ => false,
        };
        if report { Self::ContextReport } else { Self::Other }
    }
}

/// One argument of a recognized query call, as byte ranges into the
/// scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryArg {
    pub keyword: Option<String>,
    /// Range of the keyword name, for keyword arguments.
    pub keyword_span: Option<Range<usize>>,
    /// Range of the whole argument.
    pub span: Range<usize>,
}

/// A matched `object.function(...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySite {
    /// Range of `object.function`.
    pub callee: Range<usize>,
    pub args: Vec<QueryArg>,
    /// 1-based line of the call within the scanned text.
    pub line: usize,
}

/// An occurrence of the embedded-query function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCall {
    Call(QuerySite),
    /// The function is referenced without being called directly.
    Opaque { line: usize },
}

/// Find every `object.function` occurrence in `text`.
pub fn query_calls(text: &str, object: &str, function: &str) -> Vec<QueryCall> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    descendants(tree.root_node())
        .into_iter()
        .filter(|node| is_member_access(*node, text, object, function))
        .map(|callee| {
            let line = callee.start_position().row + 1;
            let arguments = callee
                .parent()
                .filter(|_| is_field_of(callee, "call", "function"))
                .and_then(|call| call.child_by_field_name("arguments"))
                .filter(|arguments| arguments.kind() == "argument_list");
            match arguments {
                Some(arguments) => QueryCall::Call(QuerySite {
                    callee: callee.byte_range(),
                    args: named_children(arguments)
                        .into_iter()
                        .map(|arg| query_arg(arg, text))
                        .collect(),
                    line,
                }),
                None => QueryCall::Opaque { line },
            }
        })
        .collect()
}

fn query_arg(arg: Node<'_>, source: &str) -> QueryArg {
    let keyword = (arg.kind() == "keyword_argument")
        .then(|| arg.child_by_field_name("name"))
        .flatten();
    QueryArg {
        keyword: keyword.map(|k| tree::text(k, source).to_string()),
        keyword_span: keyword.map(|k| k.byte_range()),
        span: arg.byte_range(),
    }
}

/// `object.attribute` where `object` is a plain name, not itself an
/// attribute of something else.
fn is_member_access(node: Node<'_>, source: &str, object: &str, attribute: &str) -> bool {
    node.kind() == "attribute"
        && node
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "identifier" && tree::text(o, source) == object)
        && node
            .child_by_field_name("attribute")
            .is_some_and(|a| tree::text(a, source) == attribute)
}

/// True if `text` mentions `name` as a free-standing name.
pub fn references(text: &str, name: &str) -> bool {
    let Ok(tree) = tree::parse(text) else {
        return false;
    };
    descendants(tree.root_node()).into_iter().any(|node| {
        node.kind() == "identifier"
            && tree::text(node, text) == name
            && !is_field_of(node, "attribute", "attribute")
            && !is_field_of(node, "keyword_argument", "name")
    })
}

/// Attributes accessed on `object`, in first-use order (`mo.ui` gives `ui`).
pub fn attribute_uses(text: &str, object: &str) -> Vec<String> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    let mut found: Vec<String> = Vec::new();
    for node in descendants(tree.root_node()) {
        if node.kind() != "attribute" {
            continue;
        }
        let on_object = node
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "identifier" && tree::text(o, text) == object);
        if let Some(attribute) = node.child_by_field_name("attribute").filter(|_| on_object) {
            let attribute = tree::text(attribute, text);
            if !found.iter().any(|f| f == attribute) {
                found.push(attribute.to_string());
            }
        }
    }
    found
}

/// True if `text` uses an interactive widget or a layout helper.
pub fn references_ui(text: &str, dialect: &NotebookDialect) -> bool {
    attribute_uses(text, &dialect.alias)
        .iter()
        .any(|attr| *attr == dialect.ui_namespace || dialect.layout_functions.contains(attr))
}

/// Static text of a markdown statement: `mo.md("...")` or a bare string.
pub fn markdown_text(statement: &Statement, dialect: &NotebookDialect) -> Option<String> {
    if let StatementKind::Literal(value) = &statement.kind {
        return Some(value.clone());
    }
    let call = Call::parse(&statement.text)?;
    match (call.path.as_slice(), call.args.as_slice()) {
        ([alias, function], [arg])
            if *alias == dialect.alias
                && *function == dialect.markdown_function
                && arg.keyword.is_none() =>
        {
            string_expression(&arg.value)
        }
        _ => None,
    }
}

/// True for a bare name, attribute or subscript expression statement,
/// such as `df`, `df.shape` or `df["a"]`.
pub fn is_display_expression(text: &str) -> bool {
    fn chain(node: Node<'_>) -> bool {
        match node.kind() {
            "identifier" => true,
            "attribute" => node.child_by_field_name("object").is_some_and(chain),
            "subscript" => node.child_by_field_name("value").is_some_and(chain),
            _ => false,
        }
    }
    tree::parse(text).is_ok_and(|tree| single_expression(tree.root_node()).is_some_and(chain))
}

/// True if the statement is a single call into `namespace` (`mo.md(f"...")`).
pub fn is_namespace_call(text: &str, namespace: &str) -> bool {
    Call::parse(text).is_some_and(|call| call.path.len() > 1 && call.path[0] == namespace)
}

/// Table names following `FROM` or `JOIN` in the string literals of `text`.
pub fn sql_table_refs(text: &str) -> Vec<String> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    let mut refs: Vec<String> = Vec::new();
    for string in descendants(tree.root_node()).into_iter().filter(|n| n.kind() == "string") {
        let Some(body) = literal::raw_body(tree::text(string, text)) else {
            continue;
        };
        let words: Vec<&str> = body
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        for pair in words.windows(2) {
            let keyword = pair[0].to_ascii_lowercase();
            let table = pair[1];
            if (keyword == "from" || keyword == "join")
                && !table.starts_with(|c: char| c.is_ascii_digit())
                && !refs.iter().any(|r| r == table)
            {
                refs.push(table.to_string());
            }
        }
    }
    refs
}

/// Local names that refer to one framework package.
///
/// Built from the import statements of a module, so `import dagster as dg`
/// and `from dagster import asset as my_asset` both resolve.
#[derive(Debug, Clone, Default)]
pub struct FrameworkScope {
    package: String,
    modules: FxHashSet<String>,
    members: FxHashMap<String, String>,
    star: bool,
}

impl FrameworkScope {
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            package,
            ..Default::default()
        }
    }

    /// Record an import. Returns true when it imports from the package.
    pub fn observe(&mut self, item: &ImportItem) -> bool {
        if item.root_module() != self.package {
            return false;
        }
        match &item.names {
            None => {
                let local = item
                    .alias
                    .clone()
                    .unwrap_or_else(|| item.root_module().to_string());
                self.modules.insert(local);
            }
            Some(names) => {
                for (name, alias) in names {
                    if name == "*" {
                        self.star = true;
                    } else {
                        let local = alias.clone().unwrap_or_else(|| name.clone());
                        self.members.insert(local, name.clone());
                    }
                }
            }
        }
        true
    }

    /// Package member a dotted path refers to (`dg.asset` and a bare
    /// imported `asset` both give `asset`).
    pub fn member<'p>(&'p self, path: &'p [String]) -> Option<&'p str> {
        match path {
            [local] => self.members.get(local).map(String::as_str),
            [module, member] if self.modules.contains(module) => Some(member),
            _ => None,
        }
    }

    /// True if `name` is bound to the package or one of its members.
    pub fn is_local(&self, name: &str) -> bool {
        self.modules.contains(name) || self.members.contains_key(name)
    }

    /// Local names used in `text`, sorted.
    pub fn uses(&self, text: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .chain(self.members.keys())
            .filter(|name| references(text, name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// True if a `from package import *` was seen.
    pub fn has_star_import(&self) -> bool {
        self.star
    }
}
