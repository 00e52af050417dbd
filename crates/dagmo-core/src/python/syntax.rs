//! Statement-level structure of Python modules.
//!
//! Statements are located through the tree-sitter syntax tree, but their
//! text is always taken from the original source lines, so comments,
//! quoting style and layout survive a conversion untouched.

use std::collections::BTreeSet;

use tree_sitter::Node;

use super::call::Argument;
use super::literal;
use super::tree::{self, children, dotted_path, end_row, named_children, statements, text};
use crate::error::{Error, Result};

/// One `import` or `from ... import` statement target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    /// Module path, including leading dots for relative imports.
    pub module: String,
    /// Imported names with optional aliases, for `from` imports.
    pub names: Option<Vec<(String, Option<String>)>>,
    /// Alias for plain `import module as alias`.
    pub alias: Option<String>,
}

impl ImportItem {
    /// Render the statement that imports exactly this item.
    pub fn render(&self) -> String {
        match &self.names {
            None => match &self.alias {
                Some(alias) => format!("import {} as {}", self.module, alias),
                None => format!("import {}", self.module),
            },
            Some(names) => {
                let names: Vec<String> = names
                    .iter()
                    .map(|(name, alias)| match alias {
                        Some(alias) => format!("{name} as {alias}"),
                        None => name.clone(),
                    })
                    .collect();
                format!("from {} import {}", self.module, names.join(", "))
            }
        }
    }

    /// Names this import binds in the importing scope.
    pub fn bound_names(&self) -> Vec<String> {
        match &self.names {
            None => vec![match &self.alias {
                Some(alias) => alias.clone(),
                None => self.root_module().to_string(),
            }],
            Some(names) => names
                .iter()
                .filter(|(name, _)| name != "*")
                .map(|(name, alias)| alias.clone().unwrap_or_else(|| name.clone()))
                .collect(),
        }
    }

    /// First segment of the module path.
    pub fn root_module(&self) -> &str {
        self.module.split('.').next().unwrap_or(&self.module)
    }

    pub fn is_star(&self) -> bool {
        self.names
            .as_ref()
            .is_some_and(|names| names.iter().any(|(name, _)| name == "*"))
    }
}

/// What a statement is, as far as conversion cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `return` with its optional value text.
    Return(Option<String>),
    /// An import statement.
    Import(Vec<ImportItem>),
    /// An expression statement made only of string literals, with its value.
    Literal(String),
    /// Anything else, including compound statements.
    Other,
}

/// A statement with its preceding comment and blank lines.
///
/// `text` is dedented to column zero; lines inside multi-line strings are
/// kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub leading: Vec<String>,
    pub text: String,
    pub kind: StatementKind,
}

impl Statement {
    /// Build a statement from source text, recognizing its kind.
    ///
    /// Text holding several statements parses with kind
    /// [`StatementKind::Other`].
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let kind = {
            let tree = tree::parse(&text)?;
            match statements(tree.root_node()).as_slice() {
                [only] => simple_kind(*only, &text),
                _ => StatementKind::Other,
            }
        };
        Ok(Self {
            leading: Vec::new(),
            text,
            kind,
        })
    }

    /// Build a statement whose kind is known to be uninteresting.
    pub fn synthesized(text: impl Into<String>) -> Self {
        Self {
            leading: Vec::new(),
            text: text.into(),
            kind: StatementKind::Other,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StatementKind::Return(_))
    }
}

/// Kind of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Regular,
    VarArgs,
    KwArgs,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
    pub kind: ParamKind,
}

/// A decorator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    /// Expression text after `@`.
    pub text: String,
    /// Dotted callee path, empty when the decorator is not a dotted name.
    pub path: Vec<String>,
    /// Call arguments, when the decorator is called.
    pub args: Option<Vec<Argument>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<Decorator>,
    pub params: Vec<Param>,
    pub returns: Option<String>,
    pub body: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub decorators: Vec<Decorator>,
    /// Positional base expressions, as source text.
    pub bases: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Import(Vec<ImportItem>),
    Function(FunctionDef),
    Class(ClassDef),
    Other,
}

/// A top-level statement of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub line: usize,
    pub text: String,
    pub kind: ItemKind,
}

/// A parsed module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModule {
    /// Cleaned module docstring.
    pub docstring: Option<String>,
    pub items: Vec<Item>,
}

/// Parse a whole module.
pub fn parse_module(source: &str) -> Result<ParsedModule> {
    let tree = tree::parse(source)?;
    let root = tree.root_node();
    let file = SourceFile::new(source, root);

    let mut module = ParsedModule::default();
    for (i, group) in grouped(statements(root)).into_iter().enumerate() {
        if let ([node], 0) = (group.as_slice(), i) {
            if let StatementKind::Literal(value) = simple_kind(*node, source) {
                module.docstring = Some(literal::cleandoc(&value));
                continue;
            }
        }
        module.items.push(file.item(&group)?);
    }

    Ok(module)
}

/// Prefix every line of `text` with `prefix`, except blank lines and lines
/// that continue a multi-line string.
pub fn indent(text: &str, prefix: &str) -> String {
    let verbatim = tree::parse_lenient(text)
        .map(|tree| tree::string_rows(tree.root_node()))
        .unwrap_or_default();

    text.split('\n')
        .enumerate()
        .map(|(row, line)| {
            if verbatim.contains(&row) {
                line.to_string()
            } else if line.trim().is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True for `if __name__ == "__main__":` blocks.
pub fn is_main_guard(text: &str) -> bool {
    let Ok(tree) = tree::parse(text) else {
        return false;
    };
    let Some(statement) = statements(tree.root_node()).into_iter().next() else {
        return false;
    };
    if statement.kind() != "if_statement" {
        return false;
    }
    let Some(condition) = statement.child_by_field_name("condition") else {
        return false;
    };
    condition.kind() == "comparison_operator"
        && children(condition).iter().any(|c| c.kind() == "==")
        && matches!(
            named_children(condition).as_slice(),
            [name, value] if text_is(*name, text, "__name__") && value.kind() == "string"
        )
}

/// Target and value text of a simple `name = value` statement.
pub fn simple_assignment(text: &str) -> Option<(&str, &str)> {
    let tree = tree::parse(text).ok()?;
    let expression = tree::single_expression(tree.root_node())?;
    if expression.kind() != "assignment" || expression.child_by_field_name("type").is_some() {
        return None;
    }
    let target = expression.child_by_field_name("left")?;
    let value = expression.child_by_field_name("right")?;
    if target.kind() != "identifier" || value.kind() == "assignment" {
        return None;
    }
    Some((&text[target.byte_range()], &text[value.byte_range()]))
}

/// True if the statement returns from the enclosing function, as opposed
/// to a function or class it defines.
pub fn has_own_return(text: &str) -> bool {
    fn search(node: Node<'_>) -> bool {
        match node.kind() {
            "return_statement" => true,
            "function_definition" | "class_definition" | "lambda" => false,
            _ => named_children(node).into_iter().any(search),
        }
    }
    tree::parse(text).is_ok_and(|tree| search(tree.root_node()))
}

fn text_is(node: Node<'_>, source: &str, expected: &str) -> bool {
    node.kind() == "identifier" && text(node, source) == expected
}

/// Group statements sharing a line (`a = 1; b = 2`).
fn grouped(nodes: Vec<Node<'_>>) -> Vec<Vec<Node<'_>>> {
    let mut groups: Vec<Vec<Node<'_>>> = Vec::new();
    for node in nodes {
        let row = node.start_position().row;
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|prev| row <= end_row(*prev)) => group.push(node),
            _ => groups.push(vec![node]),
        }
    }
    groups
}

fn simple_kind(node: Node<'_>, source: &str) -> StatementKind {
    match node.kind() {
        "return_statement" => {
            let values = named_children(node);
            let value = match (values.first(), values.last()) {
                (Some(first), Some(last)) => Some(source[first.start_byte()..last.end_byte()].to_string()),
                _ => None,
            };
            StatementKind::Return(value)
        }
        "import_statement" | "import_from_statement" | "future_import_statement" => import_items(node, source)
            .map(StatementKind::Import)
            .unwrap_or(StatementKind::Other),
        "expression_statement" => match named_children(node).as_slice() {
            [only] => literal::node_value(*only, source)
                .map(StatementKind::Literal)
                .unwrap_or(StatementKind::Other),
            _ => StatementKind::Other,
        },
        _ => StatementKind::Other,
    }
}

/// Items of an import statement node.
pub(crate) fn import_items(node: Node<'_>, source: &str) -> Option<Vec<ImportItem>> {
    let mut cursor = node.walk();
    let targets: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();

    if node.kind() == "import_statement" {
        return targets
            .into_iter()
            .map(|target| {
                let (name, alias) = import_target(target, source)?;
                Some(ImportItem {
                    module: name,
                    names: None,
                    alias,
                })
            })
            .collect();
    }

    let module = match node.kind() {
        "future_import_statement" => "__future__".to_string(),
        _ => {
            let module = node.child_by_field_name("module_name")?;
            text(module, source).split_whitespace().collect()
        }
    };
    let mut names = targets
        .into_iter()
        .map(|target| import_target(target, source))
        .collect::<Option<Vec<_>>>()?;
    if named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
        names.push(("*".to_string(), None));
    }
    Some(vec![ImportItem {
        module,
        names: Some(names),
        alias: None,
    }])
}

fn import_target(node: Node<'_>, source: &str) -> Option<(String, Option<String>)> {
    match node.kind() {
        "dotted_name" => Some((text(node, source).to_string(), None)),
        "aliased_import" => {
            let name = text(node.child_by_field_name("name")?, source).to_string();
            let alias = text(node.child_by_field_name("alias")?, source).to_string();
            Some((name, Some(alias)))
        }
        _ => None,
    }
}

/// A parameter node of a `def` or `lambda`.
pub(crate) fn param(node: Node<'_>, source: &str) -> Option<Param> {
    let field = |name: &str| node.child_by_field_name(name).map(|n| text(n, source).to_string());
    match node.kind() {
        "identifier" => Some(Param {
            name: text(node, source).to_string(),
            annotation: None,
            default: None,
            kind: ParamKind::Regular,
        }),
        "list_splat_pattern" | "dictionary_splat_pattern" => {
            let name = named_children(node).into_iter().find(|n| n.kind() == "identifier")?;
            Some(Param {
                name: text(name, source).to_string(),
                annotation: None,
                default: None,
                kind: if node.kind() == "list_splat_pattern" {
                    ParamKind::VarArgs
                } else {
                    ParamKind::KwArgs
                },
            })
        }
        "typed_parameter" => {
            let inner = named_children(node).into_iter().next()?;
            let mut param = param(inner, source)?;
            param.annotation = field("type");
            Some(param)
        }
        "default_parameter" | "typed_default_parameter" => {
            let mut param = param(node.child_by_field_name("name")?, source)?;
            param.annotation = field("type");
            param.default = field("value");
            Some(param)
        }
        _ => None,
    }
}

/// Source lines of a parsed file.
struct SourceFile<'a> {
    source: &'a str,
    lines: Vec<&'a str>,
    verbatim: BTreeSet<usize>,
}

impl<'a> SourceFile<'a> {
    fn new(source: &'a str, root: Node<'_>) -> Self {
        Self {
            source,
            lines: source.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect(),
            verbatim: tree::string_rows(root),
        }
    }

    fn line(&self, row: usize) -> &'a str {
        self.lines.get(row).copied().unwrap_or("")
    }

    /// Text of rows `first..=last`, with `margin` removed from each line
    /// that does not continue a string.
    fn text(&self, first: usize, last: usize, margin: &str) -> String {
        (first..=last)
            .map(|row| {
                let line = self.line(row);
                if self.verbatim.contains(&row) {
                    line.to_string()
                } else {
                    dedent_line(line, margin).to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn item(&self, group: &[Node<'_>]) -> Result<Item> {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            return Err(Error::parse(1, "expected a statement"));
        };
        let start = first.start_position().row;
        let text = self.text(start, end_row(*last), "");

        let kind = match group {
            [node] => self.item_kind(*node)?,
            _ => ItemKind::Other,
        };
        Ok(Item {
            line: start + 1,
            text,
            kind,
        })
    }

    fn item_kind(&self, node: Node<'_>) -> Result<ItemKind> {
        let (definition, decorators) = match node.kind() {
            "decorated_definition" => {
                let decorators = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .map(|d| self.decorator(d))
                    .collect();
                match node.child_by_field_name("definition") {
                    Some(definition) => (definition, decorators),
                    None => return Ok(ItemKind::Other),
                }
            }
            _ => (node, Vec::new()),
        };

        Ok(match definition.kind() {
            "function_definition" => ItemKind::Function(self.function(definition, decorators)?),
            "class_definition" => ItemKind::Class(self.class(definition, decorators)?),
            _ => match simple_kind(definition, self.source) {
                StatementKind::Import(items) => ItemKind::Import(items),
                _ => ItemKind::Other,
            },
        })
    }

    fn decorator(&self, node: Node<'_>) -> Decorator {
        let line = node.start_position().row + 1;
        let Some(expression) = named_children(node).into_iter().next() else {
            return Decorator {
                text: String::new(),
                path: Vec::new(),
                args: None,
                line,
            };
        };
        let (path, args) = match expression.kind() {
            "call" => {
                let path = expression
                    .child_by_field_name("function")
                    .and_then(|f| dotted_path(f, self.source));
                let args = expression
                    .child_by_field_name("arguments")
                    .filter(|a| a.kind() == "argument_list")
                    .map(|a| Argument::list(a, self.source));
                match (path, args) {
                    (Some(path), Some(args)) => (path, Some(args)),
                    _ => (Vec::new(), None),
                }
            }
            _ => (dotted_path(expression, self.source).unwrap_or_default(), None),
        };
        Decorator {
            text: text(expression, self.source).to_string(),
            path,
            args,
            line,
        }
    }

    fn function(&self, node: Node<'_>, decorators: Vec<Decorator>) -> Result<FunctionDef> {
        let line = node.start_position().row + 1;
        let name = node
            .child_by_field_name("name")
            .ok_or_else(|| Error::parse(line, "expected function name"))?;
        let params = node
            .child_by_field_name("parameters")
            .map(|p| {
                named_children(p)
                    .into_iter()
                    .filter_map(|n| param(n, self.source))
                    .collect()
            })
            .unwrap_or_default();

        Ok(FunctionDef {
            name: text(name, self.source).to_string(),
            is_async: children(node).first().is_some_and(|c| c.kind() == "async"),
            decorators,
            params,
            returns: node
                .child_by_field_name("return_type")
                .map(|r| text(r, self.source).to_string()),
            body: self.body(node),
            line,
        })
    }

    fn class(&self, node: Node<'_>, decorators: Vec<Decorator>) -> Result<ClassDef> {
        let line = node.start_position().row + 1;
        let name = node
            .child_by_field_name("name")
            .ok_or_else(|| Error::parse(line, "expected class name"))?;
        let bases = node
            .child_by_field_name("superclasses")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .filter(|b| b.kind() != "keyword_argument")
                    .map(|b| text(b, self.source).to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ClassDef {
            name: text(name, self.source).to_string(),
            decorators,
            bases,
            line,
        })
    }

    /// Statements of a function body, dedented.
    fn body(&self, definition: Node<'_>) -> Vec<Statement> {
        let Some(block) = definition.child_by_field_name("body") else {
            return Vec::new();
        };
        let nodes = statements(block);
        let (Some(first), Some(last)) = (nodes.first().copied(), nodes.last().copied()) else {
            return Vec::new();
        };
        let header_end = children(definition)
            .into_iter()
            .filter(|c| c.kind() == ":")
            .last()
            .map_or(definition.start_position().row, |c| c.start_position().row);

        if first.start_position().row == header_end {
            let kind = match nodes.as_slice() {
                [only] => simple_kind(*only, self.source),
                _ => StatementKind::Other,
            };
            return vec![Statement {
                leading: Vec::new(),
                text: self.source[first.start_byte()..last.end_byte()].to_string(),
                kind,
            }];
        }

        let first_line = self.line(first.start_position().row);
        let margin = &first_line[..first_line.len() - first_line.trim_start().len()];

        let mut previous = header_end;
        let mut out = Vec::with_capacity(nodes.len());
        for group in grouped(nodes) {
            let (Some(head), Some(tail)) = (group.first(), group.last()) else {
                continue;
            };
            let start = head.start_position().row;
            let end = end_row(*tail);
            let leading = (previous + 1..start)
                .map(|row| dedent_line(self.line(row), margin).trim_end().to_string())
                .collect();
            let kind = match group.as_slice() {
                [only] => simple_kind(*only, self.source),
                _ => StatementKind::Other,
            };
            out.push(Statement {
                leading,
                text: self.text(start, end, margin),
                kind,
            });
            previous = end;
        }

        if let Some(first) = out.first_mut() {
            while first.leading.first().is_some_and(|l| l.is_empty()) {
                first.leading.remove(0);
            }
        }
        out
    }
}

fn dedent_line<'l>(line: &'l str, margin: &str) -> &'l str {
    line.strip_prefix(margin).unwrap_or_else(|| line.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_function(source: &str) -> FunctionDef {
        let module = parse_module(source).unwrap();
        match module.items.into_iter().next().map(|i| i.kind) {
            Some(ItemKind::Function(f)) => f,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_module_docstring_and_items() {
        let module = parse_module("\"\"\"Doc.\n\nMore.\n\"\"\"\n\nimport os\n\nx = 1\n").unwrap();
        assert_eq!(module.docstring.as_deref(), Some("Doc.\n\nMore."));
        assert_eq!(module.items.len(), 2);
        assert!(matches!(module.items[0].kind, ItemKind::Import(_)));
        assert_eq!(module.items[1].text, "x = 1");
        assert_eq!(module.items[1].line, 8);
    }

    #[test]
    fn test_function_with_decorator_and_params() {
        let f = only_function(
            "@app.cell(hide_code=True)\ndef _(mo, df: pd.DataFrame = None, *args, **kw) -> None:\n    x = 1\n    return (x,)\n",
        );
        assert_eq!(f.name, "_");
        assert_eq!(f.line, 2);
        assert_eq!(f.decorators.len(), 1);
        assert_eq!(f.decorators[0].path, vec!["app", "cell"]);
        assert_eq!(f.decorators[0].line, 1);
        let args = f.decorators[0].args.as_ref().unwrap();
        assert_eq!(args[0].keyword.as_deref(), Some("hide_code"));
        assert_eq!(args[0].value, "True");

        let names: Vec<_> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["mo", "df", "args", "kw"]);
        assert_eq!(f.params[1].annotation.as_deref(), Some("pd.DataFrame"));
        assert_eq!(f.params[1].default.as_deref(), Some("None"));
        assert_eq!(f.params[2].kind, ParamKind::VarArgs);
        assert_eq!(f.params[3].kind, ParamKind::KwArgs);
        assert_eq!(f.returns.as_deref(), Some("None"));

        assert_eq!(f.body.len(), 2);
        assert_eq!(f.body[1].kind, StatementKind::Return(Some("(x,)".to_string())));
    }

    #[test]
    fn test_bare_decorator() {
        let f = only_function("@dg.asset\ndef a():\n    pass\n");
        assert_eq!(f.decorators[0].path, vec!["dg", "asset"]);
        assert!(f.decorators[0].args.is_none());
    }

    #[test]
    fn test_body_keeps_comments_and_nested_blocks() {
        let f = only_function(
            "def f():\n    # load\n    rows = []\n\n    for i in range(3):\n        rows.append(i)\n    else:\n        pass\n    return rows\n",
        );
        assert_eq!(f.body.len(), 3);
        assert_eq!(f.body[0].leading, vec!["# load"]);
        assert_eq!(f.body[1].leading, vec![""]);
        assert_eq!(
            f.body[1].text,
            "for i in range(3):\n    rows.append(i)\nelse:\n    pass"
        );
        assert_eq!(f.body[1].kind, StatementKind::Other);
    }

    #[test]
    fn test_statements_sharing_a_line_stay_together() {
        let f = only_function("def f():\n    a = 1; b = 2\n    return b\n");
        assert_eq!(f.body.len(), 2);
        assert_eq!(f.body[0].text, "a = 1; b = 2");
        assert_eq!(f.body[0].kind, StatementKind::Other);
    }

    #[test]
    fn test_inline_body() {
        let f = only_function("def f(): return 1\n");
        assert_eq!(f.body.len(), 1);
        assert_eq!(f.body[0].kind, StatementKind::Return(Some("1".to_string())));
    }

    #[test]
    fn test_multiline_string_lines_are_not_dedented() {
        let f = only_function("def f():\n    q = \"\"\"\nselect *\n    from t\n\"\"\"\n    return q\n");
        assert_eq!(f.body[0].text, "q = \"\"\"\nselect *\n    from t\n\"\"\"");
    }

    #[test]
    fn test_import_shapes() {
        let module = parse_module(
            "import numpy as np, os.path\nfrom .local import (a, b as c)\nfrom x import *\n",
        )
        .unwrap();
        let ItemKind::Import(items) = &module.items[0].kind else {
            panic!("expected import");
        };
        assert_eq!(items[0].render(), "import numpy as np");
        assert_eq!(items[1].bound_names(), vec!["os"]);

        let ItemKind::Import(items) = &module.items[1].kind else {
            panic!("expected import");
        };
        assert_eq!(items[0].module, ".local");
        assert_eq!(items[0].bound_names(), vec!["a", "c"]);
        assert_eq!(items[0].render(), "from .local import a, b as c");

        let ItemKind::Import(items) = &module.items[2].kind else {
            panic!("expected import");
        };
        assert!(items[0].is_star());
        assert!(items[0].bound_names().is_empty());
    }

    #[test]
    fn test_class_bases() {
        let module = parse_module("class Db(dg.ConfigurableResource, metaclass=M):\n    url: str\n").unwrap();
        let ItemKind::Class(class) = &module.items[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Db");
        assert_eq!(class.bases, vec!["dg.ConfigurableResource"]);
    }

    #[test]
    fn test_if_main_guard_is_one_item() {
        let source = "if __name__ == \"__main__\":\n    app.run()\nelse:\n    pass\n";
        let module = parse_module(source).unwrap();
        assert_eq!(module.items.len(), 1);
        assert!(module.items[0].text.ends_with("pass"));
        assert!(is_main_guard(&module.items[0].text));
        assert!(!is_main_guard("if debug:\n    pass"));
    }

    #[test]
    fn test_match_statement_is_compound() {
        let module = parse_module("match x:\n    case 1:\n        y = 2\nmatch = 3\n").unwrap();
        assert_eq!(module.items.len(), 2);
        assert_eq!(module.items[1].text, "match = 3");
    }

    #[test]
    fn test_statement_parse() {
        let stmt = Statement::parse("return a, b").unwrap();
        assert_eq!(stmt.kind, StatementKind::Return(Some("a, b".to_string())));
        assert_eq!(Statement::parse("return").unwrap().kind, StatementKind::Return(None));
        assert_eq!(
            Statement::parse("'''text'''").unwrap().kind,
            StatementKind::Literal("text".to_string())
        );
        assert_eq!(Statement::parse("x = 1").unwrap().kind, StatementKind::Other);
        assert_eq!(Statement::parse("x = 1\ny = 2").unwrap().kind, StatementKind::Other);
        assert!(Statement::parse("x = = 1").is_err());
    }

    #[test]
    fn test_indent_skips_string_continuations() {
        let text = "x = \"\"\"\nline\n\n\"\"\"\n\ny = 1";
        assert_eq!(indent(text, "    "), "    x = \"\"\"\nline\n\n\"\"\"\n\n    y = 1");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_module("def f():\nx = 1\n"), Err(Error::Parse { .. })));
        assert!(matches!(parse_module("x = 1\n    y = 2\n"), Err(Error::Parse { .. })));
        assert!(matches!(
            parse_module("import os\n\nx = (1,, 2)"),
            Err(Error::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_async_function() {
        let f = only_function("async def fetch(url):\n    return await get(url)\n");
        assert!(f.is_async);
        assert_eq!(f.name, "fetch");
        assert!(!only_function("def f():\n    pass\n").is_async);
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            simple_assignment("defs = dg.Definitions(assets=[a])"),
            Some(("defs", "dg.Definitions(assets=[a])"))
        );
        assert_eq!(simple_assignment("x == 1"), None);
        assert_eq!(simple_assignment("a.b = 1"), None);
        assert_eq!(simple_assignment("x: int = 1"), None);
    }

    #[test]
    fn test_own_return() {
        assert!(has_own_return("if x:\n    return 1"));
        assert!(!has_own_return("def inner():\n    return 1"));
        assert!(!has_own_return("for x in y:\n    f = lambda: x"));
        assert!(has_own_return("for x in y:\n    def g():\n        return 2\n    return x"));
    }
}
