//! Call expressions, argument lists and container displays.

use tree_sitter::Node;

use super::literal;
use super::tree::{self, dotted_path, named_children, single_expression, text};

/// A call argument with owned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub keyword: Option<String>,
    /// Source text of the value, including any `*` or `**` prefix.
    pub value: String,
}

impl Argument {
    /// Arguments of an `argument_list` node, in order.
    pub(crate) fn list(node: Node<'_>, source: &str) -> Vec<Self> {
        named_children(node)
            .into_iter()
            .map(|arg| match arg.kind() {
                "keyword_argument" => Self {
                    keyword: arg
                        .child_by_field_name("name")
                        .map(|n| text(n, source).to_string()),
                    value: arg
                        .child_by_field_name("value")
                        .map(|v| text(v, source).to_string())
                        .unwrap_or_default(),
                },
                _ => Self {
                    keyword: None,
                    value: text(arg, source).to_string(),
                },
            })
            .collect()
    }

    pub fn is_starred(&self) -> bool {
        self.keyword.is_none() && self.value.starts_with('*')
    }

    /// Render as it appears in a call.
    pub fn render(&self) -> String {
        match &self.keyword {
            Some(key) => format!("{key}={}", self.value),
            None => self.value.clone(),
        }
    }
}

/// A call expression `a.b.c(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub path: Vec<String>,
    pub args: Vec<Argument>,
}

impl Call {
    /// Parse `text` when it consists of exactly one call of a dotted name.
    pub fn parse(text: &str) -> Option<Self> {
        let tree = tree::parse(text).ok()?;
        let call = single_expression(tree.root_node()).filter(|e| e.kind() == "call")?;
        let path = dotted_path(call.child_by_field_name("function")?, text)?;
        let arguments = call
            .child_by_field_name("arguments")
            .filter(|a| a.kind() == "argument_list")?;
        Some(Self {
            path,
            args: Argument::list(arguments, text),
        })
    }

    pub fn keyword(&self, key: &str) -> Option<&Argument> {
        self.args
            .iter()
            .find(|a| a.keyword.as_deref() == Some(key))
    }
}

/// Segments of a dotted name expression (`dg.AssetIn` or `Warehouse`).
pub fn dotted_name(text: &str) -> Option<Vec<String>> {
    let tree = tree::parse(text).ok()?;
    dotted_path(single_expression(tree.root_node())?, text)
}

/// Items of a display node.
fn display_items(node: Node<'_>, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "list" | "tuple" | "set" | "dictionary" => Some(
            named_children(node)
                .into_iter()
                .map(|item| text(item, source).to_string())
                .collect(),
        ),
        "parenthesized_expression" => {
            let inner = named_children(node).into_iter().next()?;
            Some(vec![text(inner, source).to_string()])
        }
        _ => None,
    }
}

/// Items of a list, tuple, set or dict display, as source text.
pub fn sequence_items(text: &str) -> Vec<String> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    single_expression(tree.root_node())
        .and_then(|expression| display_items(expression, text))
        .unwrap_or_default()
}

/// Items of a tuple expression, with or without enclosing parentheses.
///
/// `"a, b"`, `"(a, b)"` and `"(a,)"` all split into their items, and a
/// single expression such as `"x"` gives one item.
pub fn tuple_items(text: &str) -> Vec<String> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    let root = tree.root_node();
    let Some(statement) = tree::statements(root).into_iter().next() else {
        return Vec::new();
    };
    let mut items = named_children(statement);
    // `(x)` is `x`, and `((a, b))` is `(a, b)`.
    while let [only] = items.as_slice() {
        if only.kind() != "parenthesized_expression" {
            break;
        }
        items = named_children(*only);
    }
    if let [only] = items.as_slice() {
        if only.kind() == "tuple" {
            items = named_children(*only);
        }
    }
    items.into_iter().map(|item| tree::text(item, text).to_string()).collect()
}

/// String-literal keys of a dict display, in order.
pub fn dict_string_keys(text: &str) -> Vec<String> {
    let Ok(tree) = tree::parse(text) else {
        return Vec::new();
    };
    let Some(dict) = single_expression(tree.root_node()).filter(|d| d.kind() == "dictionary") else {
        return Vec::new();
    };
    named_children(dict)
        .into_iter()
        .filter(|entry| entry.kind() == "pair")
        .filter_map(|pair| literal::node_value(pair.child_by_field_name("key")?, text))
        .collect()
}

/// Static string value of an expression consisting only of string literals.
pub fn string_expression(text: &str) -> Option<String> {
    let tree = tree::parse(text).ok()?;
    let mut expression = single_expression(tree.root_node())?;
    while expression.kind() == "parenthesized_expression" {
        expression = named_children(expression).into_iter().next()?;
    }
    literal::node_value(expression, text)
}
