//! Name binding analysis.
//!
//! Computes, for a block of statements, which names it binds at its top
//! level and which names it reads without binding. Names bound inside
//! nested functions, classes, lambdas and comprehensions stay local to
//! those scopes. The analysis walks the syntax tree but never evaluates
//! code, so dynamic tricks such as `globals()` writes go unnoticed.

use tree_sitter::Node;

use super::syntax::{import_items, param};
use super::tree::{self, children, named_children, text};
use crate::error::Result;

/// Names bound and read by a block, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pub bound: Vec<String>,
    /// Names read before or without being bound in this block.
    pub free: Vec<String>,
}

impl Bindings {
    pub fn binds(&self, name: &str) -> bool {
        self.bound.iter().any(|n| n == name)
    }

    pub fn reads(&self, name: &str) -> bool {
        self.free.iter().any(|n| n == name)
    }
}

/// Analyze a block of statements starting at column zero.
pub fn analyze(source: &str) -> Result<Bindings> {
    let tree = tree::parse(source)?;
    let mut scope = Scope::default();
    Walker { source }.visit(tree.root_node(), &mut scope);

    Ok(Bindings {
        free: scope.free(),
        bound: scope.bound,
    })
}

#[derive(Debug, Default)]
struct Scope {
    bound: Vec<String>,
    reads: Vec<String>,
}

impl Scope {
    fn bind(&mut self, name: &str) {
        if !self.bound.iter().any(|n| n == name) {
            self.bound.push(name.to_string());
        }
    }

    fn read(&mut self, name: &str) {
        if !self.reads.iter().any(|n| n == name) {
            self.reads.push(name.to_string());
        }
    }

    fn free(&self) -> Vec<String> {
        self.reads
            .iter()
            .filter(|n| !self.bound.contains(n))
            .cloned()
            .collect()
    }

    /// Carry the free names of a nested scope into this one.
    fn absorb(&mut self, inner: &Scope) {
        for name in inner.free() {
            self.read(&name);
        }
    }
}

struct Walker<'s> {
    source: &'s str,
}

impl Walker<'_> {
    fn name(&self, node: Node<'_>) -> &str {
        text(node, self.source)
    }

    fn visit(&self, node: Node<'_>, scope: &mut Scope) {
        let field = |name: &str| node.child_by_field_name(name);
        match node.kind() {
            "identifier" => scope.read(self.name(node)),
            "comment" | "dotted_name" | "global_statement" | "nonlocal_statement" => {}
            "attribute" => self.visit_opt(field("object"), scope),
            "keyword_argument" => self.visit_opt(field("value"), scope),
            "assignment" => {
                self.visit_opt(field("right"), scope);
                self.visit_opt(field("type"), scope);
                if let Some(left) = field("left") {
                    self.bind_target(left, scope);
                }
            }
            "augmented_assignment" => {
                self.visit_opt(field("right"), scope);
                if let Some(left) = field("left") {
                    self.visit(left, scope);
                    self.bind_target(left, scope);
                }
            }
            "named_expression" => {
                self.visit_opt(field("value"), scope);
                if let Some(name) = field("name") {
                    scope.bind(self.name(name));
                }
            }
            "for_statement" => {
                self.visit_opt(field("right"), scope);
                if let Some(left) = field("left") {
                    self.bind_target(left, scope);
                }
                self.visit_opt(field("body"), scope);
                self.visit_opt(field("alternative"), scope);
            }
            "as_pattern" => {
                for child in named_children(node) {
                    if child.kind() == "as_pattern_target" {
                        self.bind_target(child, scope);
                    } else {
                        self.visit(child, scope);
                    }
                }
            }
            "except_clause" => self.except_clause(node, scope),
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                for item in import_items(node, self.source).unwrap_or_default() {
                    for name in item.bound_names() {
                        scope.bind(&name);
                    }
                }
            }
            "function_definition" => self.function(node, scope),
            "class_definition" => self.class(node, scope),
            "lambda" => self.lambda(node, scope),
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => self.comprehension(node, scope),
            "case_pattern" => self.bind_target(node, scope),
            _ => {
                for child in named_children(node) {
                    self.visit(child, scope);
                }
            }
        }
    }

    fn visit_opt(&self, node: Option<Node<'_>>, scope: &mut Scope) {
        if let Some(node) = node {
            self.visit(node, scope);
        }
    }

    /// Bind the names an assignment target introduces and read the names
    /// used by attribute and subscript targets.
    fn bind_target(&self, node: Node<'_>, scope: &mut Scope) {
        match node.kind() {
            "identifier" => scope.bind(self.name(node)),
            "attribute" | "subscript" => self.visit(node, scope),
            "keyword_pattern" => {
                for child in named_children(node).into_iter().skip(1) {
                    self.bind_target(child, scope);
                }
            }
            // A single name captures, a dotted name is a value pattern.
            "dotted_name" => match named_children(node).as_slice() {
                [only] => scope.bind(self.name(*only)),
                [first, ..] => scope.read(self.name(*first)),
                [] => {}
            },
            "class_pattern" => {
                for child in named_children(node) {
                    match named_children(child).first() {
                        Some(class) if child.kind() == "dotted_name" => scope.read(self.name(*class)),
                        _ => self.bind_target(child, scope),
                    }
                }
            }
            "string" | "integer" | "float" | "true" | "false" | "none" => {}
            _ => {
                for child in named_children(node) {
                    self.bind_target(child, scope);
                }
            }
        }
    }

    /// `except E as name:` in grammars that spell the alias as a plain
    /// expression after `as`.
    fn except_clause(&self, node: Node<'_>, scope: &mut Scope) {
        let mut after_as = false;
        for child in children(node) {
            if child.kind() == "as" {
                after_as = true;
            } else if child.is_named() && child.kind() != "comment" {
                if after_as && child.kind() != "block" {
                    self.bind_target(child, scope);
                } else {
                    self.visit(child, scope);
                }
                after_as = false;
            }
        }
    }

    /// Bind the parameters of `params` in `inner`; defaults and
    /// annotations are read in `outer`.
    fn parameters(&self, params: Option<Node<'_>>, inner: &mut Scope, outer: &mut Scope) {
        let Some(params) = params else {
            return;
        };
        for node in named_children(params) {
            for field in ["type", "value"] {
                self.visit_opt(node.child_by_field_name(field), outer);
            }
            if let Some(param) = param(node, self.source) {
                inner.bind(&param.name);
            }
        }
    }

    fn function(&self, node: Node<'_>, scope: &mut Scope) {
        let mut inner = Scope::default();
        self.parameters(node.child_by_field_name("parameters"), &mut inner, scope);
        self.visit_opt(node.child_by_field_name("return_type"), scope);
        self.visit_opt(node.child_by_field_name("body"), &mut inner);
        if let Some(name) = node.child_by_field_name("name") {
            scope.bind(self.name(name));
        }
        scope.absorb(&inner);
    }

    fn class(&self, node: Node<'_>, scope: &mut Scope) {
        self.visit_opt(node.child_by_field_name("superclasses"), scope);
        let mut inner = Scope::default();
        self.visit_opt(node.child_by_field_name("body"), &mut inner);
        if let Some(name) = node.child_by_field_name("name") {
            scope.bind(self.name(name));
        }
        scope.absorb(&inner);
    }

    fn lambda(&self, node: Node<'_>, scope: &mut Scope) {
        let mut inner = Scope::default();
        self.parameters(node.child_by_field_name("parameters"), &mut inner, scope);
        self.visit_opt(node.child_by_field_name("body"), &mut inner);
        scope.absorb(&inner);
    }

    /// The first iterable is evaluated outside the comprehension, every
    /// other part inside it.
    fn comprehension(&self, node: Node<'_>, scope: &mut Scope) {
        let mut inner = Scope::default();
        let mut first = true;
        for child in named_children(node) {
            if child.kind() != "for_in_clause" {
                continue;
            }
            let iterable = child.child_by_field_name("right");
            if first {
                self.visit_opt(iterable, scope);
                first = false;
            } else {
                self.visit_opt(iterable, &mut inner);
            }
            if let Some(left) = child.child_by_field_name("left") {
                self.bind_target(left, &mut inner);
            }
        }
        for child in named_children(node) {
            if child.kind() != "for_in_clause" {
                self.visit(child, &mut inner);
            }
        }
        scope.absorb(&inner);
    }
}
