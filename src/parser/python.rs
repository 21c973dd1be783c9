use tree_sitter::Node;

use crate::graph::node::{SymbolKind, Visibility};

use super::{header_text, range_of, Collector, ImportSite, ReferenceKind, ScopeKind, SyntaxFacts};

/// Walk a Python syntax tree and collect declarations, reference sites and imports.
pub fn collect(root: Node, src: &[u8]) -> SyntaxFacts {
    let mut walker = PythonWalker {
        c: Collector::new(src),
    };
    walker.visit_children(root);
    walker.c.finish()
}

struct PythonWalker<'a> {
    c: Collector<'a>,
}

/// Leading underscore marks a private name; dunder names stay public.
fn visibility_of(name: &str) -> Visibility {
    if name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__")) {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl<'a> PythonWalker<'a> {
    fn visit_children(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "function_definition" => self.function(node, node),
            "class_definition" => self.class(node, node),
            "decorated_definition" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "decorator" {
                        self.visit_children(child);
                    }
                }
                if let Some(def) = node.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => self.function(def, node),
                        "class_definition" => self.class(def, node),
                        _ => self.visit(def),
                    }
                }
            }
            "import_statement" => self.import(node),
            "import_from_statement" => self.import_from(node),
            "expression_statement" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.kind() == "assignment" {
                        self.assignment(child);
                    } else {
                        self.visit(child);
                    }
                }
            }
            "call" => self.call(node),
            "attribute" => self.attribute(node),
            "type" => self.annotation(node),
            // Lambdas have no name; their bodies still belong to the enclosing scope.
            _ => self.visit_children(node),
        }
    }

    /// `def name(params) -> ret: body`. `outer` is the decorated wrapper when present.
    fn function(&mut self, node: Node<'a>, outer: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let kind = if self.c.in_class() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let decl = self
            .c
            .declare(kind, name, outer, signature, name.map(visibility_of));

        let Some(name) = name else {
            return;
        };
        self.c.push_scope(name, ScopeKind::Function, Some(decl));
        if let Some(params) = node.child_by_field_name("parameters") {
            self.visit_children(params);
        }
        if let Some(ret) = node.child_by_field_name("return_type") {
            self.annotation(ret);
        }
        if let Some(body) = body {
            self.visit_children(body);
        }
        self.c.pop_scope();
    }

    /// `class Name(Base, mixin.Other): body`.
    fn class(&mut self, node: Node<'a>, outer: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let decl = self
            .c
            .declare(SymbolKind::Class, name, outer, signature, name.map(visibility_of));

        let Some(name) = name else {
            return;
        };
        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.named_children(&mut cursor) {
                match base.kind() {
                    "identifier" | "attribute" => {
                        if let Some(text) = dotted_name(base, self.c.src) {
                            self.c
                                .reference_from(name, Some(decl), ReferenceKind::Inherit, text, base);
                        }
                    }
                    // metaclass=..., generic subscripts: only scan for calls.
                    _ => self.visit(base),
                }
            }
        }
        if let Some(body) = body {
            self.c.push_scope(name, ScopeKind::Class, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    /// Module- and class-level assignments declare variables, one per binding.
    fn assignment(&mut self, node: Node<'a>) {
        if !self.c.inside_function() {
            if let Some(left) = node.child_by_field_name("left") {
                let mut targets = Vec::new();
                assignment_targets(left, &mut targets);
                let signature = header_text(node, node.child_by_field_name("right"), self.c.src)
                    .trim_end_matches('=')
                    .trim()
                    .to_string();
                for target in targets {
                    let name = self.c.text(target);
                    let kind = if self.c.at_module_level() && is_constant_name(name) {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    };
                    self.c.declare(
                        kind,
                        Some(name),
                        node,
                        signature.clone(),
                        Some(visibility_of(name)),
                    );
                }
            }
        }
        if let Some(ty) = node.child_by_field_name("type") {
            self.annotation(ty);
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.visit(right);
        }
    }

    fn call(&mut self, node: Node<'a>) {
        if let Some(func) = node.child_by_field_name("function") {
            match dotted_name(func, self.c.src) {
                Some(text) => self.c.reference(ReferenceKind::Call, text, func),
                None => self.visit(func),
            }
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit_children(args);
        }
    }

    /// Plain attribute access (`settings.DEBUG`). `self.x` and `cls.x` are instance
    /// state, not symbols, and are skipped.
    fn attribute(&mut self, node: Node<'a>) {
        match dotted_name(node, self.c.src) {
            Some(text) => {
                let head = text.split('.').next().unwrap_or("");
                if head != "self" && head != "cls" {
                    self.c.reference(ReferenceKind::Reference, text, node);
                }
            }
            None => self.visit_children(node),
        }
    }

    /// Every named type in an annotation becomes a reference site.
    fn annotation(&mut self, node: Node<'a>) {
        match node.kind() {
            "identifier" | "attribute" => {
                if let Some(text) = dotted_name(node, self.c.src) {
                    self.c.reference(ReferenceKind::Reference, text, node);
                }
            }
            "string" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.annotation(child);
                }
            }
        }
    }

    /// `import a.b`, `import a.b as c`.
    fn import(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            let (module, alias) = match child.kind() {
                "aliased_import" => (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("alias"),
                ),
                _ => (Some(child), None),
            };
            if let Some(module) = module {
                self.c.import(ImportSite {
                    specifier: self.c.text(module).to_string(),
                    member: None,
                    alias: alias.map(|a| self.c.text(a).to_string()),
                    wildcard: false,
                    range: range_of(child),
                });
            }
        }
    }

    /// `from m import x, y as z`, `from . import x`, `from m import *`.
    fn import_from(&mut self, node: Node<'a>) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        let specifier: String = self.c.text(module).split_whitespace().collect();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "wildcard_import" {
                self.c.import(ImportSite {
                    specifier: specifier.clone(),
                    member: None,
                    alias: None,
                    wildcard: true,
                    range: range_of(child),
                });
            }
        }

        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            let (member, alias) = match child.kind() {
                "aliased_import" => (
                    child.child_by_field_name("name"),
                    child.child_by_field_name("alias"),
                ),
                _ => (Some(child), None),
            };
            if let Some(member) = member {
                self.c.import(ImportSite {
                    specifier: specifier.clone(),
                    member: Some(self.c.text(member).to_string()),
                    alias: alias.map(|a| self.c.text(a).to_string()),
                    wildcard: false,
                    range: range_of(child),
                });
            }
        }
    }
}

/// Flatten `a`, `a.b.c` into dotted text; `None` when any segment is not a plain name.
fn dotted_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node.utf8_text(src).ok()?.to_string()),
        "attribute" => {
            let object = dotted_name(node.child_by_field_name("object")?, src)?;
            let attr = node.child_by_field_name("attribute")?.utf8_text(src).ok()?;
            Some(format!("{}.{}", object, attr))
        }
        _ => None,
    }
}

/// Identifiers bound by an assignment target (`a`, `a, b`, `(a, b)`); attribute and
/// subscript targets bind nothing new.
fn assignment_targets<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "identifier" => out.push(node),
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                assignment_targets(child, out);
            }
        }
        _ => {}
    }
}
