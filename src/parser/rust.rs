use tree_sitter::Node;

use crate::graph::node::{SymbolKind, Visibility};

use super::{header_text, range_of, Collector, ImportSite, ReferenceKind, ScopeKind, SyntaxFacts};

/// Walk a Rust syntax tree.
///
/// `impl Type { .. }` does not declare anything itself: it opens a scope named after
/// `Type`, so methods get the scope path `[.., Type, method]` and land under the
/// struct/enum/trait of that name once parents are computed.
pub fn collect(root: Node, src: &[u8]) -> SyntaxFacts {
    let mut walker = RustWalker {
        c: Collector::new(src),
    };
    walker.visit_children(root);
    walker.c.finish()
}

struct RustWalker<'a> {
    c: Collector<'a>,
}

fn visibility(node: Node) -> Visibility {
    let mut cursor = node.walk();
    let public = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier");
    if public {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

impl<'a> RustWalker<'a> {
    fn visit_children(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "function_item" | "function_signature_item" => self.function(node),
            "struct_item" | "enum_item" | "union_item" => self.type_item(node),
            "trait_item" => self.trait_item(node),
            "impl_item" => self.impl_item(node),
            "mod_item" => self.mod_item(node),
            "const_item" => self.binding(node, SymbolKind::Constant),
            "static_item" => self.binding(node, SymbolKind::Variable),
            "field_declaration" => self.field(node),
            "use_declaration" => self.use_declaration(node),
            "call_expression" => self.call(node),
            "parameter" | "let_declaration" => {
                if let Some(ty) = node.child_by_field_name("type") {
                    self.types(ty);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "ordered_field_declaration_list" => self.types(node),
            // Variant payloads are not members of the enum.
            "enum_variant" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.types(body);
                }
            }
            // Macro bodies are unparsed token trees.
            "macro_invocation" | "macro_definition" | "attribute_item" | "inner_attribute_item" => {}
            _ => self.visit_children(node),
        }
    }

    fn function(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let kind = if self.c.in_class() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src)
            .trim_end_matches(';')
            .to_string();
        let decl = self
            .c
            .declare(kind, name, node, signature, Some(visibility(node)));

        let Some(name) = name else {
            return;
        };
        self.c.push_scope(name, ScopeKind::Function, Some(decl));
        if let Some(params) = node.child_by_field_name("parameters") {
            self.visit_children(params);
        }
        if let Some(ret) = node.child_by_field_name("return_type") {
            self.types(ret);
        }
        if let Some(body) = body {
            self.visit_children(body);
        }
        self.c.pop_scope();
    }

    fn type_item(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src)
            .trim_end_matches(';')
            .to_string();
        let decl = self
            .c
            .declare(SymbolKind::Class, name, node, signature, Some(visibility(node)));

        if let (Some(name), Some(body)) = (name, body) {
            self.c.push_scope(name, ScopeKind::Class, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    /// `trait Name: Super + Other { .. }`.
    fn trait_item(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let decl = self
            .c
            .declare(SymbolKind::Class, name, node, signature, Some(visibility(node)));

        let Some(name) = name else {
            return;
        };
        if let Some(bounds) = node.child_by_field_name("bounds") {
            let mut cursor = bounds.walk();
            for bound in bounds.named_children(&mut cursor) {
                if let Some(text) = type_path(bound, self.c.src) {
                    self.c
                        .reference_from(name, Some(decl), ReferenceKind::Inherit, text, bound);
                }
            }
        }
        if let Some(body) = body {
            self.c.push_scope(name, ScopeKind::Class, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    /// `impl Type { .. }` and `impl Trait for Type { .. }`.
    fn impl_item(&mut self, node: Node<'a>) {
        let Some(self_ty) = node
            .child_by_field_name("type")
            .and_then(|t| type_path(t, self.c.src))
        else {
            self.visit_children(node);
            return;
        };
        // Nested paths (`impl fmt::Display for a::B`) scope under the last segment.
        let owner = self_ty.rsplit('.').next().unwrap_or(&self_ty).to_string();

        if let Some(trait_node) = node.child_by_field_name("trait")
            && let Some(text) = type_path(trait_node, self.c.src)
        {
            self.c
                .reference_from(&owner, None, ReferenceKind::Inherit, text, trait_node);
        }
        if let Some(body) = node.child_by_field_name("body") {
            // No declaration of its own: members attach to the type by name.
            self.c.push_scope(&owner, ScopeKind::Class, None);
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    /// Inline `mod name { .. }`. `mod name;` refers to another file and declares nothing here.
    fn mod_item(&mut self, node: Node<'a>) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let signature = header_text(node, Some(body), self.c.src);
        let decl = self
            .c
            .declare(SymbolKind::Module, name, node, signature, Some(visibility(node)));
        if let Some(name) = name {
            self.c.push_scope(name, ScopeKind::Module, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    fn binding(&mut self, node: Node<'a>, kind: SymbolKind) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let value = node.child_by_field_name("value");
        let signature = header_text(node, value, self.c.src)
            .trim_end_matches(';')
            .trim_end_matches('=')
            .trim()
            .to_string();
        if !self.c.inside_function() {
            self.c
                .declare(kind, name, node, signature, Some(visibility(node)));
        }
        if let Some(ty) = node.child_by_field_name("type") {
            self.types(ty);
        }
        if let Some(value) = value {
            self.visit(value);
        }
    }

    fn field(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let signature = header_text(node, None, self.c.src);
        self.c.declare(
            SymbolKind::Variable,
            name,
            node,
            signature,
            Some(visibility(node)),
        );
        if let Some(ty) = node.child_by_field_name("type") {
            self.types(ty);
        }
    }

    fn call(&mut self, node: Node<'a>) {
        if let Some(func) = node.child_by_field_name("function") {
            match callee_path(func, self.c.src) {
                Some(text) => self.c.reference(ReferenceKind::Call, text, func),
                None => self.visit(func),
            }
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit_children(args);
        }
    }

    /// Named types inside a type expression, outermost path only.
    fn types(&mut self, node: Node<'a>) {
        match node.kind() {
            "type_identifier" | "scoped_type_identifier" => {
                if let Some(text) = type_path(node, self.c.src) {
                    self.c.reference(ReferenceKind::Reference, text, node);
                }
            }
            "generic_type" => {
                if let Some(base) = node.child_by_field_name("type") {
                    self.types(base);
                }
                if let Some(args) = node.child_by_field_name("type_arguments") {
                    self.types(args);
                }
            }
            "primitive_type" | "lifetime" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.types(child);
                }
            }
        }
    }

    fn use_declaration(&mut self, node: Node<'a>) {
        let Some(argument) = node.child_by_field_name("argument") else {
            return;
        };
        let mut flat = Vec::new();
        flatten_use(argument, &[], self.c.src, &mut flat);
        for item in flat {
            let site = match (item.wildcard, item.path.len()) {
                (true, _) => ImportSite {
                    specifier: item.path.join("::"),
                    member: None,
                    alias: None,
                    wildcard: true,
                    range: range_of(item.node),
                },
                (false, 0) => continue,
                (false, 1) => ImportSite {
                    specifier: item.path[0].clone(),
                    member: None,
                    alias: item.alias,
                    wildcard: false,
                    range: range_of(item.node),
                },
                (false, n) if item.path[n - 1] == "self" => ImportSite {
                    specifier: item.path[..n - 1].join("::"),
                    member: None,
                    alias: item.alias,
                    wildcard: false,
                    range: range_of(item.node),
                },
                (false, n) => ImportSite {
                    specifier: item.path[..n - 1].join("::"),
                    member: Some(item.path[n - 1].clone()),
                    alias: item.alias,
                    wildcard: false,
                    range: range_of(item.node),
                },
            };
            self.c.import(site);
        }
    }
}

struct UseItem<'t> {
    path: Vec<String>,
    alias: Option<String>,
    wildcard: bool,
    node: Node<'t>,
}

/// Expand a `use` tree into one item per imported path.
fn flatten_use<'t>(node: Node<'t>, prefix: &[String], src: &[u8], out: &mut Vec<UseItem<'t>>) {
    match node.kind() {
        "use_as_clause" => {
            if let Some(path) = node.child_by_field_name("path") {
                let mut full = prefix.to_vec();
                full.extend(path_segments(path, src));
                out.push(UseItem {
                    path: full,
                    alias: node
                        .child_by_field_name("alias")
                        .and_then(|a| a.utf8_text(src).ok())
                        .map(String::from),
                    wildcard: false,
                    node,
                });
            }
        }
        "scoped_use_list" => {
            let mut full = prefix.to_vec();
            if let Some(path) = node.child_by_field_name("path") {
                full.extend(path_segments(path, src));
            }
            if let Some(list) = node.child_by_field_name("list") {
                flatten_use(list, &full, src, out);
            }
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                flatten_use(child, prefix, src, out);
            }
        }
        "use_wildcard" => {
            let mut full = prefix.to_vec();
            if let Some(path) = node.named_child(0) {
                full.extend(path_segments(path, src));
            }
            out.push(UseItem {
                path: full,
                alias: None,
                wildcard: true,
                node,
            });
        }
        "identifier" | "scoped_identifier" | "crate" | "self" | "super" | "metavariable" => {
            let mut full = prefix.to_vec();
            full.extend(path_segments(node, src));
            out.push(UseItem {
                path: full,
                alias: None,
                wildcard: false,
                node,
            });
        }
        _ => {}
    }
}

fn path_segments(node: Node, src: &[u8]) -> Vec<String> {
    node.utf8_text(src)
        .unwrap_or("")
        .split("::")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `Foo`, `a::b::Foo`, `Foo<T>` -> `Foo`, `a.b.Foo`, `Foo`.
fn type_path(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(node.utf8_text(src).ok()?.to_string()),
        "scoped_type_identifier" | "scoped_identifier" => {
            Some(path_segments(node, src).join("."))
        }
        "generic_type" => type_path(node.child_by_field_name("type")?, src),
        _ => None,
    }
}

/// Callee text for `f()`, `Type::new()`, `self.run()`, `Self::helper()`, `f::<T>()`.
fn callee_path(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "scoped_identifier" => type_path(node, src),
        "generic_function" => callee_path(node.child_by_field_name("function")?, src),
        "field_expression" => {
            let value = node.child_by_field_name("value")?;
            let field = node.child_by_field_name("field")?.utf8_text(src).ok()?;
            let receiver = match value.kind() {
                "self" | "identifier" => value.utf8_text(src).ok()?.to_string(),
                _ => return None,
            };
            Some(format!("{}.{}", receiver, field))
        }
        _ => None,
    }
}
