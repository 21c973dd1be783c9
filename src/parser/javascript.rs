use tree_sitter::Node;

use crate::graph::node::{SymbolKind, Visibility};

use super::{header_text, range_of, Collector, ImportSite, ReferenceKind, ScopeKind, SyntaxFacts};

/// Walk a JavaScript, TypeScript or TSX syntax tree.
///
/// The three grammars share node kinds for everything collected here; TS-only
/// constructs (interfaces, enums, accessibility modifiers, type annotations)
/// simply never occur in a JavaScript tree.
pub fn collect(root: Node, src: &[u8]) -> SyntaxFacts {
    let mut walker = JsWalker {
        c: Collector::new(src),
        exported: false,
    };
    walker.visit_children(root);
    walker.c.finish()
}

struct JsWalker<'a> {
    c: Collector<'a>,
    /// Set while visiting the declaration wrapped by an `export` statement.
    exported: bool,
}

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

impl<'a> JsWalker<'a> {
    fn visit_children(&mut self, node: Node<'a>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'a>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "function_signature" => {
                self.function(node)
            }
            "class_declaration" | "abstract_class_declaration" => self.class(node),
            "interface_declaration" => self.interface(node),
            "enum_declaration" => self.enumeration(node),
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                self.method(node)
            }
            "public_field_definition" | "field_definition" | "property_signature" => {
                self.field(node)
            }
            "lexical_declaration" | "variable_declaration" => self.variables(node),
            "export_statement" => self.export(node),
            "import_statement" => self.import(node),
            "call_expression" => self.call(node, "function"),
            "new_expression" => self.call(node, "constructor"),
            "member_expression" => self.member(node),
            "type_annotation" | "type_arguments" => self.types(node),
            _ => self.visit_children(node),
        }
    }

    fn top_level_visibility(&self) -> Option<Visibility> {
        if !self.c.at_module_level() {
            return None;
        }
        Some(if self.exported {
            Visibility::Public
        } else {
            Visibility::Private
        })
    }

    fn function(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let kind = if self.c.in_class() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let visibility = self.top_level_visibility();
        let decl = self.c.declare(kind, name, node, signature, visibility);
        self.exported = false;

        match name {
            Some(name) => {
                self.c.push_scope(name, ScopeKind::Function, Some(decl));
                self.function_parts(node);
                self.c.pop_scope();
            }
            None => self.function_parts(node),
        }
    }

    /// Parameters, return type and body of any function-like node.
    fn function_parts(&mut self, node: Node<'a>) {
        if let Some(params) = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"))
        {
            self.visit(params);
        }
        if let Some(ret) = node.child_by_field_name("return_type") {
            self.types(ret);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
    }

    fn class(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let visibility = self.top_level_visibility();
        let decl = self
            .c
            .declare(SymbolKind::Class, name, node, signature, visibility);
        self.exported = false;

        let Some(name) = name else {
            if let Some(body) = body {
                self.visit(body);
            }
            return;
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "class_heritage" {
                self.heritage(name, decl, child);
            }
        }
        if let Some(body) = body {
            self.c.push_scope(name, ScopeKind::Class, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    /// `extends Base` (JS), `extends Base implements I, J` (TS).
    fn heritage(&mut self, owner: &str, decl: usize, node: Node<'a>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "extends_clause" | "implements_clause" | "extends_type_clause" => {
                    let mut inner = child.walk();
                    for base in child.named_children(&mut inner) {
                        self.base(owner, decl, base);
                    }
                }
                _ => self.base(owner, decl, child),
            }
        }
    }

    fn base(&mut self, owner: &str, decl: usize, node: Node<'a>) {
        let target = match node.kind() {
            "generic_type" => node.child_by_field_name("name").unwrap_or(node),
            _ => node,
        };
        match dotted_name(target, self.c.src) {
            Some(text) => self
                .c
                .reference_from(owner, Some(decl), ReferenceKind::Inherit, text, target),
            // `extends mixin(Base)`: only the calls inside are interesting.
            None => self.visit(node),
        }
    }

    fn interface(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let visibility = self.top_level_visibility();
        let decl = self
            .c
            .declare(SymbolKind::Class, name, node, signature, visibility);
        self.exported = false;

        let Some(name) = name else {
            return;
        };
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "extends_type_clause" {
                let mut inner = child.walk();
                for base in child.named_children(&mut inner) {
                    self.base(name, decl, base);
                }
            }
        }
        if let Some(body) = body {
            self.c.push_scope(name, ScopeKind::Class, Some(decl));
            self.visit_children(body);
            self.c.pop_scope();
        }
    }

    fn enumeration(&mut self, node: Node<'a>) {
        let name = node.child_by_field_name("name").map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let visibility = self.top_level_visibility();
        self.c
            .declare(SymbolKind::Class, name, node, signature, visibility);
        self.exported = false;
    }

    /// Class and interface members. Computed names (`[Symbol.iterator]()`) yield
    /// a declaration without a name.
    fn method(&mut self, node: Node<'a>) {
        let name_node = node.child_by_field_name("name");
        let name = name_node
            .filter(|n| {
                matches!(
                    n.kind(),
                    "property_identifier" | "private_property_identifier" | "identifier"
                )
            })
            .map(|n| self.c.text(n));
        let body = node.child_by_field_name("body");
        let signature = header_text(node, body, self.c.src);
        let visibility = member_visibility(node, name_node, self.c.src);
        let kind = if self.c.in_class() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let decl = self.c.declare(kind, name, node, signature, Some(visibility));

        match name {
            Some(name) => {
                self.c.push_scope(name, ScopeKind::Function, Some(decl));
                self.function_parts(node);
                self.c.pop_scope();
            }
            None => self.function_parts(node),
        }
    }

    fn field(&mut self, node: Node<'a>) {
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.child_by_field_name("property"));
        let name = name_node
            .filter(|n| {
                matches!(
                    n.kind(),
                    "property_identifier" | "private_property_identifier" | "identifier"
                )
            })
            .map(|n| self.c.text(n));
        let value = node.child_by_field_name("value");
        let signature = header_text(node, value, self.c.src)
            .trim_end_matches('=')
            .trim()
            .trim_end_matches(';')
            .to_string();
        let visibility = member_visibility(node, name_node, self.c.src);
        self.c
            .declare(SymbolKind::Variable, name, node, signature, Some(visibility));

        if let Some(ty) = node.child_by_field_name("type") {
            self.types(ty);
        }
        if let Some(value) = value {
            self.visit(value);
        }
    }

    /// `const a = 1, b = () => {}` and friends. Only module-level bindings become
    /// symbols; values are always scanned.
    fn variables(&mut self, node: Node<'a>) {
        let is_const = node
            .child(0)
            .map(|k| self.c.text(k) == "const")
            .unwrap_or(false);
        let declare = self.c.at_module_level();
        let visibility = self.top_level_visibility();
        self.exported = false;

        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                self.visit(declarator);
                continue;
            }
            let name_node = declarator.child_by_field_name("name");
            let value = declarator.child_by_field_name("value");

            if let (Some(name_node), Some(value)) = (name_node, value)
                && self.require_import(name_node, value)
            {
                continue;
            }

            let name = name_node
                .filter(|n| n.kind() == "identifier")
                .map(|n| self.c.text(n));
            let is_function = value
                .map(|v| FUNCTION_VALUES.contains(&v.kind()))
                .unwrap_or(false);

            let mut decl = None;
            if declare && let Some(name) = name {
                let kind = if is_function {
                    SymbolKind::Function
                } else if is_const {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Variable
                };
                let header_end = match (is_function, value) {
                    (true, Some(v)) => v.child_by_field_name("body"),
                    (false, Some(v)) => Some(v),
                    _ => None,
                };
                let signature = header_text(declarator, header_end, self.c.src)
                    .trim_end_matches('=')
                    .trim()
                    .to_string();
                decl = Some(self.c.declare(kind, Some(name), declarator, signature, visibility));
            }

            if let Some(ty) = declarator.child_by_field_name("type") {
                self.types(ty);
            }
            match (is_function && declare, name, value) {
                (true, Some(name), Some(value)) => {
                    self.c.push_scope(name, ScopeKind::Function, decl);
                    self.function_parts(value);
                    self.c.pop_scope();
                }
                (_, _, Some(value)) => self.visit(value),
                _ => {}
            }
        }
    }

    /// CommonJS: `const x = require('./x')`, `const { a, b: c } = require('./x')`.
    fn require_import(&mut self, name: Node<'a>, value: Node<'a>) -> bool {
        if value.kind() != "call_expression" {
            return false;
        }
        let is_require = value
            .child_by_field_name("function")
            .map(|f| f.kind() == "identifier" && self.c.text(f) == "require")
            .unwrap_or(false);
        if !is_require {
            return false;
        }
        let Some(specifier) = value
            .child_by_field_name("arguments")
            .and_then(|args| args.named_child(0))
            .filter(|arg| arg.kind() == "string")
            .map(|arg| unquote(self.c.text(arg)))
        else {
            return false;
        };

        match name.kind() {
            "identifier" => self.c.import(ImportSite {
                specifier,
                member: None,
                alias: Some(self.c.text(name).to_string()),
                wildcard: false,
                range: range_of(value),
            }),
            "object_pattern" => {
                let mut cursor = name.walk();
                for prop in name.named_children(&mut cursor) {
                    let (member, alias) = match prop.kind() {
                        "shorthand_property_identifier_pattern" => (Some(prop), None),
                        "pair_pattern" => (
                            prop.child_by_field_name("key"),
                            prop.child_by_field_name("value")
                                .filter(|v| v.kind() == "identifier"),
                        ),
                        _ => (None, None),
                    };
                    if let Some(member) = member {
                        self.c.import(ImportSite {
                            specifier: specifier.clone(),
                            member: Some(self.c.text(member).to_string()),
                            alias: alias.map(|a| self.c.text(a).to_string()),
                            wildcard: false,
                            range: range_of(prop),
                        });
                    }
                }
            }
            _ => return false,
        }
        true
    }

    fn export(&mut self, node: Node<'a>) {
        if let Some(decl) = node.child_by_field_name("declaration") {
            self.exported = true;
            self.visit(decl);
            self.exported = false;
            return;
        }
        // `export * from './x'` and `export { a } from './x'` re-export another module.
        if let Some(source) = node.child_by_field_name("source") {
            let specifier = unquote(self.c.text(source));
            self.c.import(ImportSite {
                specifier,
                member: None,
                alias: None,
                wildcard: false,
                range: range_of(node),
            });
            return;
        }
        self.visit_children(node);
    }

    fn import(&mut self, node: Node<'a>) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = unquote(self.c.text(source));

        let clause = {
            let mut cursor = node.walk();
            node.children(&mut cursor)
                .find(|c| c.kind() == "import_clause")
        };
        let Some(clause) = clause else {
            // Side-effect import: `import './polyfill'`.
            self.c.import(ImportSite {
                specifier,
                member: None,
                alias: None,
                wildcard: false,
                range: range_of(node),
            });
            return;
        };

        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => self.c.import(ImportSite {
                    specifier: specifier.clone(),
                    member: Some("default".to_string()),
                    alias: Some(self.c.text(child).to_string()),
                    wildcard: false,
                    range: range_of(child),
                }),
                "namespace_import" => {
                    let alias = {
                        let mut inner = child.walk();
                        child
                            .named_children(&mut inner)
                            .find(|n| n.kind() == "identifier")
                            .map(|n| self.c.text(n).to_string())
                    };
                    self.c.import(ImportSite {
                        specifier: specifier.clone(),
                        member: None,
                        alias,
                        wildcard: false,
                        range: range_of(child),
                    });
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(member) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        self.c.import(ImportSite {
                            specifier: specifier.clone(),
                            member: Some(unquote(self.c.text(member))),
                            alias: spec
                                .child_by_field_name("alias")
                                .map(|a| self.c.text(a).to_string()),
                            wildcard: false,
                            range: range_of(spec),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn call(&mut self, node: Node<'a>, callee_field: &str) {
        if let Some(callee) = node.child_by_field_name(callee_field) {
            match dotted_name(callee, self.c.src) {
                Some(text) => self.c.reference(ReferenceKind::Call, text, callee),
                None => self.visit(callee),
            }
        }
        if let Some(args) = node.child_by_field_name("type_arguments") {
            self.types(args);
        }
        if let Some(args) = node.child_by_field_name("arguments") {
            self.visit(args);
        }
    }

    /// Plain property access (`config.port`). `this.x` is instance state and skipped.
    fn member(&mut self, node: Node<'a>) {
        match dotted_name(node, self.c.src) {
            Some(text) => {
                if !text.starts_with("this.") {
                    self.c.reference(ReferenceKind::Reference, text, node);
                }
            }
            None => self.visit_children(node),
        }
    }

    /// Named types inside an annotation. Builtins (`string`, `number`) are
    /// `predefined_type` nodes and never reach here as identifiers.
    fn types(&mut self, node: Node<'a>) {
        match node.kind() {
            "type_identifier" | "nested_type_identifier" => {
                let text = self.c.text(node).split_whitespace().collect::<String>();
                self.c.reference(ReferenceKind::Reference, text, node);
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.types(child);
                }
            }
        }
    }
}

/// `private` / `protected` modifiers and `#name` make a member private.
fn member_visibility(node: Node, name: Option<Node>, src: &[u8]) -> Visibility {
    if name.map(|n| n.kind() == "private_property_identifier").unwrap_or(false) {
        return Visibility::Private;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "accessibility_modifier" {
            let text = child.utf8_text(src).unwrap_or("");
            if text == "private" || text == "protected" {
                return Visibility::Private;
            }
        }
    }
    Visibility::Public
}

/// Flatten `a`, `a.b.c`, `this.run`, `ns.Type` into dotted text; `None` for
/// computed or call-result receivers.
fn dotted_name(node: Node, src: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" | "type_identifier" | "this" => Some(node.utf8_text(src).ok()?.to_string()),
        "member_expression" => {
            let object = dotted_name(node.child_by_field_name("object")?, src)?;
            let property = node.child_by_field_name("property")?;
            if property.kind() != "property_identifier" {
                return None;
            }
            Some(format!("{}.{}", object, property.utf8_text(src).ok()?))
        }
        "nested_type_identifier" | "nested_identifier" => Some(
            node.utf8_text(src)
                .ok()?
                .split_whitespace()
                .collect::<String>(),
        ),
        _ => None,
    }
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}
