// C/C++ symbol extraction using tree-sitter

use tree_sitter::{Node, Parser as TreeParser, Tree};

use crate::index::{Parser, SymbolKind, SymbolRecord, SCOPE_SEPARATOR};

/// File extensions handled by the C++ grammar (C sources parse fine with it)
pub const CPP_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "h++", "inl", "ipp",
];

/// C/C++ parser using tree-sitter
pub struct CppParser;

impl Default for CppParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CppParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_tree(&self, content: &str) -> anyhow::Result<Tree> {
        let mut parser = TreeParser::new();
        parser.set_language(&tree_sitter_cpp::LANGUAGE.into())?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse C++ code"))?;

        Ok(tree)
    }

    fn extract_symbols(&self, tree: &Tree, content: &str, file_path: &str) -> Vec<SymbolRecord> {
        let mut walker = Walker {
            content,
            file_path,
            symbols: Vec::new(),
            scope_stack: Vec::new(),
        };
        walker.walk(tree.root_node());
        walker.symbols
    }
}

impl Parser for CppParser {
    fn can_parse(&self, file_path: &str) -> bool {
        std::path::Path::new(file_path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| CPP_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn parse(&self, content: &str, file_path: &str) -> anyhow::Result<Vec<SymbolRecord>> {
        let tree = self.parse_tree(content)?;
        Ok(self.extract_symbols(&tree, content, file_path))
    }
}

/// One traversal of a syntax tree, tracking the enclosing scope names
struct Walker<'a> {
    content: &'a str,
    file_path: &'a str,
    symbols: Vec<SymbolRecord>,
    scope_stack: Vec<String>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, node: Node) {
        match node.kind() {
            "namespace_definition" => self.namespace(node),
            "class_specifier" => self.record_type(node, SymbolKind::Class),
            "struct_specifier" | "union_specifier" => self.record_type(node, SymbolKind::Struct),
            "enum_specifier" => self.enumeration(node),
            "function_definition" => self.function_definition(node),
            "declaration" => self.declaration(node, false),
            "field_declaration" => self.declaration(node, true),
            "type_definition" => self.type_definition(node),
            "alias_declaration" => self.alias_declaration(node),
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child);
        }
    }

    /// Walk `body` with `segments` pushed onto the scope stack
    fn walk_scoped(&mut self, body: Node, segments: Vec<String>) {
        let pushed = segments.len();
        self.scope_stack.extend(segments);
        self.walk_children(body);
        let keep = self.scope_stack.len() - pushed;
        self.scope_stack.truncate(keep);
    }

    fn namespace(&mut self, node: Node) {
        let name = node.child_by_field_name("name");
        let body = node.child_by_field_name("body");

        let Some(name_node) = name else {
            // anonymous namespace: members belong to the enclosing scope
            if let Some(body) = body {
                self.walk_children(body);
            }
            return;
        };

        let Some(text) = self.text(name_node) else {
            return;
        };
        let segments: Vec<String> = text.split(SCOPE_SEPARATOR).map(|s| s.trim().to_string()).collect();

        // `namespace a::b` records `a` and then `b` inside it
        for depth in 0..segments.len() {
            let (qualifier, rest) = segments.split_at(depth);
            let mut symbol = self.symbol(&rest[0], SymbolKind::Namespace, qualifier, name_node);
            symbol.end_line = Some(node.end_position().row);
            symbol.is_definition = true;
            self.symbols.push(symbol);
        }

        if let Some(body) = body {
            self.walk_scoped(body, segments);
        }
    }

    fn record_type(&mut self, node: Node, kind: SymbolKind) {
        let body = node.child_by_field_name("body");

        let Some((qualifier, name, name_node)) = node
            .child_by_field_name("name")
            .and_then(|n| self.split_name(n).map(|(q, s)| (q, s, n)))
        else {
            if let Some(body) = body {
                self.walk_children(body);
            }
            return;
        };

        let mut symbol = self.symbol(&name, kind, &qualifier, name_node);
        match body {
            Some(body) => {
                symbol.is_definition = true;
                symbol.end_line = Some(node.end_position().row);
                self.symbols.push(symbol);

                let mut segments = qualifier;
                segments.push(name);
                self.walk_scoped(body, segments);
            }
            None => {
                symbol.is_declaration = true;
                self.symbols.push(symbol);
            }
        }
    }

    fn enumeration(&mut self, node: Node) {
        let body = node.child_by_field_name("body");
        let name = node
            .child_by_field_name("name")
            .and_then(|n| self.split_name(n).map(|(q, s)| (q, s, n)));

        let scoped_enum = {
            let mut cursor = node.walk();
            let scoped = node
                .children(&mut cursor)
                .any(|c| matches!(c.kind(), "class" | "struct"));
            scoped
        };

        let mut value_scope: Vec<String> = Vec::new();
        if let Some((qualifier, name, name_node)) = name {
            let mut symbol = self.symbol(&name, SymbolKind::Enum, &qualifier, name_node);
            if body.is_some() {
                symbol.is_definition = true;
            } else {
                symbol.is_declaration = true;
            }
            self.symbols.push(symbol);

            if scoped_enum {
                value_scope = qualifier;
                value_scope.push(name);
            }
        }

        let Some(body) = body else {
            return;
        };

        let mut cursor = body.walk();
        let enumerators: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "enumerator")
            .collect();
        for enumerator in enumerators {
            if let Some(name_node) = enumerator.child_by_field_name("name") {
                if let Some(text) = self.text(name_node) {
                    let mut symbol = self.symbol(text, SymbolKind::EnumValue, &value_scope, name_node);
                    symbol.is_definition = true;
                    self.symbols.push(symbol);
                }
            }
        }
    }

    fn function_definition(&mut self, node: Node) {
        let body = node.child_by_field_name("body");
        let function = node
            .child_by_field_name("declarator")
            .and_then(find_function_declarator);

        let Some(function) = function else {
            if let Some(body) = body {
                self.walk_children(body);
            }
            return;
        };

        let Some((qualifier, name, name_node)) = function
            .child_by_field_name("declarator")
            .and_then(declarator_name)
            .and_then(|n| self.split_name(n).map(|(q, s)| (q, s, n)))
        else {
            return;
        };

        let mut symbol = self.symbol(&name, SymbolKind::Function, &qualifier, name_node);
        symbol.is_definition = true;
        symbol.end_line = Some(node.end_position().row);
        symbol.type_ = node.child_by_field_name("type").and_then(|t| self.flat_text(t));
        symbol.signature = self.flat_text(function);
        self.symbols.push(symbol);

        if let Some(body) = body {
            let mut segments = qualifier;
            segments.push(name);
            self.walk_scoped(body, segments);
        }
    }

    /// Variables, prototypes, data members and member function declarations
    fn declaration(&mut self, node: Node, member: bool) {
        if let Some(type_node) = node.child_by_field_name("type") {
            self.walk(type_node);
        }

        let type_text = node.child_by_field_name("type").and_then(|t| self.flat_text(t));
        let is_extern = self.has_storage_class(node, "extern");
        let is_static = self.has_storage_class(node, "static");

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();

        for declarator in declarators {
            let Some((qualifier, name, name_node)) = declarator_name(declarator)
                .and_then(|n| self.split_name(n).map(|(q, s)| (q, s, n)))
            else {
                continue;
            };

            match find_function_declarator(declarator) {
                Some(function) => {
                    let mut symbol = self.symbol(&name, SymbolKind::Function, &qualifier, name_node);
                    symbol.is_declaration = true;
                    symbol.type_ = type_text.clone();
                    symbol.signature = self.flat_text(function);
                    self.symbols.push(symbol);
                }
                None => {
                    let mut symbol = self.symbol(&name, SymbolKind::Variable, &qualifier, name_node);
                    // in-class static data members need an out-of-line definition
                    let pure_declaration = is_extern || (member && is_static);
                    symbol.is_declaration = pure_declaration;
                    symbol.is_definition = !pure_declaration;
                    symbol.type_ = type_text.clone();
                    self.symbols.push(symbol);
                }
            }
        }
    }

    fn type_definition(&mut self, node: Node) {
        if let Some(type_node) = node.child_by_field_name("type") {
            self.walk(type_node);
        }
        let type_text = node.child_by_field_name("type").and_then(|t| self.flat_text(t));

        let mut cursor = node.walk();
        let declarators: Vec<Node> = node.children_by_field_name("declarator", &mut cursor).collect();
        for declarator in declarators {
            if let Some(name_node) = declarator_name(declarator) {
                if let Some(text) = self.text(name_node) {
                    let mut symbol = self.symbol(text, SymbolKind::Typedef, &[], name_node);
                    symbol.is_definition = true;
                    symbol.type_ = type_text.clone();
                    self.symbols.push(symbol);
                }
            }
        }
    }

    fn alias_declaration(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let Some(text) = self.text(name_node) else {
            return;
        };

        let mut symbol = self.symbol(text, SymbolKind::Typedef, &[], name_node);
        symbol.is_definition = true;
        symbol.type_ = node.child_by_field_name("type").and_then(|t| self.flat_text(t));
        self.symbols.push(symbol);
    }

    /// A record at `name_node`, scoped by the stack plus any explicit qualifier
    fn symbol(&self, name: &str, kind: SymbolKind, qualifier: &[String], name_node: Node) -> SymbolRecord {
        let scope = self
            .scope_stack
            .iter()
            .chain(qualifier.iter())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(SCOPE_SEPARATOR);
        let position = name_node.start_position();

        SymbolRecord {
            name: name.to_string(),
            scope,
            kind,
            file: self.file_path.to_string(),
            line: position.row,
            column: position.column,
            end_line: None,
            type_: None,
            signature: None,
            is_definition: false,
            is_declaration: false,
        }
    }

    /// `a::b::name` -> (["a", "b"], "name"); template arguments are dropped
    fn split_name(&self, node: Node) -> Option<(Vec<String>, String)> {
        let name_node = match node.kind() {
            "template_function" | "template_method" | "template_type" => node.child_by_field_name("name")?,
            _ => node,
        };
        let text = self.text(name_node)?;
        let mut segments: Vec<String> = text
            .split(SCOPE_SEPARATOR)
            .map(|s| s.split('<').next().unwrap_or(s).trim().to_string())
            .collect();
        let name = segments.pop().filter(|s| !s.is_empty())?;
        segments.retain(|s| !s.is_empty());
        Some((segments, name))
    }

    fn has_storage_class(&self, node: Node, keyword: &str) -> bool {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .any(|c| c.kind() == "storage_class_specifier" && self.text(c) == Some(keyword));
        found
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        node.utf8_text(self.content.as_bytes()).ok()
    }

    /// Node text with whitespace runs collapsed
    fn flat_text(&self, node: Node) -> Option<String> {
        self.text(node)
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// The node naming what a declarator declares
fn declarator_name(node: Node) -> Option<Node> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "qualified_identifier"
        | "destructor_name" | "operator_name" | "template_function" | "template_method" => Some(node),
        _ => {
            if let Some(inner) = node.child_by_field_name("declarator") {
                return declarator_name(inner);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(declarator_name)
        }
    }
}

/// The function declarator inside pointer/reference wrappers, if any
fn find_function_declarator(node: Node) -> Option<Node> {
    match node.kind() {
        "function_declarator" => Some(node),
        "pointer_declarator" | "reference_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
            if let Some(inner) = node.child_by_field_name("declarator") {
                return find_function_declarator(inner);
            }
            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            children.into_iter().find_map(find_function_declarator)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::scope::ScopeTree;

    const SAMPLE: &str = r#"namespace math {
class Calculator {
public:
    double add(double a, double b);
    int count = 0;
};
}

double math::Calculator::add(double a, double b) {
    double result = a + b;
    return result;
}

extern int shared;
typedef unsigned long size_type;
enum Color { Red, Green };
"#;

    fn parse(content: &str) -> Vec<SymbolRecord> {
        CppParser::new().parse(content, "sample.cpp").unwrap()
    }

    fn find<'s>(symbols: &'s [SymbolRecord], name: &str, kind: SymbolKind) -> &'s SymbolRecord {
        symbols
            .iter()
            .find(|s| s.name == name && s.kind == kind && (kind != SymbolKind::Function || s.is_definition))
            .or_else(|| symbols.iter().find(|s| s.name == name && s.kind == kind))
            .unwrap_or_else(|| panic!("missing {} {:?} in {:#?}", name, kind, symbols))
    }

    #[test]
    fn test_can_parse() {
        let parser = CppParser::new();
        assert!(parser.can_parse("src/calc.cpp"));
        assert!(parser.can_parse("include/calc.HPP"));
        assert!(parser.can_parse("legacy/io.c"));
        assert!(!parser.can_parse("main.rs"));
        assert!(!parser.can_parse("Makefile"));
    }

    #[test]
    fn test_namespace_and_class() {
        let symbols = parse(SAMPLE);

        let math = find(&symbols, "math", SymbolKind::Namespace);
        assert_eq!((math.line, math.end_line), (0, Some(6)));
        assert_eq!(math.scope, "");
        assert!(math.is_definition);

        let calc = find(&symbols, "Calculator", SymbolKind::Class);
        assert_eq!(calc.line, 1);
        assert_eq!(calc.scope, "math");
        assert_eq!(calc.end_line, Some(5));
        assert!(calc.is_definition);
    }

    #[test]
    fn test_members() {
        let symbols = parse(SAMPLE);

        let declared = symbols
            .iter()
            .find(|s| s.name == "add" && s.is_declaration)
            .unwrap();
        assert_eq!(declared.line, 3);
        assert_eq!(declared.scope, "math::Calculator");
        assert!(!declared.is_definition);

        let count = find(&symbols, "count", SymbolKind::Variable);
        assert_eq!(count.scope, "math::Calculator");
        assert_eq!(count.type_.as_deref(), Some("int"));
        assert!(count.is_definition);
    }

    #[test]
    fn test_out_of_line_definition() {
        let symbols = parse(SAMPLE);

        let add = find(&symbols, "add", SymbolKind::Function);
        assert!(add.is_definition);
        assert_eq!(add.line, 8);
        assert_eq!(add.end_line, Some(11));
        assert_eq!(add.scope, "math::Calculator");
        assert_eq!(add.type_.as_deref(), Some("double"));
        assert_eq!(
            add.signature.as_deref(),
            Some("math::Calculator::add(double a, double b)")
        );

        let result = find(&symbols, "result", SymbolKind::Variable);
        assert_eq!(result.line, 9);
        assert_eq!(result.scope, "math::Calculator::add");
    }

    #[test]
    fn test_globals() {
        let symbols = parse(SAMPLE);

        let shared = find(&symbols, "shared", SymbolKind::Variable);
        assert!(shared.is_declaration);
        assert!(!shared.is_definition);

        let size_type = find(&symbols, "size_type", SymbolKind::Typedef);
        assert_eq!(size_type.type_.as_deref(), Some("unsigned long"));

        let color = find(&symbols, "Color", SymbolKind::Enum);
        assert!(color.is_definition);
        let red = find(&symbols, "Red", SymbolKind::EnumValue);
        assert_eq!(red.scope, "");
        assert_eq!(red.line, 15);
    }

    #[test]
    fn test_scoped_enum_and_alias() {
        let symbols = parse("namespace ui {\nenum class Mode { Dark, Light };\nusing Id = int;\n}\n");

        let dark = find(&symbols, "Dark", SymbolKind::EnumValue);
        assert_eq!(dark.scope, "ui::Mode");

        let id = find(&symbols, "Id", SymbolKind::Typedef);
        assert_eq!(id.scope, "ui");
    }

    #[test]
    fn test_forward_declaration_and_prototype() {
        let symbols = parse("class Widget;\nint compute(int x);\n");

        let widget = find(&symbols, "Widget", SymbolKind::Class);
        assert!(widget.is_declaration);
        assert!(!widget.is_definition);

        let compute = find(&symbols, "compute", SymbolKind::Function);
        assert!(compute.is_declaration);
        assert_eq!(compute.end_line, None);
    }

    #[test]
    fn test_nested_namespace_definition() {
        let symbols = parse("namespace net::http {\nint port = 80;\n}\n");

        let namespaces: Vec<(&str, &str)> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Namespace)
            .map(|s| (s.name.as_str(), s.scope.as_str()))
            .collect();
        assert_eq!(namespaces, vec![("net", ""), ("http", "net")]);
        assert_eq!(find(&symbols, "port", SymbolKind::Variable).scope, "net::http");

        let tree = ScopeTree::build("sample.cpp", &symbols);
        assert_eq!(tree.roots().len(), 1);
        let http = tree.find_at_line(1).unwrap();
        assert_eq!(tree.path(http), "net::http");
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }
}
