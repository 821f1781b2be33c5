//! Python language extractor using tree-sitter

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use atlas_core::paths::{join, parent_dir};
use atlas_core::{
    Argument, Attribute, ClassKind, ClassNode, EnumNode, FileNode, FunctionNode, MethodSummary,
    Visibility, ids, model,
};
use tree_sitter::Node;

use crate::extractor::{FileMetadata, RawLink, SymbolExtractor};
use crate::parser_pool::{ParseRequest, ParseResult, ParserPool};

/// Final dotted segment of a base class that marks an enum.
const ENUM_MARKERS: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

pub struct PythonExtractor {
    parser_pool: ParserPool,
}

impl PythonExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    /// Extract from source already in memory. Blocks on the parser pool.
    pub fn extract_source(&self, file: &FileNode, source: String) -> Result<FileMetadata> {
        let parsed = self.parser_pool.parse_blocking(ParseRequest {
            content: source,
            path: PathBuf::from(&file.file_path),
        })?;
        extract_parsed(file, &parsed)
    }
}

#[async_trait::async_trait]
impl SymbolExtractor for PythonExtractor {
    async fn extract(&self, file: &FileNode) -> Result<FileMetadata> {
        let bytes = tokio::fs::read(&file.file_path)
            .await
            .with_context(|| format!("Failed to read {}", file.file_path))?;
        let parsed = self
            .parser_pool
            .parse(ParseRequest {
                content: String::from_utf8_lossy(&bytes).into_owned(),
                path: PathBuf::from(&file.file_path),
            })
            .await?;
        extract_parsed(file, &parsed)
    }
}

fn extract_parsed(file: &FileNode, parsed: &ParseResult) -> Result<FileMetadata> {
    let root = parsed.tree.root_node();
    if root.has_error() {
        anyhow::bail!(
            "Syntax error in {} near line {}",
            file.relative_path,
            first_error_line(root).unwrap_or(1)
        );
    }

    let mut visitor = PythonVisitor::new(file, parsed.content.as_bytes());
    visitor.visit(root);
    let mut metadata = visitor.metadata;
    metadata.assign_ordinals();
    Ok(metadata)
}

fn line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// Pre-order walk. The callback returns whether to descend.
fn walk<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>) -> bool) {
    if !f(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, f);
    }
}

fn first_error_line(root: Node) -> Option<u32> {
    let mut found = None;
    walk(root, &mut |n| {
        if found.is_some() {
            return false;
        }
        if n.is_error() || n.is_missing() {
            found = Some(line(n));
            return false;
        }
        n.has_error()
    });
    found
}

fn is_field_of(node: Node, parent: Node, field: &str) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|n| n.id() == node.id())
}

/// `a.b.c` -> `a/b/c`
fn module_path(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// A module file, then the package initializer of the same name.
fn module_candidates(path: &str) -> Vec<String> {
    vec![format!("{path}.py"), format!("{path}/__init__.py")]
}

/// Strip the quotes from a docstring and dedent it.
pub fn clean_docstring(raw: &str) -> String {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = vec![first];
    out.extend(
        rest.iter()
            .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end().to_string()),
    );
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

struct PythonVisitor<'a> {
    file: &'a FileNode,
    source: &'a [u8],
    metadata: FileMetadata,
    /// Local name bound by an import -> candidate files.
    bindings: HashMap<String, Vec<String>>,
}

impl<'a> PythonVisitor<'a> {
    fn new(file: &'a FileNode, source: &'a [u8]) -> Self {
        Self {
            file,
            source,
            metadata: FileMetadata::empty(),
            bindings: HashMap::new(),
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn visit(&mut self, root: Node) {
        let mut imports = Vec::new();
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        walk(root, &mut |n| match n.kind() {
            "import_statement" | "import_from_statement" => {
                imports.push(n);
                false
            }
            "function_definition" => {
                functions.push(n);
                true
            }
            "class_definition" => {
                classes.push(n);
                true
            }
            _ => true,
        });

        for node in imports {
            if node.kind() == "import_statement" {
                self.import_statement(node);
            } else {
                self.import_from_statement(node);
            }
        }
        for node in functions {
            self.function(node);
        }
        for node in classes {
            self.class(node);
        }
        self.references(root);
    }

    // ── Imports ─────────────────────────────────────────────

    fn bind(&mut self, local: &str, candidates: Vec<String>) {
        if !local.is_empty() {
            self.bindings.insert(local.to_string(), candidates);
        }
    }

    /// `(dotted name, alias)` for a `dotted_name` or `aliased_import`.
    fn name_and_alias(&self, node: Node) -> (&'a str, Option<&'a str>) {
        if node.kind() == "aliased_import" {
            let name = node.child_by_field_name("name").map(|n| self.text(n)).unwrap_or("");
            let alias = node.child_by_field_name("alias").map(|n| self.text(n));
            (name, alias)
        } else {
            (self.text(node), None)
        }
    }

    fn import_statement(&mut self, node: Node) {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        for name_node in names {
            let (module, alias) = self.name_and_alias(name_node);
            if module.is_empty() {
                continue;
            }
            let path = module_path(module);
            self.metadata
                .imports
                .push(RawLink::import(module, module_candidates(&path)).at_line(line(node)));

            // `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`.
            match alias {
                Some(alias) => self.bind(alias, module_candidates(&path)),
                None => {
                    let head = module.split('.').next().unwrap_or(module);
                    self.bind(head, module_candidates(&module_path(head)));
                }
            }
        }
    }

    fn import_from_statement(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (level, module) = if module_node.kind() == "relative_import" {
            let mut level = 0;
            let mut module = "";
            let mut cursor = module_node.walk();
            for child in module_node.named_children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => level = self.text(child).matches('.').count(),
                    "dotted_name" => module = self.text(child),
                    _ => {}
                }
            }
            (level, module)
        } else {
            (0, self.text(module_node))
        };

        let base = if level > 0 {
            let mut dir = parent_dir(&self.file.relative_path);
            for _ in 0..level {
                dir = parent_dir(dir);
            }
            dir.to_string()
        } else {
            String::new()
        };

        let mut cursor = node.walk();
        let names: Vec<(&str, Option<&str>)> = node
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.name_and_alias(n))
            .collect();

        if module.is_empty() {
            // `from . import x`: each name is a module next to the base.
            for (name, alias) in names {
                let path = join(&base, &module_path(name));
                let candidates = module_candidates(&path);
                self.metadata
                    .imports
                    .push(RawLink::import(name, candidates.clone()).at_line(line(node)));
                self.bind(alias.unwrap_or(name), candidates);
            }
            return;
        }

        let path = join(&base, &module_path(module));
        self.metadata
            .imports
            .push(RawLink::import(module, module_candidates(&path)).at_line(line(node)));

        for (name, alias) in names {
            let local = alias.unwrap_or(name);
            let candidates = vec![
                format!("{}/{}.py", path, module_path(name)),
                format!("{path}.py"),
                format!("{path}/__init__.py"),
            ];
            self.bind(local, candidates);
        }
    }

    // ── Definitions ─────────────────────────────────────────

    fn decorators(&self, definition: Node) -> Vec<String> {
        let Some(parent) = definition.parent().filter(|p| p.kind() == "decorated_definition")
        else {
            return Vec::new();
        };
        let mut cursor = parent.walk();
        parent
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .filter_map(|decorator| {
                let mut inner = decorator.walk();
                let expr = decorator
                    .named_children(&mut inner)
                    .find(|c| c.kind() != "comment")?;
                let target = if expr.kind() == "call" {
                    expr.child_by_field_name("function")?
                } else {
                    expr
                };
                Some(format!("@{}", self.text(target)))
            })
            .collect()
    }

    fn docstring(&self, definition: Node) -> String {
        let Some(body) = definition.child_by_field_name("body") else {
            return String::new();
        };
        let mut cursor = body.walk();
        let Some(first) = body.named_children(&mut cursor).find(|c| c.kind() != "comment") else {
            return String::new();
        };
        if first.kind() != "expression_statement" {
            return String::new();
        }
        let Some(string) = first.named_child(0).filter(|s| s.kind() == "string") else {
            return String::new();
        };
        let mut inner = string.walk();
        let content: String = string
            .named_children(&mut inner)
            .filter(|c| c.kind() == "string_content")
            .map(|c| self.text(c))
            .collect();
        clean_docstring(&content)
    }

    fn arguments(&self, parameters: Node) -> Vec<Argument> {
        let mut cursor = parameters.walk();
        parameters
            .named_children(&mut cursor)
            .filter_map(|param| {
                let (name, type_node) = match param.kind() {
                    "identifier" => (Some(param), None),
                    "typed_parameter" => {
                        let mut c = param.walk();
                        let name = param
                            .named_children(&mut c)
                            .next()
                            .filter(|n| n.kind() == "identifier");
                        (name, param.child_by_field_name("type"))
                    }
                    "default_parameter" => (param.child_by_field_name("name"), None),
                    "typed_default_parameter" => (
                        param.child_by_field_name("name"),
                        param.child_by_field_name("type"),
                    ),
                    _ => (None, None),
                };
                let name = name.filter(|n| n.kind() == "identifier")?;
                Some(Argument {
                    name: self.text(name).to_string(),
                    type_name: type_node
                        .map(|t| self.text(t).to_string())
                        .unwrap_or_else(|| "Any".to_string()),
                })
            })
            .collect()
    }

    fn method_summary(&self, node: Node) -> Option<MethodSummary> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let decorators = self.decorators(node);
        let is_async = node.child(0).is_some_and(|c| c.kind() == "async");
        Some(MethodSummary {
            name,
            return_type: node
                .child_by_field_name("return_type")
                .map(|t| self.text(t).to_string())
                .unwrap_or_else(|| "Any".to_string()),
            arguments: node
                .child_by_field_name("parameters")
                .map(|p| self.arguments(p))
                .unwrap_or_default(),
            is_static: decorators.iter().any(|d| d == "@staticmethod"),
            decorators,
            is_async,
            docstring: self.docstring(node),
            lineno: line(node),
            end_lineno: end_line(node),
        })
    }

    fn function(&mut self, node: Node) {
        let Some(m) = self.method_summary(node) else {
            return;
        };
        self.metadata.functions.push(FunctionNode {
            function_id: ids::fresh_id(),
            file_id: self.file.file_id.clone(),
            project_id: self.file.project_id.clone(),
            name: m.name,
            return_type: m.return_type,
            arguments: m.arguments,
            decorators: m.decorators,
            is_static: m.is_static,
            is_async: m.is_async,
            docstring: m.docstring,
            lineno: m.lineno,
            end_lineno: m.end_lineno,
            ordinal: 0,
            created_at: model::timestamp(),
        });
    }

    fn class(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();

        let mut superclasses = Vec::new();
        let mut metaclass = None;
        if let Some(args) = node.child_by_field_name("superclasses") {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                match arg.kind() {
                    "identifier" | "attribute" => superclasses.push(self.text(arg).to_string()),
                    "keyword_argument" => {
                        let key = arg.child_by_field_name("name").map(|n| self.text(n));
                        if key == Some("metaclass") {
                            metaclass = arg.child_by_field_name("value").map(|v| self.text(v));
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut methods = Vec::new();
        let mut attributes = Vec::new();
        let mut values = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                match item.kind() {
                    "function_definition" => methods.extend(self.method_summary(item)),
                    "decorated_definition" => {
                        if let Some(def) = item
                            .child_by_field_name("definition")
                            .filter(|d| d.kind() == "function_definition")
                        {
                            methods.extend(self.method_summary(def));
                        }
                    }
                    "expression_statement" => {
                        let Some(assign) = item.named_child(0).filter(|a| a.kind() == "assignment")
                        else {
                            continue;
                        };
                        let Some(target) = assign
                            .child_by_field_name("left")
                            .filter(|l| l.kind() == "identifier")
                        else {
                            continue;
                        };
                        let target = self.text(target).to_string();
                        if let Some(annotation) = assign.child_by_field_name("type") {
                            attributes.push(Attribute {
                                visibility: Visibility::from_name(&target),
                                type_name: self.text(annotation).to_string(),
                                name: target.clone(),
                            });
                        }
                        values.push(target);
                    }
                    _ => {}
                }
            }
        }

        let decorators = self.decorators(node);
        let last_segment = |s: &str| s.rsplit('.').next().unwrap_or(s).to_string();
        let kind = if decorators.iter().any(|d| last_segment(d) == "singleton" || d == "@singleton")
            || metaclass.is_some_and(|m| m.to_ascii_lowercase().contains("singleton"))
        {
            ClassKind::Singleton
        } else if methods.iter().any(|m| {
            m.decorators
                .iter()
                .any(|d| d == "@abstractmethod" || d == "@abc.abstractmethod")
        }) || superclasses.iter().any(|s| last_segment(s) == "ABC")
            || metaclass.is_some_and(|m| last_segment(m) == "ABCMeta")
        {
            ClassKind::Abstract
        } else {
            ClassKind::Regular
        };

        let docstring = self.docstring(node);
        let (lineno, end_lineno) = (line(node), end_line(node));

        if superclasses
            .iter()
            .any(|s| ENUM_MARKERS.contains(&last_segment(s).as_str()))
        {
            self.metadata.enums.push(EnumNode {
                enum_id: ids::fresh_id(),
                file_id: self.file.file_id.clone(),
                project_id: self.file.project_id.clone(),
                name: name.clone(),
                values,
                docstring: docstring.clone(),
                lineno,
                end_lineno,
                ordinal: 0,
                created_at: model::timestamp(),
            });
        }

        self.metadata.classes.push(ClassNode {
            class_id: ids::fresh_id(),
            file_id: self.file.file_id.clone(),
            project_id: self.file.project_id.clone(),
            name,
            kind,
            superclasses,
            methods,
            attributes,
            docstring,
            lineno,
            end_lineno,
            ordinal: 0,
            created_at: model::timestamp(),
        });
    }

    // ── References ──────────────────────────────────────────

    /// Whether an identifier is a use of a name rather than a definition,
    /// parameter, keyword or attribute member.
    fn is_name_use(node: Node) -> bool {
        let Some(parent) = node.parent() else {
            return true;
        };
        match parent.kind() {
            "function_definition" | "class_definition" => !is_field_of(node, parent, "name"),
            "attribute" => !is_field_of(node, parent, "attribute"),
            "keyword_argument" => !is_field_of(node, parent, "name"),
            "default_parameter" | "typed_default_parameter" => !is_field_of(node, parent, "name"),
            "parameters" | "lambda_parameters" | "typed_parameter" => false,
            _ => true,
        }
    }

    fn references(&mut self, root: Node) {
        if self.bindings.is_empty() {
            return;
        }
        let mut found: Vec<(String, u32)> = Vec::new();
        walk(root, &mut |n| match n.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => false,
            "identifier" => {
                let name = self.text(n);
                if self.bindings.contains_key(name)
                    && Self::is_name_use(n)
                    && !found.iter().any(|(seen, _)| seen == name)
                {
                    found.push((name.to_string(), line(n)));
                }
                false
            }
            _ => true,
        });

        for (name, lineno) in found {
            if let Some(candidates) = self.bindings.get(&name) {
                self.metadata.references.push(
                    RawLink::reference(name.clone(), candidates.clone(), "module_reference")
                        .at_line(lineno),
                );
            }
        }
    }
}
