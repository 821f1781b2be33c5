//! LLM bridge for best-effort file analysis
//!
//! Model output is untrusted: it may wrap JSON in prose, omit fields or use
//! strings where objects were asked for. Everything here degrades to empty
//! collections instead of failing.

use anyhow::Result;
use atlas_core::{Argument, Attribute, ClassKind, MethodSummary, Visibility};
use serde::Serialize;
use serde_json::{Map, Value};

/// Function reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedFunction {
    pub name: String,
    pub return_type: String,
    pub arguments: Vec<Argument>,
    pub decorators: Vec<String>,
    pub is_static: bool,
    pub is_async: bool,
    pub docstring: String,
    pub lineno: Option<u32>,
    pub end_lineno: Option<u32>,
}

/// Class reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedClass {
    pub name: String,
    pub kind: ClassKind,
    pub superclasses: Vec<String>,
    pub methods: Vec<MethodSummary>,
    pub attributes: Vec<Attribute>,
    pub docstring: String,
    pub lineno: Option<u32>,
    pub end_lineno: Option<u32>,
}

/// Enum reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedEnum {
    pub name: String,
    pub values: Vec<String>,
    pub docstring: String,
}

/// Structured result of analysing one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileAnalysis {
    pub description: String,
    pub functions: Vec<AnalyzedFunction>,
    pub classes: Vec<AnalyzedClass>,
    pub enums: Vec<AnalyzedEnum>,
    /// Module specifiers as written in the source.
    pub imports: Vec<String>,
    pub components: Vec<String>,
}

/// AI provider trait for different LLM backends
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Extract functions, classes, enums and imports from `content`.
    /// Transport failures are errors; malformed model output is not.
    async fn analyze_file(&self, content: &str, file_type: &str) -> Result<FileAnalysis>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

impl FileAnalysis {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.enums.is_empty()
            && self.imports.is_empty()
    }

    /// Parse a raw model reply. Never fails; unusable replies yield an empty analysis.
    pub fn parse_lenient(reply: &str) -> Self {
        let candidate = extract_json_object(reply).unwrap_or(reply);
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                let preview: String = reply.chars().take(200).collect();
                tracing::warn!("Unparseable analysis reply ({}): {}...", e, preview);
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        FileAnalysis {
            description: str_field(obj, "description").unwrap_or_default(),
            functions: items(obj, "functions").filter_map(parse_function).collect(),
            classes: items(obj, "classes").filter_map(parse_class).collect(),
            enums: items(obj, "enums").filter_map(parse_enum).collect(),
            imports: items(obj, "imports").filter_map(parse_import).collect(),
            components: items(obj, "components").filter_map(named).collect(),
        }
    }
}

fn items<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .into_iter()
        .flatten()
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn line_field(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    items(obj, key).filter_map(named).collect()
}

/// A bare string, or an object's `name`.
fn named(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => str_field(obj, "name"),
        _ => None,
    }
}

fn parse_argument(value: &Value) -> Option<Argument> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Argument {
            name: s.trim().to_string(),
            type_name: "Any".to_string(),
        }),
        Value::Object(obj) => Some(Argument {
            name: str_field(obj, "name")?,
            type_name: str_field(obj, "type").unwrap_or_else(|| "Any".to_string()),
        }),
        _ => None,
    }
}

fn parse_function(value: &Value) -> Option<AnalyzedFunction> {
    let empty = Map::new();
    let (name, obj) = match value {
        Value::Object(obj) => (str_field(obj, "name")?, obj),
        other => (named(other)?, &empty),
    };
    Some(AnalyzedFunction {
        name,
        return_type: str_field(obj, "return_type").unwrap_or_else(|| "Any".to_string()),
        arguments: items(obj, "arguments").filter_map(parse_argument).collect(),
        decorators: string_list(obj, "decorators"),
        is_static: bool_field(obj, "is_static"),
        is_async: bool_field(obj, "is_async"),
        docstring: str_field(obj, "docstring").unwrap_or_default(),
        lineno: line_field(obj, "lineno"),
        end_lineno: line_field(obj, "end_lineno"),
    })
}

fn parse_method(value: &Value) -> Option<MethodSummary> {
    let f = parse_function(value)?;
    let lineno = f.lineno.unwrap_or(0);
    Some(MethodSummary {
        name: f.name,
        return_type: f.return_type,
        arguments: f.arguments,
        decorators: f.decorators,
        is_static: f.is_static,
        is_async: f.is_async,
        docstring: f.docstring,
        lineno,
        end_lineno: f.end_lineno.unwrap_or(lineno),
    })
}

fn parse_attribute(value: &Value) -> Option<Attribute> {
    let arg = parse_argument(value)?;
    let visibility = match value
        .get("visibility")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("private") => Visibility::Private,
        Some("protected") => Visibility::Protected,
        Some(_) => Visibility::Public,
        None => Visibility::from_name(&arg.name),
    };
    Some(Attribute {
        name: arg.name,
        type_name: arg.type_name,
        visibility,
    })
}

fn parse_class(value: &Value) -> Option<AnalyzedClass> {
    let obj = value.as_object()?;
    let kind = match str_field(obj, "type").map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("abstract") => ClassKind::Abstract,
        Some("singleton") => ClassKind::Singleton,
        _ => ClassKind::Regular,
    };
    Some(AnalyzedClass {
        name: str_field(obj, "name")?,
        kind,
        superclasses: string_list(obj, "superclasses"),
        methods: items(obj, "methods").filter_map(parse_method).collect(),
        attributes: items(obj, "attributes").filter_map(parse_attribute).collect(),
        docstring: str_field(obj, "docstring").unwrap_or_default(),
        lineno: line_field(obj, "lineno"),
        end_lineno: line_field(obj, "end_lineno"),
    })
}

fn parse_enum(value: &Value) -> Option<AnalyzedEnum> {
    let obj = value.as_object()?;
    Some(AnalyzedEnum {
        name: str_field(obj, "name")?,
        values: string_list(obj, "values"),
        docstring: str_field(obj, "docstring").unwrap_or_default(),
    })
}

fn parse_import(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => ["module", "path", "source", "name"]
            .iter()
            .find_map(|k| str_field(obj, k)),
        _ => None,
    }
}
