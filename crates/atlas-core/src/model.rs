//! Core data structures for the project graph

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property bag attached to a node or relationship.
pub type PropertyMap = serde_json::Map<String, Value>;

/// Current UTC time as RFC 3339, the format of every `created_at`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Closed set of node labels the analysis writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Project,
    Folder,
    File,
    Function,
    Class,
    Enum,
    Component,
    Report,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Project => "Project",
            Label::Folder => "Folder",
            Label::File => "File",
            Label::Function => "Function",
            Label::Class => "Class",
            Label::Enum => "Enum",
            Label::Component => "Component",
            Label::Report => "Report",
        }
    }

    /// Property used to address a node of this label from a relationship.
    pub fn key_property(&self) -> &'static str {
        match self {
            Label::Project => "project_id",
            Label::Folder => "folder_id",
            Label::File => "file_id",
            Label::Function => "function_id",
            Label::Class => "class_id",
            Label::Enum => "enum_id",
            Label::Component => "component_id",
            Label::Report => "report_id",
        }
    }

    /// Properties that identify the same logical entity across runs.
    /// Node writes upsert on these; properties are only set on create.
    pub fn merge_keys(&self) -> &'static [&'static str] {
        match self {
            Label::Project => &["project_id"],
            Label::Folder | Label::File => &["project_id", "relative_path"],
            Label::Function | Label::Class => &["file_id", "name", "lineno", "ordinal"],
            Label::Enum => &["file_id", "name", "ordinal"],
            Label::Component => &["file_id"],
            Label::Report => &["report_id"],
        }
    }

    pub fn all() -> &'static [Label] {
        &[
            Label::Project,
            Label::Folder,
            Label::File,
            Label::Function,
            Label::Class,
            Label::Enum,
            Label::Component,
            Label::Report,
        ]
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of relationship this edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    // ── Containment ─────────────────────────────────────────
    Contains,
    HasFolder,
    HasFile,

    // ── Ownership of extracted symbols ──────────────────────
    HasFunction,
    HasClass,
    HasEnum,

    // ── File to file ────────────────────────────────────────
    Imports,
    References,

    // ── Derived ─────────────────────────────────────────────
    ClassifiesAs,
    HasReport,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Contains => "CONTAINS",
            RelationshipType::HasFolder => "HAS_FOLDER",
            RelationshipType::HasFile => "HAS_FILE",
            RelationshipType::HasFunction => "HAS_FUNCTION",
            RelationshipType::HasClass => "HAS_CLASS",
            RelationshipType::HasEnum => "HAS_ENUM",
            RelationshipType::Imports => "IMPORTS",
            RelationshipType::References => "REFERENCES",
            RelationshipType::ClassifiesAs => "CLASSIFIES_AS",
            RelationshipType::HasReport => "HAS_REPORT",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses one endpoint of a relationship by `(label, key property, value)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: Label,
    pub value: String,
}

impl NodeRef {
    pub fn new(label: Label, value: impl Into<String>) -> Self {
        NodeRef {
            label,
            value: value.into(),
        }
    }

    pub fn key_property(&self) -> &'static str {
        self.label.key_property()
    }
}

/// Grouping key for relationship batches. The query engine cannot take a
/// relationship type or label as a parameter, so each shape gets its own
/// prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipShape {
    pub kind: RelationshipType,
    pub from: Label,
    pub to: Label,
}

impl fmt::Display for RelationshipShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}]->({})", self.from, self.kind, self.to)
    }
}

/// One relationship to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub kind: RelationshipType,
    pub from: NodeRef,
    pub to: NodeRef,
    pub properties: PropertyMap,
}

impl RelationshipRecord {
    pub fn new(kind: RelationshipType, from: NodeRef, to: NodeRef) -> Self {
        RelationshipRecord {
            kind,
            from,
            to,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Stamp the record with the current UTC time.
    pub fn stamped(self) -> Self {
        self.with_property("created_at", timestamp())
    }

    pub fn shape(&self) -> RelationshipShape {
        RelationshipShape {
            kind: self.kind,
            from: self.from.label,
            to: self.to.label,
        }
    }
}

/// A typed entity that can be written as a labeled node.
pub trait GraphEntity: Serialize {
    const LABEL: Label;

    /// Value of the label's key property.
    fn key(&self) -> &str;

    fn node_ref(&self) -> NodeRef {
        NodeRef::new(Self::LABEL, self.key())
    }

    fn properties(&self) -> PropertyMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => PropertyMap::new(),
        }
    }
}

// ── Structure ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub folder_id: String,
    pub project_id: String,
    /// Absolute path on disk.
    pub folder_path: String,
    /// Path relative to the project root; `"."` for the root.
    pub relative_path: String,
    pub name: String,
    pub is_root: bool,
    pub created_at: String,
}

impl GraphEntity for FolderNode {
    const LABEL: Label = Label::Folder;

    fn key(&self) -> &str {
        &self.folder_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub file_id: String,
    pub project_id: String,
    pub file_path: String,
    /// Unique within a project. The join key for import resolution.
    pub relative_path: String,
    pub name: String,
    pub file_type: String,
    pub size: u64,
    pub created_at: String,
}

impl GraphEntity for FileNode {
    const LABEL: Label = Label::File;

    fn key(&self) -> &str {
        &self.file_id
    }
}

// ── Extracted symbols ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNode {
    pub function_id: String,
    pub file_id: String,
    pub project_id: String,
    pub name: String,
    pub return_type: String,
    pub arguments: Vec<Argument>,
    pub decorators: Vec<String>,
    pub is_static: bool,
    pub is_async: bool,
    pub docstring: String,
    pub lineno: u32,
    pub end_lineno: u32,
    /// Position among same-named symbols of this kind in the file.
    pub ordinal: u32,
    pub created_at: String,
}

impl GraphEntity for FunctionNode {
    const LABEL: Label = Label::Function;

    fn key(&self) -> &str {
        &self.function_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Regular,
    Abstract,
    Singleton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Python naming convention: `__x` private, `_x` protected.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("__") && !name.ends_with("__") {
            Visibility::Private
        } else if name.starts_with('_') && !name.starts_with("__") {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
}

/// Method summary embedded in its class rather than stored as a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub return_type: String,
    pub arguments: Vec<Argument>,
    pub decorators: Vec<String>,
    pub is_static: bool,
    pub is_async: bool,
    pub docstring: String,
    pub lineno: u32,
    pub end_lineno: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub class_id: String,
    pub file_id: String,
    pub project_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClassKind,
    pub superclasses: Vec<String>,
    pub methods: Vec<MethodSummary>,
    pub attributes: Vec<Attribute>,
    pub docstring: String,
    pub lineno: u32,
    pub end_lineno: u32,
    /// Position among same-named symbols of this kind in the file.
    pub ordinal: u32,
    pub created_at: String,
}

impl GraphEntity for ClassNode {
    const LABEL: Label = Label::Class;

    fn key(&self) -> &str {
        &self.class_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumNode {
    pub enum_id: String,
    pub file_id: String,
    pub project_id: String,
    pub name: String,
    pub values: Vec<String>,
    pub docstring: String,
    pub lineno: u32,
    pub end_lineno: u32,
    /// Position among same-named symbols of this kind in the file.
    pub ordinal: u32,
    pub created_at: String,
}

impl GraphEntity for EnumNode {
    const LABEL: Label = Label::Enum;

    fn key(&self) -> &str {
        &self.enum_id
    }
}

// ── Classification ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Ui,
    Logic,
    Data,
    Config,
    Tests,
    Documentation,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Ui => "ui",
            ComponentKind::Logic => "logic",
            ComponentKind::Data => "data",
            ComponentKind::Config => "config",
            ComponentKind::Tests => "tests",
            ComponentKind::Documentation => "documentation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub component_id: String,
    pub project_id: String,
    pub file_id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub created_at: String,
}

impl ComponentNode {
    pub fn for_file(file: &FileNode, kind: ComponentKind) -> Self {
        ComponentNode {
            component_id: format!("component_{}", file.file_id),
            project_id: file.project_id.clone(),
            file_id: file.file_id.clone(),
            kind,
            created_at: timestamp(),
        }
    }
}

impl GraphEntity for ComponentNode {
    const LABEL: Label = Label::Component;

    fn key(&self) -> &str {
        &self.component_id
    }
}

// ── Project lifecycle ───────────────────────────────────────

/// Progress states recorded on the Project record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    AnalyzingStructure,
    StructureAnalyzed,
    AnalyzingContent,
    ContentAnalyzed,
    Analyzed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::AnalyzingStructure => "analyzing_structure",
            ProjectStatus::StructureAnalyzed => "structure_analyzed",
            ProjectStatus::AnalyzingContent => "analyzing_content",
            ProjectStatus::ContentAnalyzed => "content_analyzed",
            ProjectStatus::Analyzed => "analyzed",
        }
    }

    /// Overall progress percentage for this state.
    pub fn progress(&self) -> f64 {
        match self {
            ProjectStatus::AnalyzingStructure => 15.0,
            ProjectStatus::StructureAnalyzed => 20.0,
            ProjectStatus::AnalyzingContent => 20.0,
            ProjectStatus::ContentAnalyzed => 25.0,
            ProjectStatus::Analyzed => 30.0,
        }
    }

    pub fn next(&self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::AnalyzingStructure => Some(ProjectStatus::StructureAnalyzed),
            ProjectStatus::StructureAnalyzed => Some(ProjectStatus::AnalyzingContent),
            ProjectStatus::AnalyzingContent => Some(ProjectStatus::ContentAnalyzed),
            ProjectStatus::ContentAnalyzed => Some(ProjectStatus::Analyzed),
            ProjectStatus::Analyzed => None,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary attached to a project after a stage completes or fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNode {
    pub report_id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub report_type: String,
    pub message: String,
    pub details: PropertyMap,
    pub created_at: String,
}

impl ReportNode {
    pub fn new(project_id: &str, report_type: &str, message: impl Into<String>) -> Self {
        ReportNode {
            report_id: crate::ids::fresh_id(),
            project_id: project_id.to_string(),
            report_type: report_type.to_string(),
            message: message.into(),
            details: PropertyMap::new(),
            created_at: timestamp(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl GraphEntity for ReportNode {
    const LABEL: Label = Label::Report;

    fn key(&self) -> &str {
        &self.report_id
    }
}
