//! File type and component classification
//!
//! Both classifiers are pure: the same input always yields the same answer,
//! which keeps re-analysis of an unchanged tree idempotent.

use std::path::Path;

use atlas_core::ComponentKind;

/// Extension (lowercase, with dot) to semantic file type.
pub const EXTENSION_TYPES: &[(&str, &str)] = &[
    // ── Languages ───────────────────────────────────────────
    (".py", "python"),
    (".js", "javascript"),
    (".ts", "typescript"),
    (".jsx", "react"),
    (".tsx", "react"),
    (".java", "java"),
    (".kt", "kotlin"),
    (".kts", "kotlin"),
    (".c", "c"),
    (".cpp", "cpp"),
    (".h", "c_header"),
    (".hpp", "cpp_header"),
    (".cs", "csharp"),
    (".go", "go"),
    (".rs", "rust"),
    (".rb", "ruby"),
    (".php", "php"),
    (".swift", "swift"),
    (".m", "objective_c"),
    (".mm", "objective_cpp"),
    (".sql", "sql"),
    (".cob", "cobol"),
    (".cbl", "cobol"),
    (".dpr", "delphi"),
    (".pas", "pascal"),
    (".f", "fortran"),
    (".f90", "fortran"),
    (".sh", "shell"),
    (".bat", "batch"),
    (".ps1", "powershell"),
    // ── Markup and styles ───────────────────────────────────
    (".html", "html"),
    (".css", "css"),
    (".scss", "scss"),
    (".sass", "sass"),
    // ── Data and config ─────────────────────────────────────
    (".json", "json"),
    (".xml", "xml"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".config", "config"),
    (".toml", "toml"),
    (".ini", "ini"),
    (".csv", "csv"),
    // ── Docs ────────────────────────────────────────────────
    (".md", "markdown"),
    (".txt", "text"),
];

/// Semantic type for a file name and its extension (with or without the dot).
pub fn classify(file_name: &str, extension: &str) -> String {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if !ext.is_empty() {
        let dotted = format!(".{ext}");
        if let Some((_, file_type)) = EXTENSION_TYPES.iter().find(|(e, _)| *e == dotted) {
            return (*file_type).to_string();
        }
    }

    match mime_guess::from_path(file_name).first() {
        Some(mime) => mime.type_().as_str().to_string(),
        None => "unknown".to_string(),
    }
}

/// Semantic type for a path on disk.
pub fn classify_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    classify(&file_name, &extension)
}

const UI_TYPES: &[&str] = &["html", "css", "scss", "sass", "react", "tsx", "jsx"];
const CONFIG_TYPES: &[&str] = &["json", "yaml", "yml", "xml", "toml", "ini", "config"];
const DATA_TYPES: &[&str] = &["sql", "csv", "db", "sqlite"];
const DOC_TYPES: &[&str] = &["md", "markdown", "txt", "text", "rst", "adoc"];

/// Path markers in override priority order.
const PATH_MARKERS: &[(ComponentKind, &[&str])] = &[
    (ComponentKind::Ui, &["/ui/", "/view", "/template"]),
    (ComponentKind::Data, &["/data/", "/model", "/entity"]),
    (ComponentKind::Config, &["/config/", "/setting"]),
    (ComponentKind::Tests, &["/test", "/spec/", "/__tests__/"]),
    (ComponentKind::Documentation, &["/doc/", "/docs/", "/documentation/"]),
];

/// Component bucket for a file: by type first, then overridden by the
/// first matching directory marker.
pub fn classify_component(relative_path: &str, file_type: &str) -> ComponentKind {
    let path = format!("/{}", relative_path.replace('\\', "/").to_ascii_lowercase());

    if let Some((kind, _)) = PATH_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| path.contains(m)))
    {
        return *kind;
    }

    if UI_TYPES.contains(&file_type) {
        ComponentKind::Ui
    } else if CONFIG_TYPES.contains(&file_type) {
        ComponentKind::Config
    } else if DATA_TYPES.contains(&file_type) {
        ComponentKind::Data
    } else if DOC_TYPES.contains(&file_type) {
        ComponentKind::Documentation
    } else {
        ComponentKind::Logic
    }
}
