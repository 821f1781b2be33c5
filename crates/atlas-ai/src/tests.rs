//! Unit tests for atlas-ai module

use atlas_core::config::LlmSettings;
use atlas_core::{ClassKind, Visibility};

use crate::bridge::{AnalysisProvider, FileAnalysis, extract_json_object};
use crate::prompt::{TRUNCATION_MARKER, file_analysis_prompt, truncate_content};
use crate::providers::create_provider;
use crate::providers::local::LocalProvider;

#[test]
fn test_provider_creation() {
    let mut settings = LlmSettings::default();
    assert_eq!(create_provider(&settings).unwrap().name(), "OpenAI");

    settings.provider = "local".to_string();
    assert_eq!(create_provider(&settings).unwrap().name(), "Local");

    settings.provider = "unknown".to_string();
    assert!(create_provider(&settings).is_err());
}

#[test]
fn test_extract_json_object_from_prose() {
    let reply = "Sure! Here it is:\n```json\n{\"functions\": []}\n```";
    assert_eq!(extract_json_object(reply), Some("{\"functions\": []}"));
    assert_eq!(extract_json_object("no json here"), None);
    assert_eq!(extract_json_object("} backwards {"), None);
}

#[test]
fn test_parse_lenient_full_reply() {
    let reply = r#"```json
{
  "description": "User service",
  "functions": [
    {"name": "load", "arguments": ["id", {"name": "cache", "type": "bool"}],
     "return_type": "User", "is_async": true, "lineno": 12}
  ],
  "classes": [
    {"name": "Service", "type": "Singleton", "superclasses": ["Base"],
     "methods": ["start", {"name": "stop", "is_static": true}],
     "attributes": ["_pool", {"name": "name", "type": "str", "visibility": "private"}]}
  ],
  "enums": [{"name": "Mode", "values": ["A", {"name": "B"}]}],
  "imports": [{"module": "./db"}, "lodash", {"path": "../util.js"}, 42]
}
```"#;
    let analysis = FileAnalysis::parse_lenient(reply);

    assert_eq!(analysis.description, "User service");

    let load = &analysis.functions[0];
    assert_eq!(load.name, "load");
    assert!(load.is_async);
    assert_eq!(load.lineno, Some(12));
    assert_eq!(load.arguments[0].type_name, "Any");
    assert_eq!(load.arguments[1].type_name, "bool");

    let service = &analysis.classes[0];
    assert_eq!(service.kind, ClassKind::Singleton);
    assert_eq!(service.methods.len(), 2);
    assert!(service.methods[1].is_static);
    assert_eq!(service.attributes[0].visibility, Visibility::Protected);
    assert_eq!(service.attributes[1].visibility, Visibility::Private);

    assert_eq!(analysis.enums[0].values, vec!["A", "B"]);
    assert_eq!(analysis.imports, vec!["./db", "lodash", "../util.js"]);
}

#[test]
fn test_parse_lenient_degrades_to_empty() {
    assert!(FileAnalysis::parse_lenient("I cannot help with that.").is_empty());
    assert!(FileAnalysis::parse_lenient("{\"functions\": [oops]}").is_empty());
    assert!(FileAnalysis::parse_lenient("[1, 2, 3]").is_empty());

    // Wrong shapes are dropped item by item.
    let partial = FileAnalysis::parse_lenient(
        r#"{"functions": "none", "classes": [{"type": "abstract"}], "enums": [{"name": "E"}]}"#,
    );
    assert!(partial.functions.is_empty());
    assert!(partial.classes.is_empty());
    assert_eq!(partial.enums.len(), 1);
}

#[test]
fn test_truncate_content() {
    assert_eq!(truncate_content("short", 10), "short");

    let cut = truncate_content("héllo world", 5);
    assert_eq!(cut, format!("héllo{TRUNCATION_MARKER}"));
}

#[test]
fn test_prompt_mentions_file_type_and_content() {
    let prompt = file_analysis_prompt("fn main() {}", "rust");
    assert!(prompt.contains("Analyze this rust code"));
    assert!(prompt.ends_with("fn main() {}"));
}

#[tokio::test]
async fn test_local_provider_reads_import_lines() {
    let provider = LocalProvider::new();
    let source = r#"
import React from 'react';
import { api } from "./api";
const util = require('../util');
#include "board.h"
export { x } from './x';
import React from 'react';
"#;
    let analysis = provider.analyze_file(source, "javascript").await.unwrap();
    assert_eq!(analysis.imports, vec!["react", "./api", "../util", "board.h", "./x"]);
    assert!(analysis.functions.is_empty());
}
