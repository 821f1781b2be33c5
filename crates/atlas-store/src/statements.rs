//! Cypher statements
//!
//! Labels and relationship types cannot be query parameters, so they are
//! spliced in from the closed `Label` and `RelationshipType` enums only.
//! Every value travels as a parameter.

use atlas_core::{Label, PropertyMap, RelationshipRecord, RelationshipShape};
use serde_json::{Value, json};

/// Upsert `$rows` as `label` nodes; properties are only set on create.
pub fn node_upsert(label: Label) -> String {
    let keys = label
        .merge_keys()
        .iter()
        .map(|k| format!("{k}: row.{k}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UNWIND $rows AS row \
         MERGE (n:{label} {{{keys}}}) \
         ON CREATE SET n += row \
         RETURN count(n) AS written"
    )
}

/// Merge `$rows` as relationships of one shape between existing nodes.
pub fn relationship_merge(shape: RelationshipShape) -> String {
    format!(
        "UNWIND $rows AS row \
         MATCH (a:{from} {{{from_key}: row.from}}) \
         MATCH (b:{to} {{{to_key}: row.to}}) \
         MERGE (a)-[r:{kind}]->(b) \
         ON CREATE SET r += row.properties \
         RETURN count(r) AS written",
        from = shape.from,
        from_key = shape.from.key_property(),
        to = shape.to,
        to_key = shape.to.key_property(),
        kind = shape.kind,
    )
}

/// Create or update the project record.
pub const PROJECT_STATUS: &str = "MERGE (p:Project {project_id: $project_id}) \
     ON CREATE SET p.created_at = $updated_at \
     SET p.status = $status, p.progress = $progress, p.step = $step, p.updated_at = $updated_at";

/// Create a report and hang it off its project.
pub const PROJECT_REPORT: &str = "MERGE (p:Project {project_id: $project_id}) \
     CREATE (r:Report) SET r = $report \
     MERGE (p)-[h:HAS_REPORT]->(r) \
     ON CREATE SET h.created_at = $report.created_at";

/// The graph engine only stores primitives and homogeneous lists of them.
/// Nested maps and lists of maps are carried as JSON text; nulls are dropped.
pub fn flatten_properties(properties: &PropertyMap) -> PropertyMap {
    properties
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let flat = match v {
                Value::Object(_) => Value::String(v.to_string()),
                Value::Array(items) if items.iter().any(|i| i.is_object() || i.is_array()) => {
                    Value::String(v.to_string())
                }
                other => other.clone(),
            };
            (k.clone(), flat)
        })
        .collect()
}

pub fn node_rows(rows: &[PropertyMap]) -> Value {
    Value::Array(rows.iter().map(|r| Value::Object(flatten_properties(r))).collect())
}

pub fn relationship_rows(rows: &[RelationshipRecord]) -> Value {
    Value::Array(
        rows.iter()
            .map(|r| {
                json!({
                    "from": r.from.value,
                    "to": r.to.value,
                    "properties": Value::Object(flatten_properties(&r.properties)),
                })
            })
            .collect(),
    )
}
