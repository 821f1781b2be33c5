//! Cypher-over-HTTP store
//!
//! Talks to the transactional endpoint `POST {uri}/db/{database}/tx/commit`.
//! Each call commits one statement in its own transaction.

use std::time::Duration;

use atlas_core::config::GraphSettings;
use atlas_core::{GraphEntity, Label, ProjectStatus, PropertyMap, RelationshipRecord, RelationshipShape, ReportNode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::statements::{
    PROJECT_REPORT, PROJECT_STATUS, flatten_properties, node_rows, node_upsert, relationship_merge,
    relationship_rows,
};
use crate::store::{GraphStore, StatusSink, StoreError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<QueryFailure>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryFailure {
    code: String,
    message: String,
}

pub struct CypherHttpStore {
    client: reqwest::Client,
    endpoint: String,
    user: String,
    password: String,
}

impl CypherHttpStore {
    pub fn new(settings: &GraphSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                settings.uri.trim_end_matches('/'),
                settings.database
            ),
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Commit one statement. Returns the first column of the first row as a
    /// count, or 0 if the statement returns nothing.
    pub async fn run(&self, statement: &str, parameters: Value) -> Result<usize, StoreError> {
        let body = CommitRequest {
            statements: [Statement { statement, parameters }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CommitResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        if let Some(failure) = parsed.errors.into_iter().next() {
            return Err(StoreError::Query {
                code: failure.code,
                message: failure.message,
            });
        }

        let count = parsed
            .results
            .first()
            .and_then(|r| r.data.first())
            .and_then(|d| d.row.first())
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(count as usize)
    }

    /// Round-trip a trivial statement to check credentials and reachability.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.run("RETURN 1", json!({}))
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl GraphStore for CypherHttpStore {
    async fn create_nodes(&self, label: Label, rows: &[PropertyMap]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.run(&node_upsert(label), json!({ "rows": node_rows(rows) }))
            .await
    }

    async fn create_relationships(
        &self,
        shape: RelationshipShape,
        rows: &[RelationshipRecord],
    ) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.run(
            &relationship_merge(shape),
            json!({ "rows": relationship_rows(rows) }),
        )
        .await
    }
}

#[async_trait::async_trait]
impl StatusSink for CypherHttpStore {
    async fn set_status(
        &self,
        project_id: &str,
        status: ProjectStatus,
        progress: f64,
        step: &str,
    ) -> Result<(), StoreError> {
        let parameters = json!({
            "project_id": project_id,
            "status": status.as_str(),
            "progress": progress,
            "step": step,
            "updated_at": Utc::now().to_rfc3339(),
        });
        self.run(PROJECT_STATUS, parameters).await.map(|_| ())
    }

    async fn add_report(&self, report: &ReportNode) -> Result<(), StoreError> {
        let parameters = json!({
            "project_id": report.project_id,
            "report": Value::Object(flatten_properties(&report.properties())),
        });
        self.run(PROJECT_REPORT, parameters).await.map(|_| ())
    }
}
