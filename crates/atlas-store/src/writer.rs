//! Batched graph writer
//!
//! Splits writes into batches of at most `batch_size` records and sends
//! them one after another. A failed batch is logged with its label or shape
//! and index; the remaining batches are still attempted.

use std::collections::BTreeMap;
use std::sync::Arc;

use atlas_core::{GraphEntity, Label, PropertyMap, RelationshipRecord, RelationshipShape};

use crate::store::GraphStore;

/// Outcome of a batched write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Records submitted.
    pub attempted: usize,
    /// Records the store reported as written.
    pub written: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

impl WriteReport {
    pub fn absorb(&mut self, other: WriteReport) {
        self.attempted += other.attempted;
        self.written += other.written;
        self.batches += other.batches;
        self.failed_batches += other.failed_batches;
    }

    pub fn is_clean(&self) -> bool {
        self.failed_batches == 0
    }
}

#[derive(Clone)]
pub struct GraphWriter {
    store: Arc<dyn GraphStore>,
    batch_size: usize,
}

impl GraphWriter {
    pub fn new(store: Arc<dyn GraphStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Write typed entities under their label.
    pub async fn write_entities<E: GraphEntity>(&self, entities: &[E]) -> WriteReport {
        let rows: Vec<PropertyMap> = entities.iter().map(GraphEntity::properties).collect();
        self.write_nodes(E::LABEL, &rows).await
    }

    pub async fn write_nodes(&self, label: Label, rows: &[PropertyMap]) -> WriteReport {
        let mut report = WriteReport::default();
        let total = rows.len().div_ceil(self.batch_size);

        for (i, batch) in rows.chunks(self.batch_size).enumerate() {
            report.attempted += batch.len();
            report.batches += 1;
            match self.store.create_nodes(label, batch).await {
                Ok(written) => report.written += written,
                Err(e) => {
                    report.failed_batches += 1;
                    tracing::error!(
                        "Failed to write {} batch {}/{} ({} rows): {}",
                        label,
                        i + 1,
                        total,
                        batch.len(),
                        e
                    );
                }
            }
        }

        tracing::debug!("Wrote {}/{} {} nodes", report.written, report.attempted, label);
        report
    }

    async fn write_shape(&self, shape: RelationshipShape, rows: &[RelationshipRecord]) -> WriteReport {
        let mut report = WriteReport::default();
        let total = rows.len().div_ceil(self.batch_size);

        for (i, batch) in rows.chunks(self.batch_size).enumerate() {
            report.attempted += batch.len();
            report.batches += 1;
            match self.store.create_relationships(shape, batch).await {
                Ok(written) => report.written += written,
                Err(e) => {
                    report.failed_batches += 1;
                    tracing::error!(
                        "Failed to write {} batch {}/{} ({} rows): {}",
                        shape,
                        i + 1,
                        total,
                        batch.len(),
                        e
                    );
                }
            }
        }
        report
    }

    /// Write relationships of any mix of shapes, one statement per shape.
    pub async fn write_relationships(&self, records: &[RelationshipRecord]) -> WriteReport {
        let mut by_shape: BTreeMap<RelationshipShape, Vec<RelationshipRecord>> = BTreeMap::new();
        for record in records {
            by_shape.entry(record.shape()).or_default().push(record.clone());
        }

        let mut report = WriteReport::default();
        for (shape, rows) in by_shape {
            let shape_report = self.write_shape(shape, &rows).await;
            tracing::debug!(
                "Wrote {}/{} {} relationships",
                shape_report.written,
                shape_report.attempted,
                shape
            );
            report.absorb(shape_report);
        }
        report
    }
}
