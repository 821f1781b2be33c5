//! In-memory property graph using petgraph::StableDiGraph
//!
//! Mirrors the upsert semantics of the persistent store: nodes are merged on
//! their label's merge keys and relationships on `(from, to, type)`.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde_json::Value;

use crate::model::{Label, PropertyMap, RelationshipType};

/// Handle to a stored node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u64);

/// Handle to a stored relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EdgeId(pub u64);

/// A labeled node with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub label: Label,
    pub properties: PropertyMap,
}

impl StoredNode {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// A typed relationship with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEdge {
    pub kind: RelationshipType,
    pub source: NodeId,
    pub target: NodeId,
    pub properties: PropertyMap,
}

/// Whether an upsert created something new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created(NodeId),
    Matched(NodeId),
}

impl Upsert {
    pub fn id(&self) -> NodeId {
        match self {
            Upsert::Created(id) | Upsert::Matched(id) => *id,
        }
    }
}

/// The property graph: a directed multigraph with stable node/edge indices.
pub struct PropertyGraph {
    inner: StableDiGraph<StoredNode, StoredEdge>,
    /// (label, merge key values) -> node
    merge_index: HashMap<(Label, Vec<String>), NodeId>,
    /// (label, key property value) -> node
    key_index: HashMap<(Label, String), NodeId>,
}

impl std::fmt::Debug for PropertyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PropertyGraph {
    pub fn new() -> Self {
        PropertyGraph {
            inner: StableDiGraph::new(),
            merge_index: HashMap::new(),
            key_index: HashMap::new(),
        }
    }

    fn merge_key(label: Label, properties: &PropertyMap) -> Option<Vec<String>> {
        label
            .merge_keys()
            .iter()
            .map(|k| properties.get(*k).map(key_text))
            .collect()
    }

    /// Insert a node, or match the existing node with the same merge key.
    /// Properties of a matched node are left untouched.
    pub fn upsert_node(&mut self, label: Label, properties: PropertyMap) -> Upsert {
        let merge_key = Self::merge_key(label, &properties);
        if let Some(key) = &merge_key {
            if let Some(existing) = self.merge_index.get(&(label, key.clone())) {
                return Upsert::Matched(*existing);
            }
        }

        let key_value = properties.get(label.key_property()).map(key_text);
        let idx = self.inner.add_node(StoredNode { label, properties });
        let id = NodeId(idx.index() as u64);

        if let Some(key) = merge_key {
            self.merge_index.insert((label, key), id);
        }
        if let Some(value) = key_value {
            self.key_index.entry((label, value)).or_insert(id);
        }
        Upsert::Created(id)
    }

    /// Add a relationship unless one of the same type already joins the pair.
    /// Returns `None` if it already existed.
    pub fn merge_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: RelationshipType,
        properties: PropertyMap,
    ) -> Option<EdgeId> {
        if self.has_edge_between(source, target, kind) {
            return None;
        }
        let idx = self.inner.add_edge(
            NodeIndex::new(source.0 as usize),
            NodeIndex::new(target.0 as usize),
            StoredEdge {
                kind,
                source,
                target,
                properties,
            },
        );
        Some(EdgeId(idx.index() as u64))
    }

    /// Find a node by its label's key property.
    pub fn find(&self, label: Label, key_value: &str) -> Option<NodeId> {
        self.key_index.get(&(label, key_value.to_string())).copied()
    }

    /// Find a node by an arbitrary property (linear scan).
    pub fn find_by_property(&self, label: Label, property: &str, value: &str) -> Option<NodeId> {
        self.inner
            .node_indices()
            .find(|&idx| {
                self.inner.node_weight(idx).is_some_and(|n| {
                    n.label == label && n.properties.get(property).map(key_text).as_deref() == Some(value)
                })
            })
            .map(|idx| NodeId(idx.index() as u64))
    }

    pub fn node(&self, id: NodeId) -> Option<&StoredNode> {
        self.inner.node_weight(NodeIndex::new(id.0 as usize))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut StoredNode> {
        self.inner.node_weight_mut(NodeIndex::new(id.0 as usize))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// All nodes carrying `label`.
    pub fn nodes_with_label(&self, label: Label) -> impl Iterator<Item = (NodeId, &StoredNode)> + '_ {
        self.inner.node_indices().filter_map(move |idx| {
            self.inner
                .node_weight(idx)
                .filter(|n| n.label == label)
                .map(|n| (NodeId(idx.index() as u64), n))
        })
    }

    /// All relationships of `kind`.
    pub fn edges_of_kind(&self, kind: RelationshipType) -> impl Iterator<Item = &StoredEdge> + '_ {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
            .filter(move |e| e.kind == kind)
    }

    pub fn edges_from(&self, source: NodeId) -> impl Iterator<Item = &StoredEdge> {
        let idx = NodeIndex::new(source.0 as usize);
        self.inner
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
    }

    pub fn edges_to(&self, target: NodeId) -> impl Iterator<Item = &StoredEdge> {
        let idx = NodeIndex::new(target.0 as usize);
        self.inner
            .edges_directed(idx, Direction::Incoming)
            .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
    }

    pub fn has_edge_between(&self, source: NodeId, target: NodeId, kind: RelationshipType) -> bool {
        self.edges_from(source)
            .any(|e| e.target == target && e.kind == kind)
    }
}

impl Default for PropertyGraph {
    fn default() -> Self {
        Self::new()
    }
}
