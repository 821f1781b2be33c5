//! Resolve raw imports and references to file-to-file edges

use std::collections::HashSet;

use atlas_core::{Label, NodeRef, PathIndex, RelationshipRecord, RelationshipType};

use crate::extractor::{LinkKind, RawLink};

/// A link that landed on a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub kind: LinkKind,
    pub from_file_id: String,
    pub to_file_id: String,
    pub target_path: String,
    pub name: String,
    pub reference_type: Option<String>,
}

impl ResolvedLink {
    pub fn to_record(&self) -> RelationshipRecord {
        let kind = match self.kind {
            LinkKind::Import => RelationshipType::Imports,
            LinkKind::Reference => RelationshipType::References,
        };
        let mut record = RelationshipRecord::new(
            kind,
            NodeRef::new(Label::File, self.from_file_id.clone()),
            NodeRef::new(Label::File, self.to_file_id.clone()),
        );
        if let Some(reference_type) = &self.reference_type {
            record = record
                .with_property("reference_type", reference_type.as_str())
                .with_property("name", self.name.as_str());
        }
        record.stamped()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub resolved: usize,
    pub unresolved: usize,
    pub self_links: usize,
    pub duplicates: usize,
}

/// Joins raw links against the path index. Unresolved links are dropped
/// silently; self-links and repeats are dropped and counted.
pub struct ReferenceResolver<'a> {
    index: &'a PathIndex,
    seen: HashSet<(LinkKind, String, String, Option<String>)>,
    stats: ResolutionStats,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(index: &'a PathIndex) -> Self {
        Self {
            index,
            seen: HashSet::new(),
            stats: ResolutionStats::default(),
        }
    }

    /// Resolve one link from `from_file_id`.
    pub fn resolve(&mut self, from_file_id: &str, link: &RawLink) -> Option<ResolvedLink> {
        let Some((target_path, to_file_id)) = self.index.lookup_first(&link.candidates) else {
            self.stats.unresolved += 1;
            return None;
        };
        if to_file_id == from_file_id {
            self.stats.self_links += 1;
            return None;
        }
        let key = (
            link.kind,
            from_file_id.to_string(),
            to_file_id.clone(),
            link.reference_type.clone(),
        );
        if !self.seen.insert(key) {
            self.stats.duplicates += 1;
            return None;
        }
        self.stats.resolved += 1;
        Some(ResolvedLink {
            kind: link.kind,
            from_file_id: from_file_id.to_string(),
            to_file_id,
            target_path,
            name: link.name.clone(),
            reference_type: link.reference_type.clone(),
        })
    }

    /// Resolve every link of one file, in order.
    pub fn resolve_all<'l>(
        &mut self,
        from_file_id: &str,
        links: impl IntoIterator<Item = &'l RawLink>,
    ) -> Vec<ResolvedLink> {
        links
            .into_iter()
            .filter_map(|link| self.resolve(from_file_id, link))
            .collect()
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }
}
