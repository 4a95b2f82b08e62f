//! Per-file snapshot records: one JSON file per catalog entity, carrying the
//! vertex fields plus a nested list of outgoing relations.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::statement::{build_edge_statement, build_vertex_statement, ScalarValue};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entity snapshot. `id`, `name`, and `type` are required; everything
/// else defaults when absent.
#[derive(Debug, Deserialize)]
pub struct EntityRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<TagEntry>,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
}

#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct RelationDescriptor {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl EntityRecord {
    fn from_file(path: &Path) -> Result<Self, RecordError> {
        let body = fs::read(path)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Tag names joined by `|`; empty string when the record has no tags.
    fn labels(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Parse one snapshot file into its vertex insert statement.
pub fn read_vertex(path: &Path) -> Result<String, RecordError> {
    let record = EntityRecord::from_file(path)?;
    let properties = [
        ("name", ScalarValue::Text(record.name.clone())),
        ("labels", ScalarValue::Text(record.labels())),
        ("type", ScalarValue::Int(record.kind)),
        ("rating_score", ScalarValue::Float(record.rating.score)),
    ];
    Ok(build_vertex_statement(record.id, &properties))
}

/// Parse one snapshot file into its edge insert statements, one per relation
/// entry. The file is re-read on every call, so the returned iterator is
/// restartable by calling again; an absent or empty relations list yields an
/// empty iterator.
pub fn read_edges(path: &Path) -> Result<impl Iterator<Item = String>, RecordError> {
    let record = EntityRecord::from_file(path)?;
    let from_id = record.id;
    Ok(record.relations.into_iter().map(move |relation| {
        build_edge_statement(
            from_id,
            relation.id,
            &[("type", ScalarValue::Text(relation.kind))],
        )
    }))
}
