//! Serializable document form of the schema state.
//!
//! A [`SchemaDocument`] carries exactly the model entities with their ids
//! verbatim, so loading a document and saving it again reproduces an identical
//! document. This is the only persistence surface; exporters (DDL generators
//! and the like) consume the same structure and live outside this crate.

use serde::{Deserialize, Serialize};

use super::schema::{ColumnId, Relationship, RelationshipId, SchemaModel, Table, TableId};

/// Flat, order-preserving snapshot of the whole model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

/// Errors rejecting a malformed document at load time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("duplicate table id {0}")]
    DuplicateTable(TableId),

    #[error("duplicate column id {0}")]
    DuplicateColumn(ColumnId),

    #[error("duplicate relationship id {0}")]
    DuplicateRelationship(RelationshipId),

    #[error("relationship {0} references a missing table or column")]
    DanglingEndpoint(RelationshipId),
}

impl From<&SchemaModel> for SchemaDocument {
    fn from(model: &SchemaModel) -> Self {
        Self {
            tables: model.tables().cloned().collect(),
            relationships: model.relationships().cloned().collect(),
        }
    }
}

impl TryFrom<SchemaDocument> for SchemaModel {
    type Error = DocumentError;

    fn try_from(document: SchemaDocument) -> Result<Self, Self::Error> {
        let mut model = SchemaModel::new();

        let mut seen_columns = std::collections::HashSet::new();
        for table in document.tables {
            if model.table(table.id).is_some() {
                return Err(DocumentError::DuplicateTable(table.id));
            }
            for col in &table.columns {
                if !seen_columns.insert(col.id) {
                    return Err(DocumentError::DuplicateColumn(col.id));
                }
            }
            model.insert_table(table);
        }

        for rel in document.relationships {
            if model.relationship(rel.id).is_some() {
                return Err(DocumentError::DuplicateRelationship(rel.id));
            }
            let from_node = model
                .node_of(rel.from_table)
                .ok_or(DocumentError::DanglingEndpoint(rel.id))?;
            let to_node = model
                .node_of(rel.to_table)
                .ok_or(DocumentError::DanglingEndpoint(rel.id))?;
            if model.table_of_column(rel.from_column) != Some(rel.from_table)
                || model.table_of_column(rel.to_column) != Some(rel.to_table)
            {
                return Err(DocumentError::DanglingEndpoint(rel.id));
            }
            let id = rel.id;
            let edge = model.graph_mut().add_edge(from_node, to_node, rel);
            model.relationship_index_mut().insert(id, edge);
        }

        tracing::debug!(
            "loaded document with {} table(s), {} relationship(s)",
            model.table_count(),
            model.relationship_count()
        );
        Ok(model)
    }
}

impl SchemaModel {
    /// Snapshot the model into its document form.
    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{RelationshipType, sample_schema};

    #[test]
    fn test_round_trip_is_identical() {
        let model = sample_schema();
        let saved = model.to_document();

        let json = serde_json::to_string(&saved).unwrap();
        let reloaded: SchemaDocument = serde_json::from_str(&json).unwrap();
        let model2 = SchemaModel::try_from(reloaded).unwrap();

        assert_eq!(model2.to_document(), saved);
    }

    #[test]
    fn test_ids_survive_reload() {
        let model = sample_schema();
        let users = model.find_table_by_name("users").unwrap();

        let model2 = SchemaModel::try_from(model.to_document()).unwrap();
        assert_eq!(model2.find_table_by_name("users"), Some(users));
    }

    #[test]
    fn test_foreign_key_flags_preserved_verbatim() {
        let model = sample_schema();
        let model2 = SchemaModel::try_from(model.to_document()).unwrap();

        let posts = model2.table(model2.find_table_by_name("posts").unwrap()).unwrap();
        let (_, user_id) = posts.find_column("user_id").unwrap();
        assert!(user_id.is_fk);
    }

    #[test]
    fn test_dangling_relationship_is_rejected() {
        let model = sample_schema();
        let mut doc = model.to_document();

        let rel = doc.relationships[0].clone();
        doc.tables.retain(|t| t.id != rel.to_table);

        let err = SchemaModel::try_from(doc).unwrap_err();
        assert_eq!(err, DocumentError::DanglingEndpoint(rel.id));
    }

    #[test]
    fn test_duplicate_column_id_is_rejected() {
        let model = sample_schema();
        let mut doc = model.to_document();

        let col = doc.tables[0].columns[0].clone();
        doc.tables[1].columns.push(col.clone());

        let err = SchemaModel::try_from(doc).unwrap_err();
        assert_eq!(err, DocumentError::DuplicateColumn(col.id));
    }

    #[test]
    fn test_relationship_type_serializes_with_labels_intact() {
        let model = sample_schema();
        let doc = model.to_document();

        assert_eq!(
            doc.relationships[0].relationship_type,
            RelationshipType::OneToMany
        );
        assert_eq!(doc.relationships[0].relationship_type.to_string(), "1:N");
    }
}
