//! Relationship operations: creation with direction-agnostic dedup, retyping,
//! deletion and the table-delete cascade.
//!
//! The foreign-key flag on a destination column is owned by this module. It is
//! set when a relationship is created and re-derived from the surviving edge
//! set after every removal, so a column targeted by several relationships
//! keeps its flag until the last one goes.

use super::schema::{
    ColumnId, Relationship, RelationshipId, RelationshipType, SchemaError, SchemaModel, Table,
    TableId,
};

/// Result of a create request. Duplicate requests succeed idempotently and
/// hand back the edge that already connects the endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipOutcome {
    Created(RelationshipId),
    Existing(RelationshipId),
}

impl RelationshipOutcome {
    pub fn id(&self) -> RelationshipId {
        match *self {
            RelationshipOutcome::Created(id) | RelationshipOutcome::Existing(id) => id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RelationshipOutcome::Created(_))
    }
}

/// Mutating relationship operations on the schema state.
pub trait RelationshipOps {
    /// Connect two (table, column) endpoints. Both endpoints must be live;
    /// a relationship already connecting the same unordered endpoint pair in
    /// either direction is returned instead of duplicated.
    fn create_relationship(
        &mut self,
        from: (TableId, ColumnId),
        to: (TableId, ColumnId),
        relationship_type: RelationshipType,
    ) -> Result<RelationshipOutcome, SchemaError>;

    /// Replace the cardinality of an existing relationship. No column flag is
    /// touched.
    fn set_relationship_type(
        &mut self,
        relationship: RelationshipId,
        relationship_type: RelationshipType,
    ) -> Result<(), SchemaError>;

    /// Remove a relationship and re-derive the destination column's
    /// foreign-key flag.
    fn delete_relationship(
        &mut self,
        relationship: RelationshipId,
    ) -> Result<Relationship, SchemaError>;
}

impl RelationshipOps for SchemaModel {
    fn create_relationship(
        &mut self,
        from: (TableId, ColumnId),
        to: (TableId, ColumnId),
        relationship_type: RelationshipType,
    ) -> Result<RelationshipOutcome, SchemaError> {
        let (from_table, from_column) = from;
        let (to_table, to_column) = to;
        let from_node = self.node_of(from_table).ok_or(SchemaError::NotFound)?;
        let to_node = self.node_of(to_table).ok_or(SchemaError::NotFound)?;
        if self.table_of_column(from_column) != Some(from_table)
            || self.table_of_column(to_column) != Some(to_table)
        {
            return Err(SchemaError::NotFound);
        }

        if let Some(existing) = self.find_relationship_between(from, to) {
            tracing::debug!(
                "relationship between {} and {} already exists ({})",
                from_column,
                to_column,
                existing
            );
            return Ok(RelationshipOutcome::Existing(existing));
        }

        let rel = Relationship {
            id: RelationshipId::new(),
            from_table,
            from_column,
            to_table,
            to_column,
            relationship_type,
        };
        let id = rel.id;
        let edge = self.graph_mut().add_edge(from_node, to_node, rel);
        self.relationship_index_mut().insert(id, edge);
        self.set_foreign_key(to_table, to_column, true);
        tracing::info!("created relationship {} ({} -> {})", id, from_column, to_column);
        Ok(RelationshipOutcome::Created(id))
    }

    fn set_relationship_type(
        &mut self,
        relationship: RelationshipId,
        relationship_type: RelationshipType,
    ) -> Result<(), SchemaError> {
        let Some(&edge) = self.relationship_index().get(&relationship) else {
            return Err(SchemaError::NotFound);
        };
        let rel = self
            .graph_mut()
            .edge_weight_mut(edge)
            .ok_or(SchemaError::NotFound)?;
        rel.relationship_type = relationship_type;
        Ok(())
    }

    fn delete_relationship(
        &mut self,
        relationship: RelationshipId,
    ) -> Result<Relationship, SchemaError> {
        let Some(edge) = self.relationship_index_mut().remove(&relationship) else {
            return Err(SchemaError::NotFound);
        };
        let rel = self
            .graph_mut()
            .remove_edge(edge)
            .ok_or(SchemaError::NotFound)?;
        self.rederive_foreign_key(rel.to_table, rel.to_column);
        tracing::info!("deleted relationship {}", relationship);
        Ok(rel)
    }
}

impl SchemaModel {
    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        let &edge = self.relationship_index().get(&id)?;
        self.graph().edge_weight(edge)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.graph().edge_weights()
    }

    /// Find a relationship connecting the given unordered endpoint pair, in
    /// either direction.
    pub fn find_relationship_between(
        &self,
        a: (TableId, ColumnId),
        b: (TableId, ColumnId),
    ) -> Option<RelationshipId> {
        self.graph()
            .edge_weights()
            .find(|r| {
                let forward =
                    (r.from_table, r.from_column) == a && (r.to_table, r.to_column) == b;
                let reverse =
                    (r.from_table, r.from_column) == b && (r.to_table, r.to_column) == a;
                forward || reverse
            })
            .map(|r| r.id)
    }

    /// Delete a table, cascading every relationship that touches it and
    /// re-deriving the foreign-key flag on surviving destination columns.
    pub fn delete_table(&mut self, table: TableId) -> Result<Table, SchemaError> {
        let Some(node) = self.node_of(table) else {
            return Err(SchemaError::NotFound);
        };

        let touching: Vec<Relationship> = self
            .graph()
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph().edge_endpoints(e)?;
                if a == node || b == node {
                    self.graph().edge_weight(e).cloned()
                } else {
                    None
                }
            })
            .collect();
        for rel in &touching {
            self.relationship_index_mut().remove(&rel.id);
        }

        // Removing the node drops its incident edges with it.
        let removed = self
            .graph_mut()
            .remove_node(node)
            .ok_or(SchemaError::NotFound)?;
        self.table_index_mut().remove(&table);
        for col in &removed.columns {
            let id = col.id;
            self.column_index_mut().remove(&id);
        }

        for rel in &touching {
            if rel.to_table != table {
                self.rederive_foreign_key(rel.to_table, rel.to_column);
            }
        }

        tracing::info!(
            "deleted table '{}' ({}) cascading {} relationship(s)",
            removed.name,
            table,
            touching.len()
        );
        Ok(removed)
    }

    /// Remove every relationship with the column as either endpoint.
    /// Returns the removed edges so the caller can re-derive flags on the
    /// endpoints that survive.
    pub(crate) fn remove_relationships_touching_column(
        &mut self,
        column: ColumnId,
    ) -> Vec<Relationship> {
        let doomed: Vec<RelationshipId> = self
            .graph()
            .edge_weights()
            .filter(|r| r.from_column == column || r.to_column == column)
            .map(|r| r.id)
            .collect();
        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(edge) = self.relationship_index_mut().remove(&id) {
                if let Some(rel) = self.graph_mut().remove_edge(edge) {
                    removed.push(rel);
                }
            }
        }
        removed
    }

    /// Recompute a column's foreign-key flag from the surviving edge set.
    pub(crate) fn rederive_foreign_key(&mut self, table: TableId, column: ColumnId) {
        let targeted = self.graph().edge_weights().any(|r| r.to_column == column);
        self.set_foreign_key(table, column, targeted);
    }

    pub(crate) fn set_foreign_key(&mut self, table: TableId, column: ColumnId, value: bool) {
        let Some(node) = self.node_of(table) else {
            return;
        };
        let Some(row) = self.column_row(column) else {
            return;
        };
        if let Some(col) = self
            .graph_mut()
            .node_weight_mut(node)
            .and_then(|t| t.columns.get_mut(row))
        {
            col.is_fk = value;
        }
    }
}
