//! Schema data model: tables, columns, relationships and the owning state.
//!
//! The model is a petgraph [`StableGraph`] (tables as nodes, relationships as
//! edges) wrapped in [`SchemaModel`], which adds uuid-keyed index maps so that
//! every id lookup on the interactive path is O(1). Entities are plain
//! serializable values; hosts hold ids, never references.

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::constraints::{self, ColumnChange};
use super::validation::{ValidationError, validate_identifier};

/// Stable identifier for a table.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct TableId(Uuid);

/// Stable identifier for a column. Unique across the whole model, not just
/// within its owning table.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct ColumnId(Uuid);

/// Stable identifier for a relationship.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct RelationshipId(Uuid);

impl TableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl ColumnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl RelationshipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for RelationshipId {
    fn default() -> Self {
        Self::new()
    }
}

/// Column data type, the closed set a column can be declared as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Int,
    BigInt,
    Varchar,
    Char,
    Text,
    DateTime,
    Date,
    Decimal,
    Boolean,
}

impl ColumnType {
    /// All declarable types, in display order.
    pub fn all_types() -> &'static [ColumnType] {
        &[
            ColumnType::Int,
            ColumnType::BigInt,
            ColumnType::Varchar,
            ColumnType::Char,
            ColumnType::Text,
            ColumnType::DateTime,
            ColumnType::Date,
            ColumnType::Decimal,
            ColumnType::Boolean,
        ]
    }

    /// Whether the `length` field of a column is meaningful for this type.
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            ColumnType::Varchar | ColumnType::Char | ColumnType::Decimal
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Varchar => write!(f, "VARCHAR"),
            ColumnType::Char => write!(f, "CHAR"),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::DateTime => write!(f, "DATETIME"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Decimal => write!(f, "DECIMAL"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

/// Relationship cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum RelationshipType {
    #[display("1:1")]
    OneToOne,
    #[display("1:N")]
    OneToMany,
    #[display("N:1")]
    ManyToOne,
    #[display("N:M")]
    ManyToMany,
}

impl Default for RelationshipType {
    fn default() -> Self {
        RelationshipType::OneToMany
    }
}

/// Column of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    /// Physical identifier.
    pub name: String,
    /// Display label, empty until set.
    pub logical_name: String,
    pub data_type: ColumnType,
    /// Free-form size, meaningful only for sized types ("255", "10,2", ...).
    pub length: String,
    pub is_pk: bool,
    /// Derived: true iff at least one relationship targets this column.
    pub is_fk: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub is_identity: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            id: ColumnId::new(),
            name: name.into(),
            logical_name: String::new(),
            data_type,
            length: String::new(),
            is_pk: false,
            is_fk: false,
            is_nullable: true,
            is_unique: false,
            is_identity: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_pk = true;
        self.is_nullable = false;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.length = length.into();
        self
    }

    pub fn with_logical_name(mut self, logical_name: impl Into<String>) -> Self {
        self.logical_name = logical_name.into();
        self
    }
}

/// Table node: physical/display names, model-space position and the ordered
/// column list. Column order is display-significant; the row index feeds the
/// routing geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    /// Display label, empty until set.
    pub logical_name: String,
    /// Top-left corner in model space.
    pub position: (f64, f64),
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TableId::new(),
            name: name.into(),
            logical_name: String::new(),
            position: (0.0, 0.0),
            columns: Vec::new(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = (x, y);
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn get_column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn find_column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, col)| col.name == name)
    }

    pub fn column_by_id(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|col| col.id == id)
    }
}

/// Relationship edge between two (table, column) endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub from_table: TableId,
    pub from_column: ColumnId,
    pub to_table: TableId,
    pub to_column: ColumnId,
    pub relationship_type: RelationshipType,
}

/// Graph type: nodes are tables, edges are relationships.
pub type SchemaGraph = StableGraph<Table, Relationship, Directed>;

/// Errors reported by model mutations. None of these is fatal; callers absorb
/// them as no-op outcomes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown or stale id")]
    NotFound,

    #[error("table '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    InvalidName(#[from] ValidationError),
}

/// The schema state: the graph plus id-to-index maps kept in lockstep with it.
#[derive(Clone, Debug, Default)]
pub struct SchemaModel {
    graph: SchemaGraph,
    table_index: HashMap<TableId, NodeIndex>,
    column_index: HashMap<ColumnId, (NodeIndex, usize)>,
    relationship_index: HashMap<RelationshipId, EdgeIndex>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Tables in stable display order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.graph.node_weights()
    }

    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.table_index
            .get(&id)
            .and_then(|&node| self.graph.node_weight(node))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.graph.node_weights().any(|t| t.name == name)
    }

    pub fn find_table_by_name(&self, name: &str) -> Option<TableId> {
        self.graph
            .node_weights()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        let &(node, row) = self.column_index.get(&id)?;
        self.graph.node_weight(node)?.columns.get(row)
    }

    /// Display row index of a column within its table.
    pub fn column_row(&self, id: ColumnId) -> Option<usize> {
        self.column_index.get(&id).map(|&(_, row)| row)
    }

    pub fn table_of_column(&self, id: ColumnId) -> Option<TableId> {
        let &(node, _) = self.column_index.get(&id)?;
        self.graph.node_weight(node).map(|t| t.id)
    }

    /// Generate a name not yet used by any table: `base`, `base_2`, `base_3`...
    pub fn generate_unique_table_name(&self, base: &str) -> String {
        if !self.table_exists(base) {
            return base.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{base}_{counter}");
            if !self.table_exists(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Create a table at the given position with the defaulted `id` column
    /// (INT, primary key, identity, not null).
    pub fn create_table(&mut self, position: (f64, f64)) -> TableId {
        let name = self.generate_unique_table_name("new_table");
        let table = Table::new(&name)
            .with_position(position.0, position.1)
            .add_column(Column::new("id", ColumnType::Int).primary_key().identity());
        let id = table.id;
        let node = self.graph.add_node(table);
        self.table_index.insert(id, node);
        self.reindex_columns(node);
        tracing::info!("created table '{}' ({})", name, id);
        id
    }

    /// Rename a table. The new name must be a valid identifier and not taken
    /// by another table.
    pub fn rename_table(&mut self, table: TableId, name: &str) -> Result<(), SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        validate_identifier(name)?;
        let taken = self
            .graph
            .node_indices()
            .any(|n| n != node && self.graph[n].name == name);
        if taken {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        t.name = name.to_string();
        Ok(())
    }

    pub fn set_table_logical_name(
        &mut self,
        table: TableId,
        logical_name: &str,
    ) -> Result<(), SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        t.logical_name = logical_name.to_string();
        Ok(())
    }

    /// Move a table to an absolute model-space position. Called on every
    /// pointer-move of a drag, so it must stay O(1).
    pub fn move_table(&mut self, table: TableId, position: (f64, f64)) -> Result<(), SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        t.position = position;
        Ok(())
    }

    /// Append a defaulted column (nullable VARCHAR) to a table.
    pub fn add_column(&mut self, table: TableId) -> Result<ColumnId, SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let name = {
            let t = self.graph.node_weight(node).ok_or(SchemaError::NotFound)?;
            unique_column_name(t, "new_column")
        };
        let column = Column::new(name, ColumnType::Varchar);
        let id = column.id;
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        t.columns.push(column);
        let row = t.columns.len() - 1;
        self.column_index.insert(id, (node, row));
        tracing::debug!("added column {} to table {}", id, table);
        Ok(id)
    }

    /// Apply a single field change to a column, running the constraint rules.
    pub fn update_column(
        &mut self,
        table: TableId,
        column: ColumnId,
        change: ColumnChange,
    ) -> Result<(), SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let Some(&(col_node, row)) = self.column_index.get(&column) else {
            return Err(SchemaError::NotFound);
        };
        if col_node != node {
            return Err(SchemaError::NotFound);
        }
        if let ColumnChange::Name(name) = &change {
            validate_identifier(name)?;
        }
        let col = self
            .graph
            .node_weight_mut(node)
            .and_then(|t| t.columns.get_mut(row))
            .ok_or(SchemaError::NotFound)?;
        constraints::apply_change(col, change);
        debug_assert!(constraints::holds(col));
        Ok(())
    }

    /// Delete a column. Relationships touching it are removed first, and the
    /// foreign-key flag of their other endpoints re-derived.
    pub fn delete_column(
        &mut self,
        table: TableId,
        column: ColumnId,
    ) -> Result<Column, SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let Some(&(col_node, row)) = self.column_index.get(&column) else {
            return Err(SchemaError::NotFound);
        };
        if col_node != node {
            return Err(SchemaError::NotFound);
        }
        let removed_rels = self.remove_relationships_touching_column(column);
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        let col = t.columns.remove(row);
        self.column_index.remove(&column);
        self.reindex_columns(node);
        for rel in &removed_rels {
            if rel.to_column != column {
                self.rederive_foreign_key(rel.to_table, rel.to_column);
            }
        }
        tracing::info!(
            "deleted column '{}' ({}) and {} touching relationship(s)",
            col.name,
            column,
            removed_rels.len()
        );
        Ok(col)
    }

    /// Reorder a column to a new display row.
    pub fn move_column(
        &mut self,
        table: TableId,
        column: ColumnId,
        to_index: usize,
    ) -> Result<(), SchemaError> {
        let Some(&node) = self.table_index.get(&table) else {
            return Err(SchemaError::NotFound);
        };
        let Some(&(col_node, row)) = self.column_index.get(&column) else {
            return Err(SchemaError::NotFound);
        };
        if col_node != node {
            return Err(SchemaError::NotFound);
        }
        let t = self
            .graph
            .node_weight_mut(node)
            .ok_or(SchemaError::NotFound)?;
        if to_index >= t.columns.len() {
            return Err(SchemaError::NotFound);
        }
        let col = t.columns.remove(row);
        t.columns.insert(to_index, col);
        self.reindex_columns(node);
        Ok(())
    }

    /// Insert a prebuilt table, indexing its columns. Used when loading a
    /// document and by the sample schema.
    pub(crate) fn insert_table(&mut self, table: Table) -> TableId {
        let id = table.id;
        let node = self.graph.add_node(table);
        self.table_index.insert(id, node);
        self.reindex_columns(node);
        id
    }

    pub(crate) fn node_of(&self, table: TableId) -> Option<NodeIndex> {
        self.table_index.get(&table).copied()
    }

    pub(crate) fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut SchemaGraph {
        &mut self.graph
    }

    pub(crate) fn table_index_mut(&mut self) -> &mut HashMap<TableId, NodeIndex> {
        &mut self.table_index
    }

    pub(crate) fn column_index_mut(&mut self) -> &mut HashMap<ColumnId, (NodeIndex, usize)> {
        &mut self.column_index
    }

    pub(crate) fn relationship_index(&self) -> &HashMap<RelationshipId, EdgeIndex> {
        &self.relationship_index
    }

    pub(crate) fn relationship_index_mut(&mut self) -> &mut HashMap<RelationshipId, EdgeIndex> {
        &mut self.relationship_index
    }

    /// Rebuild the (node, row) entries for every column of a table.
    pub(crate) fn reindex_columns(&mut self, node: NodeIndex) {
        let Some(t) = self.graph.node_weight(node) else {
            return;
        };
        let entries: Vec<(ColumnId, usize)> = t
            .columns
            .iter()
            .enumerate()
            .map(|(row, col)| (col.id, row))
            .collect();
        for (id, row) in entries {
            self.column_index.insert(id, (node, row));
        }
    }
}

fn unique_column_name(table: &Table, base: &str) -> String {
    if table.find_column(base).is_none() {
        return base.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}_{counter}");
        if table.find_column(&candidate).is_none() {
            return candidate;
        }
        counter += 1;
    }
}

/// Build a small blog-style schema, used by tests and as a starter document.
pub fn sample_schema() -> SchemaModel {
    use super::relationships::RelationshipOps;

    let mut model = SchemaModel::new();

    let users = model.insert_table(
        Table::new("users")
            .with_position(100.0, 100.0)
            .add_column(Column::new("id", ColumnType::Int).primary_key().identity())
            .add_column(
                Column::new("username", ColumnType::Varchar)
                    .with_length("255")
                    .not_null()
                    .unique(),
            )
            .add_column(
                Column::new("email", ColumnType::Varchar)
                    .with_length("255")
                    .not_null()
                    .unique(),
            )
            .add_column(Column::new("created_at", ColumnType::DateTime).not_null()),
    );

    let posts = model.insert_table(
        Table::new("posts")
            .with_position(520.0, 100.0)
            .add_column(Column::new("id", ColumnType::Int).primary_key().identity())
            .add_column(Column::new("user_id", ColumnType::Int).not_null())
            .add_column(
                Column::new("title", ColumnType::Varchar)
                    .with_length("255")
                    .not_null(),
            )
            .add_column(Column::new("content", ColumnType::Text))
            .add_column(Column::new("created_at", ColumnType::DateTime).not_null()),
    );

    let users_id = model
        .table(users)
        .and_then(|t| t.find_column("id"))
        .map(|(_, c)| c.id);
    let posts_user_id = model
        .table(posts)
        .and_then(|t| t.find_column("user_id"))
        .map(|(_, c)| c.id);

    if let (Some(from), Some(to)) = (users_id, posts_user_id) {
        let _ = model.create_relationship((users, from), (posts, to), RelationshipType::OneToMany);
    }

    model
}
