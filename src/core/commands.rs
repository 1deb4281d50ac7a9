//! The closed command set a host issues against the schema state.
//!
//! Every mutation the interaction layer or a property panel can perform is a
//! [`SchemaCommand`]; [`SchemaModel::apply`] turns one into an [`Outcome`].
//! Commands referencing stale ids are absorbed as ignored outcomes rather than
//! errors; an event queue must never crash on a mutation that raced a delete.

use serde::{Deserialize, Serialize};

use super::constraints::ColumnChange;
use super::relationships::RelationshipOps;
use super::schema::{
    ColumnId, RelationshipId, RelationshipType, SchemaError, SchemaModel, TableId,
};

/// A single model mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SchemaCommand {
    CreateTable {
        position: (f64, f64),
    },
    DeleteTable {
        table: TableId,
    },
    RenameTable {
        table: TableId,
        name: String,
    },
    SetTableLogicalName {
        table: TableId,
        logical_name: String,
    },
    MoveTable {
        table: TableId,
        position: (f64, f64),
    },
    AddColumn {
        table: TableId,
    },
    UpdateColumn {
        table: TableId,
        column: ColumnId,
        change: ColumnChange,
    },
    DeleteColumn {
        table: TableId,
        column: ColumnId,
    },
    MoveColumn {
        table: TableId,
        column: ColumnId,
        to_index: usize,
    },
    CreateRelationship {
        from_table: TableId,
        from_column: ColumnId,
        to_table: TableId,
        to_column: ColumnId,
        relationship_type: RelationshipType,
    },
    SetRelationshipType {
        relationship: RelationshipId,
        relationship_type: RelationshipType,
    },
    DeleteRelationship {
        relationship: RelationshipId,
    },
}

/// Id of an entity a command created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityId {
    Table(TableId),
    Column(ColumnId),
    Relationship(RelationshipId),
}

/// Why a command was absorbed without mutating the model.
#[derive(Clone, Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum IgnoreReason {
    #[error("unknown or stale id")]
    NotFound,

    #[error("{0}")]
    RejectedName(String),
}

impl From<SchemaError> for IgnoreReason {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::NotFound => IgnoreReason::NotFound,
            SchemaError::DuplicateName(_) | SchemaError::InvalidName(_) => {
                IgnoreReason::RejectedName(err.to_string())
            }
        }
    }
}

/// Result of applying a command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The model was mutated.
    Applied,
    /// The model was mutated and a new entity exists. A create request that
    /// matched an existing relationship reports that relationship here.
    Created(EntityId),
    /// The command was absorbed without effect.
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Outcome::Ignored(_))
    }

    pub fn created_id(&self) -> Option<EntityId> {
        match self {
            Outcome::Created(id) => Some(*id),
            _ => None,
        }
    }
}

impl SchemaModel {
    /// Apply one command. Effects, including constraint enforcement and
    /// cascades, are complete when this returns; a reader never observes a
    /// half-applied mutation.
    pub fn apply(&mut self, command: SchemaCommand) -> Outcome {
        tracing::debug!("applying {:?}", command);
        match command {
            SchemaCommand::CreateTable { position } => {
                Outcome::Created(EntityId::Table(self.create_table(position)))
            }
            SchemaCommand::DeleteTable { table } => absorb(self.delete_table(table).map(|_| ())),
            SchemaCommand::RenameTable { table, name } => absorb(self.rename_table(table, &name)),
            SchemaCommand::SetTableLogicalName {
                table,
                logical_name,
            } => absorb(self.set_table_logical_name(table, &logical_name)),
            SchemaCommand::MoveTable { table, position } => {
                absorb(self.move_table(table, position))
            }
            SchemaCommand::AddColumn { table } => match self.add_column(table) {
                Ok(column) => Outcome::Created(EntityId::Column(column)),
                Err(err) => Outcome::Ignored(err.into()),
            },
            SchemaCommand::UpdateColumn {
                table,
                column,
                change,
            } => absorb(self.update_column(table, column, change)),
            SchemaCommand::DeleteColumn { table, column } => {
                absorb(self.delete_column(table, column).map(|_| ()))
            }
            SchemaCommand::MoveColumn {
                table,
                column,
                to_index,
            } => absorb(self.move_column(table, column, to_index)),
            SchemaCommand::CreateRelationship {
                from_table,
                from_column,
                to_table,
                to_column,
                relationship_type,
            } => {
                match self.create_relationship(
                    (from_table, from_column),
                    (to_table, to_column),
                    relationship_type,
                ) {
                    Ok(outcome) => Outcome::Created(EntityId::Relationship(outcome.id())),
                    Err(err) => Outcome::Ignored(err.into()),
                }
            }
            SchemaCommand::SetRelationshipType {
                relationship,
                relationship_type,
            } => absorb(self.set_relationship_type(relationship, relationship_type)),
            SchemaCommand::DeleteRelationship { relationship } => {
                absorb(self.delete_relationship(relationship).map(|_| ()))
            }
        }
    }
}

fn absorb(result: Result<(), SchemaError>) -> Outcome {
    match result {
        Ok(()) => Outcome::Applied,
        Err(err) => Outcome::Ignored(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_id_is_absorbed() {
        let mut model = SchemaModel::new();
        let outcome = model.apply(SchemaCommand::DeleteTable {
            table: TableId::new(),
        });
        assert_eq!(outcome, Outcome::Ignored(IgnoreReason::NotFound));
    }

    #[test]
    fn test_create_table_reports_new_id() {
        let mut model = SchemaModel::new();
        let outcome = model.apply(SchemaCommand::CreateTable {
            position: (10.0, 20.0),
        });
        let Some(EntityId::Table(id)) = outcome.created_id() else {
            panic!("expected a table id");
        };
        assert_eq!(model.table(id).unwrap().position, (10.0, 20.0));
    }

    #[test]
    fn test_invalid_rename_is_rejected_without_mutation() {
        let mut model = SchemaModel::new();
        let outcome = model.apply(SchemaCommand::CreateTable {
            position: (0.0, 0.0),
        });
        let Some(EntityId::Table(id)) = outcome.created_id() else {
            panic!("expected a table id");
        };

        let outcome = model.apply(SchemaCommand::RenameTable {
            table: id,
            name: "1bad".into(),
        });
        assert!(!outcome.is_applied());
        assert_eq!(model.table(id).unwrap().name, "new_table");
    }

    #[test]
    fn test_command_round_trips_through_serde() {
        let command = SchemaCommand::MoveTable {
            table: TableId::new(),
            position: (42.0, -7.5),
        };
        let json = serde_json::to_string(&command).unwrap();
        let parsed: SchemaCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, command);
    }
}
