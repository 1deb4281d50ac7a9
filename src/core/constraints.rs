//! Column-flag constraint rules.
//!
//! A column can never be simultaneously nullable and a primary key, and never
//! simultaneously nullable and an identity. [`apply_change`] enforces this on
//! every single-field mutation: the mutated field wins and the conflicting
//! flags are forced off. The rules are asymmetric; turning a flag *off* never
//! infers any other flag.

use serde::{Deserialize, Serialize};

use super::schema::{Column, ColumnType};

/// A single-field column mutation. Commands carry exactly one change; the
/// foreign-key flag is derived from the relationship set and has no variant
/// here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnChange {
    Name(String),
    LogicalName(String),
    DataType(ColumnType),
    Length(String),
    PrimaryKey(bool),
    Nullable(bool),
    Unique(bool),
    Identity(bool),
}

/// Apply one field change, forcing dependent flags so the column stays
/// consistent. Rule order:
/// 1. nullable set to true clears primary key and identity;
/// 2. primary key set to true clears nullable;
/// 3. identity set to true clears nullable.
pub fn apply_change(column: &mut Column, change: ColumnChange) {
    match change {
        ColumnChange::Name(name) => column.name = name,
        ColumnChange::LogicalName(logical_name) => column.logical_name = logical_name,
        ColumnChange::DataType(data_type) => column.data_type = data_type,
        ColumnChange::Length(length) => column.length = length,
        ColumnChange::Nullable(value) => {
            column.is_nullable = value;
            if value {
                column.is_pk = false;
                column.is_identity = false;
            }
        }
        ColumnChange::PrimaryKey(value) => {
            column.is_pk = value;
            if value {
                column.is_nullable = false;
            }
        }
        ColumnChange::Identity(value) => {
            column.is_identity = value;
            if value {
                column.is_nullable = false;
            }
        }
        ColumnChange::Unique(value) => column.is_unique = value,
    }
}

/// Whether the flag invariants hold for a column.
pub fn holds(column: &Column) -> bool {
    if column.is_nullable && (column.is_pk || column.is_identity) {
        return false;
    }
    true
}
