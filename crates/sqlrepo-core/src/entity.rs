// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity descriptors: the metadata contract between derived entities and
//! generated repositories.
//!
//! `#[derive(SqlEntity)]` implements [`Entity`] for a struct, exposing the
//! table name, the ordered column list, and row materialization. Column
//! order is struct declaration order; that order is what `{{columns}}`
//! expands to and what [`Entity::to_values`] must match.

use crate::value::SqlValue;
#[cfg(feature = "runtime")]
use crate::error::RepoError;

/// Metadata for one mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Database column name.
    pub name: &'static str,

    /// Rust field name.
    pub field: &'static str,

    /// True for `Option<T>` fields.
    pub nullable: bool,

    /// True for `bool` fields; boolean expression operands against these
    /// columns render as dialect literals.
    pub boolean: bool,

    /// False for the primary key and `#[sql(readonly)]` fields, which are
    /// excluded from INSERT column lists.
    pub insertable: bool,

    /// True for the `#[sql(id)]` column.
    pub primary_key: bool,
}

/// Find a column by field name or column name.
#[must_use]
pub fn find_column<'a>(columns: &'a [ColumnDef], name: &str) -> Option<&'a ColumnDef> {
    columns
        .iter()
        .find(|c| c.field == name || c.name == name)
}

/// A struct mapped to a database table.
///
/// Implemented by `#[derive(SqlEntity)]`; manual implementations are
/// possible but rarely needed.
pub trait Entity: Sized + Send + Sync {
    /// Database table name.
    const TABLE: &'static str;

    /// All mapped columns, in struct declaration order.
    const COLUMNS: &'static [ColumnDef];

    /// The primary-key column.
    fn primary_key() -> Option<&'static ColumnDef> {
        Self::COLUMNS.iter().find(|c| c.primary_key)
    }

    /// Columns included in INSERT statements, in declaration order.
    fn insert_columns() -> impl Iterator<Item = &'static ColumnDef> {
        Self::COLUMNS.iter().filter(|c| c.insertable)
    }

    /// Values of the insertable columns, aligned with
    /// [`Entity::insert_columns`].
    fn to_values(&self) -> Vec<SqlValue>;

    /// Current primary-key value.
    fn id_value(&self) -> SqlValue;

    /// Assign a database-generated integer key to the primary-key field.
    ///
    /// No-op for entities whose primary key is not an integer.
    fn assign_generated_id(&mut self, id: i64);

    /// Materialize an entity from a database row, mapping columns by name.
    #[cfg(feature = "runtime")]
    fn from_row(row: &sqlx::any::AnyRow) -> Result<Self, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: &[ColumnDef] = &[
        ColumnDef {
            name: "id",
            field: "id",
            nullable: false,
            boolean: false,
            insertable: false,
            primary_key: true,
        },
        ColumnDef {
            name: "is_active",
            field: "active",
            nullable: false,
            boolean: true,
            insertable: true,
            primary_key: false,
        },
    ];

    #[test]
    fn find_by_field_name() {
        assert_eq!(find_column(COLS, "active").unwrap().name, "is_active");
    }

    #[test]
    fn find_by_column_name() {
        assert_eq!(find_column(COLS, "is_active").unwrap().field, "active");
    }

    #[test]
    fn find_missing() {
        assert!(find_column(COLS, "nope").is_none());
    }
}
