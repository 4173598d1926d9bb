// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Predefined repository shapes.
//!
//! A closed set of generic method bundles whose signatures and templates
//! are stamped into the trait before parsing, so the rest of the pipeline
//! treats them exactly like user-authored methods. A shape method is
//! skipped when the trait already declares a method with the same name,
//! which is also how two overlapping shapes coexist.

use syn::{Path, TraitItemFn, Type, parse_quote};

/// Label of one predefined shape bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// `get_by_id`, `get_all`, `insert`, `update`, `delete_by_id`, `count`.
    Crud,

    /// Predicate-driven reads plus pagination.
    Query,

    /// Predicate-driven writes.
    Command,

    /// Chunked multi-row INSERTs.
    Batch,

    /// `MIN`/`MAX`/`SUM`/`AVG` over a dynamic column.
    Aggregate,

    /// Assignment-list update by key.
    PartialUpdate,

    /// Assignment-list update by predicate.
    ExpressionUpdate,

    /// Raw passthrough and dynamic-column queries.
    Advanced,

    /// `truncate` and `analyze`.
    Schema,

    /// Superset of [`ShapeKind::Schema`] plus `delete_all`.
    Maintenance,
}

impl ShapeKind {
    /// Parse a shape label as written in `shapes(...)`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "crud" => Some(Self::Crud),
            "query" => Some(Self::Query),
            "command" => Some(Self::Command),
            "batch" => Some(Self::Batch),
            "aggregate" => Some(Self::Aggregate),
            "partial_update" => Some(Self::PartialUpdate),
            "expression_update" => Some(Self::ExpressionUpdate),
            "advanced" => Some(Self::Advanced),
            "schema" => Some(Self::Schema),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }

    /// Labels accepted by `shapes(...)`, for error messages.
    pub const LABELS: &'static [&'static str] = &[
        "crud",
        "query",
        "command",
        "batch",
        "aggregate",
        "partial_update",
        "expression_update",
        "advanced",
        "schema",
        "maintenance",
    ];
}

/// The trait methods of one shape, with templates and flags attached.
pub fn shape_methods(kind: ShapeKind, entity: &Path, id_ty: &Type) -> Vec<TraitItemFn> {
    match kind {
        ShapeKind::Crud => vec![
            parse_quote! {
                /// Fetch one row by primary key.
                #[sql("SELECT {{columns}} FROM {{table}} WHERE {{pk}} = @id")]
                async fn get_by_id(&self, id: #id_ty) -> Result<Option<#entity>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Fetch every row.
                #[sql("SELECT {{columns}} FROM {{table}}")]
                async fn get_all(&self) -> Result<Vec<#entity>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Insert a row and return it with the generated key assigned.
                #[sql("INSERT INTO {{table}} ({{columns}}) VALUES {{batch_values}}")]
                async fn insert(&self, entity: #entity) -> Result<#entity, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Update every mapped column of the row with this key.
                #[sql("UPDATE {{table}} SET {{set_columns}} WHERE {{pk}} = @id")]
                async fn update(&self, entity: #entity) -> Result<u64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Delete by primary key.
                #[sql("DELETE FROM {{table}} WHERE {{pk}} = @id")]
                async fn delete_by_id(&self, id: #id_ty) -> Result<u64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Count all rows.
                #[sql("SELECT COUNT(*) FROM {{table}}")]
                async fn count(&self) -> Result<i64, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Query => vec![
            parse_quote! {
                /// Rows matching a predicate.
                #[sql("SELECT {{columns}} FROM {{table}} {{where @predicate}}")]
                async fn find_where(&self, predicate: ::sqlrepo::Predicate) -> Result<Vec<#entity>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// First row matching a predicate, if any.
                #[sql("SELECT {{columns}} FROM {{table}} {{where @predicate}}")]
                async fn find_first_where(&self, predicate: ::sqlrepo::Predicate) -> Result<Option<#entity>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// The single row matching a predicate; more than one is an error.
                #[sql("SELECT {{columns}} FROM {{table}} {{where @predicate}}")]
                #[single]
                async fn find_single_where(&self, predicate: ::sqlrepo::Predicate) -> Result<Option<#entity>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Whether any row matches.
                #[sql("SELECT COUNT(*) FROM {{table}} {{where @predicate}}")]
                async fn exists_where(&self, predicate: ::sqlrepo::Predicate) -> Result<bool, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Number of matching rows.
                #[sql("SELECT COUNT(*) FROM {{table}} {{where @predicate}}")]
                async fn count_where(&self, predicate: ::sqlrepo::Predicate) -> Result<i64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// One page of rows, ordered by primary key. Pages are 1-based.
                #[sql("SELECT {{columns}} FROM {{table}} ORDER BY {{pk}} {{limit}} {{offset}}")]
                async fn get_page(&self, page_number: i64, page_size: i64) -> Result<::sqlrepo::Page<#entity>, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Command => vec![
            parse_quote! {
                /// Delete rows matching a predicate.
                #[sql("DELETE FROM {{table}} {{where @predicate}}")]
                async fn delete_where(&self, predicate: ::sqlrepo::Predicate) -> Result<u64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Delete every row.
                #[sql("DELETE FROM {{table}}")]
                async fn delete_all(&self) -> Result<u64, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Batch => vec![
            parse_quote! {
                /// Insert many rows in chunked multi-row statements.
                #[sql("INSERT INTO {{table}} ({{columns}}) VALUES {{batch_values}}")]
                async fn batch_insert(&self, items: Vec<#entity>) -> Result<u64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Insert many rows and return their generated keys, in input order.
                #[sql("INSERT INTO {{table}} ({{columns}}) VALUES {{batch_values}}")]
                async fn batch_insert_and_get_ids(&self, items: Vec<#entity>) -> Result<Vec<i64>, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Aggregate => vec![
            parse_quote! {
                /// Smallest value of a column.
                #[sql("SELECT MIN({{column}}) FROM {{table}}")]
                async fn min_of(&self, column: ::sqlrepo::SqlIdent) -> Result<::sqlrepo::SqlValue, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Largest value of a column.
                #[sql("SELECT MAX({{column}}) FROM {{table}}")]
                async fn max_of(&self, column: ::sqlrepo::SqlIdent) -> Result<::sqlrepo::SqlValue, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Sum of a column.
                #[sql("SELECT SUM({{column}}) FROM {{table}}")]
                async fn sum_of(&self, column: ::sqlrepo::SqlIdent) -> Result<::sqlrepo::SqlValue, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Average of a column.
                #[sql("SELECT AVG({{column}}) FROM {{table}}")]
                async fn avg_of(&self, column: ::sqlrepo::SqlIdent) -> Result<::sqlrepo::SqlValue, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::PartialUpdate => vec![parse_quote! {
            /// Update the listed columns of the row with this key; other
            /// columns are untouched.
            #[sql("UPDATE {{table}} SET {{set @assignments}} WHERE {{pk}} = @id")]
            async fn update_columns(&self, id: #id_ty, assignments: ::sqlrepo::SetList) -> Result<u64, ::sqlrepo::RepoError>;
        }],
        ShapeKind::ExpressionUpdate => vec![parse_quote! {
            /// Update the listed columns of every row matching a predicate.
            #[sql("UPDATE {{table}} SET {{set @assignments}} {{where @predicate}}")]
            async fn update_where(&self, assignments: ::sqlrepo::SetList, predicate: ::sqlrepo::Predicate) -> Result<u64, ::sqlrepo::RepoError>;
        }],
        ShapeKind::Advanced => vec![
            parse_quote! {
                /// Run a raw statement and map rows by reader-reported name.
                /// The fragment is inlined verbatim; never feed it user input.
                #[sql("{{query}}")]
                async fn query_rows(&self, query: ::sqlrepo::SqlFragment) -> Result<Vec<::sqlrepo::DynamicRow>, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Run a raw statement and report affected rows.
                /// The fragment is inlined verbatim; never feed it user input.
                #[sql("{{command}}")]
                async fn execute_raw(&self, command: ::sqlrepo::SqlFragment) -> Result<u64, ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Distinct non-NULL values of a column, ordered, capped by
                /// the `distinct` preset.
                #[sql("SELECT DISTINCT {{column}} FROM {{table}} WHERE {{column}} IS NOT NULL ORDER BY {{column}} {{limit:distinct}}")]
                async fn get_distinct_values(&self, column: ::sqlrepo::SqlIdent) -> Result<Vec<::sqlrepo::SqlValue>, ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Schema => vec![
            parse_quote! {
                /// Remove every row, using TRUNCATE where the dialect has it.
                #[sql("{{truncate}}")]
                async fn truncate(&self) -> Result<(), ::sqlrepo::RepoError>;
            },
            parse_quote! {
                /// Refresh the planner statistics for the table.
                #[sql("{{analyze}}")]
                async fn analyze(&self) -> Result<(), ::sqlrepo::RepoError>;
            },
        ],
        ShapeKind::Maintenance => {
            let mut methods = shape_methods(ShapeKind::Schema, entity, id_ty);
            methods.push(parse_quote! {
                /// Delete every row with a plain DELETE.
                #[sql("DELETE FROM {{table}}")]
                async fn delete_all(&self) -> Result<u64, ::sqlrepo::RepoError>;
            });
            methods
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn names(kind: ShapeKind) -> Vec<String> {
        shape_methods(kind, &parse_quote!(User), &parse_quote!(i64))
            .iter()
            .map(|m| m.sig.ident.to_string())
            .collect()
    }

    #[test]
    fn labels_parse_round_trip() {
        for label in ShapeKind::LABELS {
            assert!(ShapeKind::parse(label).is_some(), "{label} should parse");
        }
        assert!(ShapeKind::parse("nope").is_none());
    }

    #[test]
    fn crud_method_set() {
        assert_eq!(
            names(ShapeKind::Crud),
            vec!["get_by_id", "get_all", "insert", "update", "delete_by_id", "count"]
        );
    }

    #[test]
    fn query_method_set() {
        assert_eq!(
            names(ShapeKind::Query),
            vec![
                "find_where",
                "find_first_where",
                "find_single_where",
                "exists_where",
                "count_where",
                "get_page"
            ]
        );
    }

    #[test]
    fn maintenance_extends_schema() {
        let names = names(ShapeKind::Maintenance);
        assert!(names.contains(&"truncate".to_string()));
        assert!(names.contains(&"analyze".to_string()));
        assert!(names.contains(&"delete_all".to_string()));
    }

    #[test]
    fn id_type_substitution() {
        let methods = shape_methods(ShapeKind::Crud, &parse_quote!(User), &parse_quote!(i32));
        let get_by_id = &methods[0];
        let rendered = quote::quote!(#get_by_id).to_string();
        assert!(rendered.contains("id : i32"));
    }

    #[test]
    fn single_flag_on_find_single() {
        let methods = shape_methods(ShapeKind::Query, &parse_quote!(User), &parse_quote!(i64));
        let single = &methods[2];
        let has_single_attr = single.attrs.iter().any(|a| a.path().is_ident("single"));
        assert!(has_single_attr);
    }
}
