// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Proc-macro implementation for sqlrepo.
//!
//! Two entry points:
//!
//! - [`SqlEntity`](macro@SqlEntity) — derive macro producing the entity
//!   descriptor: table name, ordered column metadata, row materialization,
//!   and insert-value extraction.
//! - [`repository`](macro@repository) — attribute macro on a trait that
//!   synthesizes a concrete repository implementation from SQL templates,
//!   dialect hints, and the predefined shape library.
//!
//! The pipeline behind `#[repository]`: resolve each method's template
//! (user-written or inherited from a shape), tokenize it, plan parameter
//! bindings and the result recipe, validate, and emit a method body that
//! composes dialect-correct SQL and calls into the `sqlrepo` runtime.
//! Methods with fatal diagnostics emit `compile_error!` instead of code.

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

mod entity;
mod repository;

use proc_macro::TokenStream;

/// Derive macro producing the entity descriptor for a struct.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(SqlEntity)]
/// #[sql_entity(table = "users")]
/// pub struct User {
///     #[sql(id)]
///     pub id: i64,
///     pub name: String,
///     #[sql(column = "is_active")]
///     pub active: bool,
///     pub score: Option<i64>,
/// }
/// ```
///
/// Column names default to the `snake_case` of the field name; override
/// with `#[sql(column = "...")]`. `#[sql(id)]` marks the primary key
/// (excluded from INSERT column lists, assignable from generated keys).
/// `#[sql(readonly)]` keeps a column out of INSERTs, for database-managed
/// values.
///
/// Supported field types: `bool`, `i16`, `i32`, `i64`, `f32`, `f64`,
/// `String`, `Vec<u8>`, and `Option` of each.
#[proc_macro_derive(SqlEntity, attributes(sql_entity, sql))]
pub fn derive_sql_entity(input: TokenStream) -> TokenStream {
    entity::derive(input)
}

/// Attribute macro turning a trait into a generated repository.
///
/// # Example
///
/// ```rust,ignore
/// #[repository(entity = User, table = "users", dialect = "postgres")]
/// pub trait UserRepo {
///     #[sql("SELECT {{columns}} FROM {{table}} WHERE {{pk}} = @id")]
///     async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
/// }
/// ```
///
/// The macro re-emits the trait under `#[async_trait]`, appends any
/// requested predefined shape methods, and implements the trait for
/// [`SqlRepository`](../sqlrepo/struct.SqlRepository.html).
///
/// # Options
///
/// | option | meaning |
/// |--------|---------|
/// | `entity = Path` | entity type backing `{{table}}`/`{{columns}}`/`{{pk}}` (required) |
/// | `table = "name"` | override the entity's table name |
/// | `dialect = "tag"` | `sqlite`, `mysql`, `postgres`, `sqlserver`, `oracle` |
/// | `id_type = "ty"` | primary-key type used by shape signatures (default `i64`) |
/// | `max_batch_size = n` | rows per batch INSERT statement (default 100) |
/// | `shapes(crud, ...)` | predefined shapes to merge into the trait |
/// | `limit_presets(name = n, ...)` | add or override named LIMIT presets |
///
/// # Method attributes
///
/// - `#[sql("...")]` — the SQL template
/// - `#[returning_id]` — force generated-key retrieval on an INSERT
/// - `#[order_by("col")]` — ORDER BY column for OFFSET/FETCH dialects
/// - `#[single]` — make an optional-returning method fail on multiple rows
#[proc_macro_attribute]
pub fn repository(args: TokenStream, input: TokenStream) -> TokenStream {
    repository::expand(args.into(), input.into()).into()
}
