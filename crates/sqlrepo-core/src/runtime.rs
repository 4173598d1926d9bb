// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Runtime support called by generated repository methods.
//!
//! The stable surface between generated code and this crate: SQL text
//! expanders for the dialect-sensitive placeholders, parameter binding
//! against the `sqlx::Any` driver, result materializers for each recipe,
//! and cooperative cancellation.
//!
//! Nothing here opens or closes connections; generated code only borrows
//! the caller's pool. Every query or stream created below is dropped by
//! the time the enclosing future resolves, on success, error, and
//! cancellation alike.

use futures::TryStreamExt;
use sqlx::{
    Any, AnyPool, Column, Row,
    any::{AnyArguments, AnyRow},
    query::Query,
};
pub use tokio_util::sync::CancellationToken;

use crate::{
    dialect::{DialectDef, LimitClause},
    entity::Entity,
    error::RepoError,
    row::DynamicRow,
    value::SqlValue,
};

/// The connection handle generated repository impls are attached to.
///
/// A thin wrapper over [`AnyPool`]; thread-safety and pooling behavior are
/// whatever the pool provides.
#[derive(Debug, Clone)]
pub struct SqlRepository {
    pool: AnyPool,
}

impl SqlRepository {
    /// Wrap a pool.
    #[must_use]
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// SQL text expansion
// ---------------------------------------------------------------------------

/// Append the entity's full column list, quoted and comma-separated.
pub fn push_columns<E: Entity>(sql: &mut String, dialect: &DialectDef) {
    let mut first = true;
    for column in E::COLUMNS {
        if !first {
            sql.push_str(", ");
        }
        first = false;
        sql.push_str(&dialect.quote_ident(column.name));
    }
}

/// Append the entity's insertable column list, quoted and comma-separated.
pub fn push_insert_columns<E: Entity>(sql: &mut String, dialect: &DialectDef) {
    let mut first = true;
    for column in E::insert_columns() {
        if !first {
            sql.push_str(", ");
        }
        first = false;
        sql.push_str(&dialect.quote_ident(column.name));
    }
}

/// Append a quoted table name.
pub fn push_table(sql: &mut String, dialect: &DialectDef, table: &str) {
    sql.push_str(&dialect.quote_ident(table));
}

/// Append the entity's quoted primary-key column.
pub fn push_pk<E: Entity>(sql: &mut String, dialect: &DialectDef) -> Result<(), RepoError> {
    let pk = E::primary_key().ok_or_else(|| {
        RepoError::Unsupported(format!("entity `{}` has no primary key", E::TABLE))
    })?;
    sql.push_str(&dialect.quote_ident(pk.name));
    Ok(())
}

/// Append the dialect's LIMIT/OFFSET clause for the given runtime values.
///
/// Absent values elide their clause; when both are absent nothing is
/// emitted and trailing whitespace is removed so the statement stays
/// clean. `TOP (n)` dialect variants are injected after the leading
/// SELECT keyword instead of appended.
pub fn expand_limit_offset(
    sql: &mut String,
    dialect: &DialectDef,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(), RepoError> {
    while sql.ends_with(' ') {
        sql.pop();
    }
    match dialect.render_limit_offset(limit, offset)? {
        LimitClause::None => {}
        LimitClause::Trailing(clause) => {
            sql.push(' ');
            sql.push_str(&clause);
        }
        LimitClause::TopAfterSelect(top) => {
            let pos = sql
                .find("SELECT ")
                .or_else(|| sql.find("select "))
                .ok_or_else(|| {
                    RepoError::Unsupported(
                        "TOP-style limit needs a SELECT statement".to_string(),
                    )
                })?;
            sql.insert_str(pos + "SELECT ".len(), &format!("{top} "));
        }
    }
    Ok(())
}

/// Append a LIMIT clause alone.
pub fn expand_limit(
    sql: &mut String,
    dialect: &DialectDef,
    limit: Option<i64>,
) -> Result<(), RepoError> {
    expand_limit_offset(sql, dialect, limit, None)
}

/// Append an OFFSET clause alone.
pub fn expand_offset(
    sql: &mut String,
    dialect: &DialectDef,
    offset: Option<i64>,
) -> Result<(), RepoError> {
    expand_limit_offset(sql, dialect, None, offset)
}

/// Append the dialect's boolean literal.
pub fn expand_bool(sql: &mut String, dialect: &DialectDef, value: bool) {
    sql.push_str(dialect.render_bool(value));
}

/// Append the dialect's current-timestamp expression.
pub fn expand_current_timestamp(sql: &mut String, dialect: &DialectDef) {
    sql.push_str(dialect.current_timestamp_expr());
}

/// Append the dialect's in-statement id-returning suffix, when it has one.
pub fn expand_returning_id(sql: &mut String, dialect: &DialectDef, pk_column: &str) {
    sql.push_str(&dialect.insert_id_suffix(pk_column));
}

/// Append the id-returning suffix for an entity's primary key.
pub fn push_returning_id<E: Entity>(
    sql: &mut String,
    dialect: &DialectDef,
) -> Result<(), RepoError> {
    let pk = E::primary_key().ok_or_else(|| {
        RepoError::Unsupported(format!("entity `{}` has no primary key", E::TABLE))
    })?;
    expand_returning_id(sql, dialect, pk.name);
    Ok(())
}

/// Validate and quote a dynamic identifier.
///
/// Anything failing [`crate::dialect::is_safe_identifier`] is rejected
/// with [`RepoError::UnsafeIdentifier`] before any SQL is assembled.
pub fn quote_dynamic_ident(dialect: &DialectDef, raw: &str) -> Result<String, RepoError> {
    if !crate::dialect::is_safe_identifier(raw) {
        return Err(RepoError::UnsafeIdentifier(raw.to_string()));
    }
    Ok(dialect.quote_ident(raw))
}

/// Render the comma-separated parameter references for an expanded
/// collection, e.g. `$2, $3, $4` or `@ids_0, @ids_1`.
///
/// An empty collection renders `NULL`, so the enclosing `IN (...)`
/// matches no rows without binding anything.
#[must_use]
pub fn expand_collection(
    dialect: &DialectDef,
    base: &str,
    len: usize,
    start_index: usize,
) -> String {
    if len == 0 {
        return "NULL".to_string();
    }
    let mut refs = Vec::with_capacity(len);
    for i in 0..len {
        refs.push(dialect.param_ref(&format!("{base}_{i}"), start_index + i));
    }
    refs.join(", ")
}

/// Render the `(...), (...)` tuples of a multi-row VALUES clause.
#[must_use]
pub fn expand_batch_values(
    dialect: &DialectDef,
    columns_per_row: usize,
    rows: usize,
    start_index: usize,
) -> String {
    let mut tuples = Vec::with_capacity(rows);
    let mut index = start_index;
    for _ in 0..rows {
        let mut refs = Vec::with_capacity(columns_per_row);
        for c in 0..columns_per_row {
            refs.push(dialect.param_ref(&format!("v{c}"), index));
            index += 1;
        }
        tuples.push(format!("({})", refs.join(", ")));
    }
    tuples.join(", ")
}

// ---------------------------------------------------------------------------
// Parameter binding and row decoding
// ---------------------------------------------------------------------------

/// Bind one [`SqlValue`] onto a query.
#[must_use]
pub fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(v) => query.bind(v),
        SqlValue::Int(v) => query.bind(v),
        SqlValue::Float(v) => query.bind(v),
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Bytes(v) => query.bind(v),
    }
}

/// Build a query with all parameters bound in slot order.
#[must_use]
pub fn build_query<'q>(
    sql: &'q str,
    params: Vec<SqlValue>,
) -> Query<'q, Any, AnyArguments<'q>> {
    let mut query = sqlx::query(sql);
    for value in params {
        query = bind_value(query, value);
    }
    query
}

/// Decode one column into a [`SqlValue`] by probing the portable types.
pub fn decode_value(row: &AnyRow, index: usize) -> Result<SqlValue, RepoError> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Int));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Float));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bool));
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Text));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(v.map_or(SqlValue::Null, SqlValue::Bytes));
    }
    Err(RepoError::Mapping(format!(
        "column {index} has an unsupported type"
    )))
}

/// Decode a column by reader-reported name.
pub fn decode_named(row: &AnyRow, column: &str) -> Result<SqlValue, RepoError> {
    let index = row
        .columns()
        .iter()
        .position(|c| c.name() == column)
        .ok_or_else(|| RepoError::Mapping(format!("column `{column}` not present in result")))?;
    decode_value(row, index)
}

macro_rules! typed_getter {
    ($required:ident, $optional:ident, $ty:ty, $convert:ident) => {
        /// Read a non-nullable column of this type, by name.
        pub fn $required(row: &AnyRow, column: &str) -> Result<$ty, RepoError> {
            match decode_named(row, column)?.$convert() {
                Ok(Some(v)) => Ok(v),
                Ok(None) => Err(RepoError::Mapping(format!(
                    "column `{column}` is NULL but the field is not optional"
                ))),
                Err(_) => Err(RepoError::Mapping(format!(
                    "column `{column}` has an unexpected type"
                ))),
            }
        }

        /// Read a nullable column of this type, by name.
        pub fn $optional(row: &AnyRow, column: &str) -> Result<Option<$ty>, RepoError> {
            decode_named(row, column)?.$convert().map_err(|_| {
                RepoError::Mapping(format!("column `{column}` has an unexpected type"))
            })
        }
    };
}

typed_getter!(get_i64, get_opt_i64, i64, opt_i64);
typed_getter!(get_f64, get_opt_f64, f64, opt_f64);
typed_getter!(get_bool, get_opt_bool, bool, opt_bool);
typed_getter!(get_text, get_opt_text, String, opt_text);
typed_getter!(get_bytes, get_opt_bytes, Vec<u8>, opt_bytes);

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Run a database future under an optional cancellation token.
///
/// Cancellation is cooperative: a signalled token aborts the in-flight
/// operation at its next suspension point, partial results are dropped,
/// and [`RepoError::Cancelled`] surfaces.
pub async fn run_cancellable<T, F>(
    token: Option<&CancellationToken>,
    fut: F,
) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    match token {
        None => fut.await,
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(RepoError::Cancelled),
                result = fut => result,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Materializers
// ---------------------------------------------------------------------------

/// Execute a statement and report affected rows.
pub async fn execute(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<u64, RepoError> {
    run_cancellable(token, async {
        build_query(sql, params)
            .execute(pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(RepoError::from_db)
    })
    .await
}

/// Fetch the first column of the first row; [`SqlValue::Null`] when the
/// query returns no rows.
pub async fn fetch_scalar(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<SqlValue, RepoError> {
    run_cancellable(token, async {
        let row = build_query(sql, params)
            .fetch_optional(pool)
            .await
            .map_err(RepoError::from_db)?;
        match row {
            Some(row) => decode_value(&row, 0),
            None => Ok(SqlValue::Null),
        }
    })
    .await
}

/// Fetch the first column of every row.
pub async fn fetch_scalar_list(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<Vec<SqlValue>, RepoError> {
    run_cancellable(token, async {
        let rows = build_query(sql, params)
            .fetch_all(pool)
            .await
            .map_err(RepoError::from_db)?;
        rows.iter().map(|row| decode_value(row, 0)).collect()
    })
    .await
}

/// Fetch zero or one entity. An unexpected extra row is logged and the
/// first row wins.
pub async fn fetch_optional<E: Entity>(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<Option<E>, RepoError> {
    run_cancellable(token, async {
        let mut stream = build_query(sql, params).fetch(pool);
        let Some(row) = stream.try_next().await.map_err(RepoError::from_db)? else {
            return Ok(None);
        };
        if stream
            .try_next()
            .await
            .map_err(RepoError::from_db)?
            .is_some()
        {
            tracing::warn!(sql, "optional query matched more than one row; taking the first");
        }
        E::from_row(&row).map(Some)
    })
    .await
}

/// Fetch zero or one entity, failing when the query matches several rows.
pub async fn fetch_single<E: Entity>(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<Option<E>, RepoError> {
    run_cancellable(token, async {
        let mut stream = build_query(sql, params).fetch(pool);
        let Some(row) = stream.try_next().await.map_err(RepoError::from_db)? else {
            return Ok(None);
        };
        if stream
            .try_next()
            .await
            .map_err(RepoError::from_db)?
            .is_some()
        {
            return Err(RepoError::MultipleRowsForOptional);
        }
        E::from_row(&row).map(Some)
    })
    .await
}

/// Fetch every row as an entity.
pub async fn fetch_list<E: Entity>(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<Vec<E>, RepoError> {
    run_cancellable(token, async {
        let rows = build_query(sql, params)
            .fetch_all(pool)
            .await
            .map_err(RepoError::from_db)?;
        rows.iter().map(E::from_row).collect()
    })
    .await
}

/// Fetch every row as an ordered column-to-value map.
pub async fn fetch_dynamic_rows(
    pool: &AnyPool,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<Vec<DynamicRow>, RepoError> {
    run_cancellable(token, async {
        let rows = build_query(sql, params)
            .fetch_all(pool)
            .await
            .map_err(RepoError::from_db)?;
        rows.iter()
            .map(|row| {
                let mut dynamic = DynamicRow::new();
                for (index, column) in row.columns().iter().enumerate() {
                    dynamic.push(column.name(), decode_value(row, index)?);
                }
                Ok(dynamic)
            })
            .collect()
    })
    .await
}

/// Run the COUNT statement then the page SELECT, sequentially on the same
/// pool, and assemble the page. The two statements are not wrapped in a
/// transaction; that is the caller's call.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_page<E: Entity>(
    pool: &AnyPool,
    count_sql: &str,
    count_params: Vec<SqlValue>,
    select_sql: &str,
    select_params: Vec<SqlValue>,
    page_number: i64,
    page_size: i64,
    token: Option<&CancellationToken>,
) -> Result<crate::Page<E>, RepoError> {
    let total_count = fetch_scalar(pool, count_sql, count_params, token)
        .await?
        .require_i64()?;
    let items = fetch_list::<E>(pool, select_sql, select_params, token).await?;
    Ok(crate::Page::new(items, total_count, page_number, page_size))
}

fn scalar_to_id(value: SqlValue) -> Result<i64, RepoError> {
    match value {
        SqlValue::Int(v) => Ok(v),
        // SCOPE_IDENTITY() reports NUMERIC.
        SqlValue::Float(v) => Ok(v as i64),
        SqlValue::Null => Err(RepoError::NullScalar),
        other => Err(RepoError::Mapping(format!(
            "generated id has unexpected type {}",
            other.type_name()
        ))),
    }
}

/// Execute an INSERT and return the database-generated integer key.
///
/// Dialects with an in-statement suffix (`RETURNING`, `OUTPUT INSERTED`)
/// read the key from the INSERT itself; the rest issue the dialect's
/// follow-up id query. Follow-up retrieval reads connection-scoped state,
/// so those dialects need the two statements on one connection: a
/// size-one pool or a caller-supplied transaction.
pub async fn fetch_generated_id(
    pool: &AnyPool,
    dialect: &DialectDef,
    sql: &str,
    params: Vec<SqlValue>,
    token: Option<&CancellationToken>,
) -> Result<i64, RepoError> {
    if dialect.needs_insert_id_query() {
        execute(pool, sql, params, token).await?;
        let id = fetch_scalar(pool, dialect.insert_id_query, Vec::new(), token).await?;
        scalar_to_id(id)
    } else {
        let id = fetch_scalar(pool, sql, params, token).await?;
        scalar_to_id(id)
    }
}

/// Execute a chunked multi-row INSERT and report total affected rows.
///
/// `insert_prefix` is everything up to and including `VALUES `; each chunk
/// is one statement and its own auto-commit unit unless the caller
/// supplied a transaction-bound pool.
pub async fn batch_insert(
    pool: &AnyPool,
    dialect: &DialectDef,
    insert_prefix: &str,
    rows: Vec<Vec<SqlValue>>,
    max_batch: usize,
    token: Option<&CancellationToken>,
) -> Result<u64, RepoError> {
    let Some(columns_per_row) = rows.first().map(Vec::len) else {
        return Ok(0);
    };
    let max_batch = max_batch.max(1);
    let mut affected = 0;
    for chunk in rows.chunks(max_batch) {
        let mut sql = insert_prefix.to_string();
        sql.push_str(&expand_batch_values(dialect, columns_per_row, chunk.len(), 1));
        let params: Vec<SqlValue> = chunk.iter().flatten().cloned().collect();
        affected += execute(pool, &sql, params, token).await?;
    }
    Ok(affected)
}

/// Execute a chunked multi-row INSERT and return the generated keys, in
/// input order.
///
/// Dialects without a single-statement ordering guarantee fall back to
/// one INSERT per row so the returned ids still line up with the input.
pub async fn batch_insert_returning_ids(
    pool: &AnyPool,
    dialect: &DialectDef,
    insert_prefix: &str,
    pk_column: &str,
    rows: Vec<Vec<SqlValue>>,
    max_batch: usize,
    token: Option<&CancellationToken>,
) -> Result<Vec<i64>, RepoError> {
    use crate::dialect::{BatchIdAnchor, ReturningMode};

    let Some(columns_per_row) = rows.first().map(Vec::len) else {
        return Ok(Vec::new());
    };
    let max_batch = max_batch.max(1);
    let mut ids = Vec::with_capacity(rows.len());

    match dialect.returning {
        ReturningMode::Returning => {
            for chunk in rows.chunks(max_batch) {
                let mut sql = insert_prefix.to_string();
                sql.push_str(&expand_batch_values(dialect, columns_per_row, chunk.len(), 1));
                sql.push_str(&dialect.insert_id_suffix(pk_column));
                let params: Vec<SqlValue> = chunk.iter().flatten().cloned().collect();
                for id in fetch_scalar_list(pool, &sql, params, token).await? {
                    ids.push(scalar_to_id(id)?);
                }
            }
        }
        ReturningMode::LastInsertRowId => {
            for chunk in rows.chunks(max_batch) {
                let mut sql = insert_prefix.to_string();
                sql.push_str(&expand_batch_values(dialect, columns_per_row, chunk.len(), 1));
                let params: Vec<SqlValue> = chunk.iter().flatten().cloned().collect();
                execute(pool, &sql, params, token).await?;
                let anchor =
                    scalar_to_id(fetch_scalar(pool, dialect.insert_id_query, Vec::new(), token).await?)?;
                let len = chunk.len() as i64;
                let first = match dialect.batch_id_anchor {
                    BatchIdAnchor::FirstRow => anchor,
                    BatchIdAnchor::LastRow => anchor - len + 1,
                };
                ids.extend(first..first + len);
            }
        }
        ReturningMode::OutputInserted | ReturningMode::ScopeIdentity => {
            // No multi-row ordering guarantee; insert row by row.
            for row in rows {
                let mut sql = insert_prefix.to_string();
                sql.push_str(&expand_batch_values(dialect, columns_per_row, 1, 1));
                ids.push(fetch_generated_id(pool, dialect, &sql, row, token).await?);
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dialect::DialectKind, entity::ColumnDef};

    struct Probe {
        id: i64,
        name: String,
    }

    impl Entity for Probe {
        const TABLE: &'static str = "probes";

        const COLUMNS: &'static [ColumnDef] = &[
            ColumnDef {
                name: "id",
                field: "id",
                nullable: false,
                boolean: false,
                insertable: false,
                primary_key: true,
            },
            ColumnDef {
                name: "name",
                field: "name",
                nullable: false,
                boolean: false,
                insertable: true,
                primary_key: false,
            },
        ];

        fn to_values(&self) -> Vec<SqlValue> {
            vec![self.name.clone().into()]
        }

        fn id_value(&self) -> SqlValue {
            self.id.into()
        }

        fn assign_generated_id(&mut self, id: i64) {
            self.id = id;
        }

        fn from_row(_row: &AnyRow) -> Result<Self, RepoError> {
            Err(RepoError::Mapping("probe entity is never materialized".into()))
        }
    }

    #[test]
    fn column_expansion_differs_only_in_quoting_across_dialects() {
        for kind in DialectKind::ALL {
            let mut sql = String::from("SELECT ");
            push_columns::<Probe>(&mut sql, kind.def());
            sql.push_str(" FROM ");
            push_table(&mut sql, kind.def(), Probe::TABLE);
            let stripped: String = sql.chars().filter(|c| !"\"`[]".contains(*c)).collect();
            assert_eq!(stripped, "SELECT id, name FROM probes");
        }
    }

    #[test]
    fn insert_columns_exclude_the_primary_key() {
        let mut sql = String::new();
        push_insert_columns::<Probe>(&mut sql, DialectKind::Postgres.def());
        assert_eq!(sql, "\"name\"");
    }

    #[test]
    fn pk_and_returning_suffix() {
        let mut sql = String::new();
        push_pk::<Probe>(&mut sql, DialectKind::MySql.def()).unwrap();
        assert_eq!(sql, "`id`");

        let mut sql = String::from("INSERT INTO \"probes\" (\"name\") VALUES ($1)");
        push_returning_id::<Probe>(&mut sql, DialectKind::Postgres.def()).unwrap();
        assert!(sql.ends_with(" RETURNING \"id\""));

        let mut sql = String::from("INSERT INTO \"probes\" (\"name\") VALUES (?)");
        push_returning_id::<Probe>(&mut sql, DialectKind::Sqlite.def()).unwrap();
        assert!(sql.ends_with("VALUES (?)"));
    }

    #[test]
    fn expand_limit_none_strips_trailing_space() {
        let mut sql = "SELECT x FROM t ".to_string();
        expand_limit_offset(&mut sql, DialectKind::Sqlite.def(), None, None).unwrap();
        assert_eq!(sql, "SELECT x FROM t");
    }

    #[test]
    fn expand_limit_appends_single_clause() {
        let mut sql = "SELECT x FROM t ".to_string();
        expand_limit_offset(&mut sql, DialectKind::Sqlite.def(), Some(5), None).unwrap();
        assert_eq!(sql, "SELECT x FROM t LIMIT 5");
    }

    #[test]
    fn expand_limit_zero_is_emitted() {
        let mut sql = "SELECT x FROM t".to_string();
        expand_limit_offset(&mut sql, DialectKind::Sqlite.def(), Some(0), None).unwrap();
        assert_eq!(sql, "SELECT x FROM t LIMIT 0");
    }

    #[test]
    fn expand_top_injects_after_select() {
        let legacy = DialectDef {
            limit_syntax: crate::dialect::LimitSyntax::TopN,
            ..*DialectKind::SqlServer.def()
        };
        let mut sql = "SELECT [x] FROM [t]".to_string();
        expand_limit_offset(&mut sql, &legacy, Some(5), None).unwrap();
        assert_eq!(sql, "SELECT TOP (5) [x] FROM [t]");
    }

    #[test]
    fn expand_offset_fetch() {
        let mut sql = "SELECT [x] FROM [t] ORDER BY [x]".to_string();
        expand_limit_offset(&mut sql, DialectKind::SqlServer.def(), Some(5), Some(10)).unwrap();
        assert_eq!(
            sql,
            "SELECT [x] FROM [t] ORDER BY [x] OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn dynamic_ident_accepts_plain_names() {
        let d = DialectKind::Postgres.def();
        assert_eq!(quote_dynamic_ident(d, "status").unwrap(), "\"status\"");
        assert_eq!(quote_dynamic_ident(d, "_private2").unwrap(), "\"_private2\"");
    }

    #[test]
    fn dynamic_ident_rejects_injection() {
        let d = DialectKind::Postgres.def();
        for bad in [
            "status'; DROP TABLE users --",
            "a;b",
            "a--b",
            "a/*b*/",
            "1abc",
            "",
            "a b",
            "drop",
            "DELETE",
        ] {
            assert!(
                matches!(quote_dynamic_ident(d, bad), Err(RepoError::UnsafeIdentifier(_))),
                "`{bad}` should be rejected"
            );
        }
    }

    #[test]
    fn collection_expansion_positional() {
        let d = DialectKind::Sqlite.def();
        assert_eq!(expand_collection(d, "ids", 3, 1), "?, ?, ?");
    }

    #[test]
    fn collection_expansion_indexed_respects_start() {
        let d = DialectKind::Postgres.def();
        assert_eq!(expand_collection(d, "ids", 3, 2), "$2, $3, $4");
    }

    #[test]
    fn collection_expansion_named() {
        let d = DialectKind::SqlServer.def();
        assert_eq!(expand_collection(d, "ids", 2, 1), "@ids_0, @ids_1");
    }

    #[test]
    fn empty_collection_renders_null() {
        let d = DialectKind::Postgres.def();
        assert_eq!(expand_collection(d, "ids", 0, 1), "NULL");
    }

    #[test]
    fn batch_values_tuples() {
        let d = DialectKind::Postgres.def();
        assert_eq!(
            expand_batch_values(d, 2, 3, 1),
            "($1, $2), ($3, $4), ($5, $6)"
        );
        let d = DialectKind::Sqlite.def();
        assert_eq!(expand_batch_values(d, 2, 2, 1), "(?, ?), (?, ?)");
    }

    #[test]
    fn scalar_to_id_accepts_numeric() {
        assert_eq!(scalar_to_id(SqlValue::Int(7)).unwrap(), 7);
        assert_eq!(scalar_to_id(SqlValue::Float(7.0)).unwrap(), 7);
        assert!(matches!(
            scalar_to_id(SqlValue::Null),
            Err(RepoError::NullScalar)
        ));
    }

    #[tokio::test]
    async fn run_cancellable_without_token() {
        let result = run_cancellable(None, async { Ok::<_, RepoError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_cancellable_pre_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_cancellable(Some(&token), async {
            Ok::<_, RepoError>(1)
        })
        .await;
        assert!(matches!(result, Err(RepoError::Cancelled)));
    }
}
