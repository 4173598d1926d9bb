// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The closed registry of database dialect descriptors.
//!
//! Dialects are modeled as a tagged enum mapped to immutable capability
//! records, not an inheritance hierarchy: [`DialectKind`] is the tag,
//! [`DialectDef`] the record. The registry is created once at compile time
//! and read-only thereafter.
//!
//! | dialect | params | quoting | booleans | limit | insert id |
//! |---------|--------|---------|----------|-------|-----------|
//! | SQLite | `?` | `"x"` | `1` / `0` | LIMIT/OFFSET | `last_insert_rowid()` |
//! | MySQL | `?` | `` `x` `` | `1` / `0` | LIMIT/OFFSET | `LAST_INSERT_ID()` |
//! | PostgreSQL | `$1` | `"x"` | `true` / `false` | LIMIT/OFFSET | `RETURNING` |
//! | SQL Server | `@name` | `[x]` | `1` / `0` | OFFSET/FETCH | `SCOPE_IDENTITY()` |
//! | Oracle | `:name` | `"x"` | `1` / `0` | OFFSET/FETCH | `RETURNING` |

use crate::error::RepoError;

/// Tag identifying one of the supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DialectKind {
    /// SQLite.
    Sqlite,

    /// MySQL / MariaDB.
    MySql,

    /// PostgreSQL.
    #[default]
    Postgres,

    /// Microsoft SQL Server.
    SqlServer,

    /// Oracle Database.
    Oracle,
}

/// Parameter reference style of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// Anonymous positional markers: `?`.
    Positional,

    /// 1-based indexed markers: `$1`, `$2`, ...
    Indexed(char),

    /// Named markers: `@name` or `:name`.
    Named(char),
}

/// LIMIT/OFFSET surface syntax of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSyntax {
    /// `LIMIT x [OFFSET y]`.
    LimitOffset,

    /// `TOP (x)` injected after SELECT; no offset support.
    TopN,

    /// `OFFSET y ROWS FETCH NEXT x ROWS ONLY`; requires ORDER BY.
    OffsetFetch,
}

/// How a dialect hands back the auto-increment key of an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningMode {
    /// A follow-up statement reads the connection-scoped last insert id
    /// (SQLite `last_insert_rowid()`, MySQL `LAST_INSERT_ID()`).
    LastInsertRowId,

    /// A `RETURNING <pk>` suffix on the INSERT itself.
    Returning,

    /// An `OUTPUT INSERTED.<pk>` clause inside the INSERT.
    OutputInserted,

    /// A follow-up `SELECT SCOPE_IDENTITY()` statement.
    ScopeIdentity,
}

/// Which row of a multi-row INSERT the dialect's last-insert-id reflects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchIdAnchor {
    /// The reported id belongs to the first inserted row (MySQL).
    FirstRow,

    /// The reported id belongs to the last inserted row (SQLite).
    LastRow,
}

/// TRUNCATE capability of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateFallback {
    /// `TRUNCATE TABLE <t>`.
    TruncateTable,

    /// `DELETE FROM <t>` where TRUNCATE does not exist.
    DeleteFrom,
}

/// Rendered LIMIT/OFFSET clause, positioned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitClause {
    /// Nothing to emit.
    None,

    /// Append at the end of the statement (including the leading keyword,
    /// excluding surrounding whitespace).
    Trailing(String),

    /// Inject directly after the leading `SELECT` keyword.
    TopAfterSelect(String),
}

/// Immutable descriptor of one dialect's syntactic conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectDef {
    /// The tag this record belongs to.
    pub kind: DialectKind,

    /// Parameter marker style.
    pub param_style: ParamStyle,

    /// Opening identifier quote.
    pub ident_open: char,

    /// Closing identifier quote.
    pub ident_close: char,

    /// Boolean TRUE literal.
    pub bool_true: &'static str,

    /// Boolean FALSE literal.
    pub bool_false: &'static str,

    /// LIMIT/OFFSET surface syntax.
    pub limit_syntax: LimitSyntax,

    /// Insert-id retrieval strategy.
    pub returning: ReturningMode,

    /// Follow-up statement for [`ReturningMode::LastInsertRowId`] and
    /// [`ReturningMode::ScopeIdentity`]; empty otherwise.
    pub insert_id_query: &'static str,

    /// Which row a batch's last-insert-id anchors to.
    pub batch_id_anchor: BatchIdAnchor,

    /// Current-timestamp expression.
    pub current_timestamp: &'static str,

    /// TRUNCATE capability.
    pub truncate: TruncateFallback,

    /// Text before the table name in the ANALYZE statement.
    pub analyze_prefix: &'static str,

    /// Text after the table name in the ANALYZE statement.
    pub analyze_suffix: &'static str,

    /// `ESCAPE` clause appended to LIKE comparisons, in this dialect's
    /// string-literal syntax.
    pub like_escape: &'static str,
}

const SQLITE: DialectDef = DialectDef {
    kind: DialectKind::Sqlite,
    param_style: ParamStyle::Positional,
    ident_open: '"',
    ident_close: '"',
    bool_true: "1",
    bool_false: "0",
    limit_syntax: LimitSyntax::LimitOffset,
    returning: ReturningMode::LastInsertRowId,
    insert_id_query: "SELECT last_insert_rowid()",
    batch_id_anchor: BatchIdAnchor::LastRow,
    current_timestamp: "CURRENT_TIMESTAMP",
    truncate: TruncateFallback::DeleteFrom,
    analyze_prefix: "ANALYZE ",
    analyze_suffix: "",
    like_escape: " ESCAPE '\\'",
};

const MYSQL: DialectDef = DialectDef {
    kind: DialectKind::MySql,
    param_style: ParamStyle::Positional,
    ident_open: '`',
    ident_close: '`',
    bool_true: "1",
    bool_false: "0",
    limit_syntax: LimitSyntax::LimitOffset,
    returning: ReturningMode::LastInsertRowId,
    insert_id_query: "SELECT LAST_INSERT_ID()",
    batch_id_anchor: BatchIdAnchor::FirstRow,
    current_timestamp: "NOW()",
    truncate: TruncateFallback::TruncateTable,
    analyze_prefix: "ANALYZE TABLE ",
    analyze_suffix: "",
    // Backslash doubles inside MySQL string literals.
    like_escape: " ESCAPE '\\\\'",
};

const POSTGRES: DialectDef = DialectDef {
    kind: DialectKind::Postgres,
    param_style: ParamStyle::Indexed('$'),
    ident_open: '"',
    ident_close: '"',
    bool_true: "true",
    bool_false: "false",
    limit_syntax: LimitSyntax::LimitOffset,
    returning: ReturningMode::Returning,
    insert_id_query: "",
    batch_id_anchor: BatchIdAnchor::FirstRow,
    current_timestamp: "NOW()",
    truncate: TruncateFallback::TruncateTable,
    analyze_prefix: "ANALYZE ",
    analyze_suffix: "",
    like_escape: " ESCAPE '\\'",
};

const SQLSERVER: DialectDef = DialectDef {
    kind: DialectKind::SqlServer,
    param_style: ParamStyle::Named('@'),
    ident_open: '[',
    ident_close: ']',
    bool_true: "1",
    bool_false: "0",
    limit_syntax: LimitSyntax::OffsetFetch,
    returning: ReturningMode::ScopeIdentity,
    insert_id_query: "SELECT SCOPE_IDENTITY()",
    batch_id_anchor: BatchIdAnchor::FirstRow,
    current_timestamp: "GETDATE()",
    truncate: TruncateFallback::TruncateTable,
    analyze_prefix: "UPDATE STATISTICS ",
    analyze_suffix: "",
    like_escape: " ESCAPE '\\'",
};

const ORACLE: DialectDef = DialectDef {
    kind: DialectKind::Oracle,
    param_style: ParamStyle::Named(':'),
    ident_open: '"',
    ident_close: '"',
    bool_true: "1",
    bool_false: "0",
    limit_syntax: LimitSyntax::OffsetFetch,
    returning: ReturningMode::Returning,
    insert_id_query: "",
    batch_id_anchor: BatchIdAnchor::FirstRow,
    current_timestamp: "SYSTIMESTAMP",
    truncate: TruncateFallback::TruncateTable,
    analyze_prefix: "ANALYZE TABLE ",
    analyze_suffix: " COMPUTE STATISTICS",
    like_escape: " ESCAPE '\\'",
};

/// Named LIMIT presets resolved by `{{limit:<preset>}}`.
///
/// Repositories may extend or override these with `limit_presets(...)`.
pub const LIMIT_PRESETS: &[(&str, i64)] = &[
    ("tiny", 5),
    ("small", 10),
    ("medium", 50),
    ("large", 100),
    ("page", 20),
    ("distinct", 1000),
];

/// Identifier keywords never accepted from dynamic input.
const DANGEROUS_IDENTIFIERS: &[&str] = &[
    "drop", "insert", "update", "delete", "alter", "exec", "execute", "truncate",
];

/// Whether raw text passes the dynamic-identifier whitelist:
/// `[A-Za-z_][A-Za-z0-9_]*` minus a keyword blacklist.
///
/// Dynamic identifiers are inlined into SQL, never bound, so this check
/// is the whole defense. Applied at generation time for literal
/// identifiers and at run time for identifier-valued parameters.
#[must_use]
pub fn is_safe_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    valid && !DANGEROUS_IDENTIFIERS.contains(&raw.to_ascii_lowercase().as_str())
}

/// Look up a built-in limit preset.
#[must_use]
pub fn limit_preset(name: &str) -> Option<i64> {
    LIMIT_PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, value)| *value)
}

impl DialectKind {
    /// All registry tags, in declaration order.
    pub const ALL: [DialectKind; 5] = [
        DialectKind::Sqlite,
        DialectKind::MySql,
        DialectKind::Postgres,
        DialectKind::SqlServer,
        DialectKind::Oracle,
    ];

    /// The descriptor record for this tag.
    #[must_use]
    pub const fn def(self) -> &'static DialectDef {
        match self {
            Self::Sqlite => &SQLITE,
            Self::MySql => &MYSQL,
            Self::Postgres => &POSTGRES,
            Self::SqlServer => &SQLSERVER,
            Self::Oracle => &ORACLE,
        }
    }

    /// Canonical lowercase name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
        }
    }

    /// Parse a dialect tag, accepting common aliases.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "sqlserver" | "mssql" => Some(Self::SqlServer),
            "oracle" => Some(Self::Oracle),
            _ => None,
        }
    }
}

impl DialectDef {
    /// Quote an identifier, doubling any embedded closing quote.
    #[must_use]
    pub fn quote_ident(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        out.push(self.ident_open);
        for ch in name.chars() {
            out.push(ch);
            if ch == self.ident_close {
                out.push(ch);
            }
        }
        out.push(self.ident_close);
        out
    }

    /// Render a parameter reference.
    ///
    /// `index` is the 1-based position of the slot within the statement;
    /// positional and indexed styles use it, named styles use `name`.
    #[must_use]
    pub fn param_ref(&self, name: &str, index: usize) -> String {
        match self.param_style {
            ParamStyle::Positional => "?".to_string(),
            ParamStyle::Indexed(prefix) => format!("{prefix}{index}"),
            ParamStyle::Named(prefix) => format!("{prefix}{name}"),
        }
    }

    /// Render a boolean literal.
    #[must_use]
    pub const fn render_bool(&self, value: bool) -> &'static str {
        if value { self.bool_true } else { self.bool_false }
    }

    /// Render the LIMIT/OFFSET clause for this dialect.
    ///
    /// Returns [`LimitClause::None`] when both inputs are absent. A bare
    /// offset is papered over with the dialect's sentinel where the syntax
    /// demands a limit; `TopN` cannot express an offset at all and fails
    /// with [`RepoError::Unsupported`].
    pub fn render_limit_offset(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<LimitClause, RepoError> {
        match (self.limit_syntax, limit, offset) {
            (_, None, None) => Ok(LimitClause::None),
            (LimitSyntax::LimitOffset, Some(l), None) => Ok(LimitClause::Trailing(format!(
                "LIMIT {l}"
            ))),
            (LimitSyntax::LimitOffset, Some(l), Some(o)) => Ok(LimitClause::Trailing(format!(
                "LIMIT {l} OFFSET {o}"
            ))),
            (LimitSyntax::LimitOffset, None, Some(o)) => {
                let clause = match self.kind {
                    // Bare OFFSET is valid PostgreSQL.
                    DialectKind::Postgres => format!("OFFSET {o}"),
                    // SQLite requires a LIMIT before OFFSET; -1 means all.
                    DialectKind::Sqlite => format!("LIMIT -1 OFFSET {o}"),
                    // MySQL's documented all-rows sentinel.
                    _ => format!("LIMIT 18446744073709551615 OFFSET {o}"),
                };
                Ok(LimitClause::Trailing(clause))
            }
            (LimitSyntax::TopN, Some(l), None) => {
                Ok(LimitClause::TopAfterSelect(format!("TOP ({l})")))
            }
            (LimitSyntax::TopN, _, Some(_)) => Err(RepoError::Unsupported(
                "TOP-style dialects cannot express OFFSET".to_string(),
            )),
            (LimitSyntax::OffsetFetch, Some(l), o) => Ok(LimitClause::Trailing(format!(
                "OFFSET {} ROWS FETCH NEXT {l} ROWS ONLY",
                o.unwrap_or(0)
            ))),
            (LimitSyntax::OffsetFetch, None, Some(o)) => {
                Ok(LimitClause::Trailing(format!("OFFSET {o} ROWS")))
            }
        }
    }

    /// Suffix appended to an INSERT when the dialect retrieves generated
    /// keys in-statement; empty otherwise.
    #[must_use]
    pub fn insert_id_suffix(&self, pk_column: &str) -> String {
        match self.returning {
            ReturningMode::Returning => format!(" RETURNING {}", self.quote_ident(pk_column)),
            ReturningMode::OutputInserted
            | ReturningMode::LastInsertRowId
            | ReturningMode::ScopeIdentity => String::new(),
        }
    }

    /// True when generated-id retrieval needs a follow-up statement.
    #[must_use]
    pub const fn needs_insert_id_query(&self) -> bool {
        matches!(
            self.returning,
            ReturningMode::LastInsertRowId | ReturningMode::ScopeIdentity
        )
    }

    /// TRUNCATE statement, or the DELETE fallback where TRUNCATE does not
    /// exist.
    #[must_use]
    pub fn truncate_or_delete(&self, table: &str) -> String {
        match self.truncate {
            TruncateFallback::TruncateTable => {
                format!("TRUNCATE TABLE {}", self.quote_ident(table))
            }
            TruncateFallback::DeleteFrom => format!("DELETE FROM {}", self.quote_ident(table)),
        }
    }

    /// ANALYZE statement for this dialect.
    #[must_use]
    pub fn analyze(&self, table: &str) -> String {
        format!(
            "{}{}{}",
            self.analyze_prefix,
            self.quote_ident(table),
            self.analyze_suffix
        )
    }

    /// Current-timestamp expression.
    #[must_use]
    pub const fn current_timestamp_expr(&self) -> &'static str {
        self.current_timestamp
    }
}
