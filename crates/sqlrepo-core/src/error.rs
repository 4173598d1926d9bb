// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Runtime error type raised by generated repository code.
//!
//! Policy: mapping and binding failures are fatal to the call and never
//! swallowed; driver errors pass through with their original category
//! preserved; connection loss is classified as [`RepoError::Transient`];
//! cancellation is cooperative and surfaces as [`RepoError::Cancelled`].

use thiserror::Error;

/// Error raised by generated repository methods and the runtime shim.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A scalar query returned SQL NULL but the declared result is
    /// non-nullable.
    #[error("scalar query returned NULL for a non-nullable result")]
    NullScalar,

    /// A single-row query matched more than one row.
    #[error("query expected at most one row but matched several")]
    MultipleRowsForOptional,

    /// The in-flight database operation was cancelled through the
    /// caller-supplied token.
    #[error("operation cancelled")]
    Cancelled,

    /// A dynamic identifier failed the whitelist check.
    #[error("unsafe dynamic identifier `{0}`")]
    UnsafeIdentifier(String),

    /// An expression value was supplied for a placeholder name that does
    /// not occur in the predicate.
    #[error("unknown expression parameter `{name}`; available: {available:?}")]
    UnknownParameter {
        /// The name the caller tried to fill.
        name: String,
        /// Placeholder names the predicate actually declares.
        available: Vec<String>,
    },

    /// A named expression placeholder was never given a value.
    #[error("expression parameter `{0}` was never bound to a value")]
    UnboundParameter(String),

    /// An expression referenced a column the entity does not declare.
    #[error("unknown column `{0}` in expression")]
    UnknownColumn(String),

    /// The requested combination cannot be rendered for this dialect.
    #[error("unsupported for this dialect: {0}")]
    Unsupported(String),

    /// A row value could not be converted to the declared Rust type.
    #[error("row mapping failed: {0}")]
    Mapping(String),

    /// The connection was closed, broken, or timed out underneath the call.
    #[cfg(feature = "runtime")]
    #[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
    #[error("transient database error")]
    Transient(#[source] sqlx::Error),

    /// Any other driver error, passed through unchanged.
    #[cfg(feature = "runtime")]
    #[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

#[cfg(feature = "runtime")]
impl RepoError {
    /// Classify a driver error.
    ///
    /// Connection-level failures become [`RepoError::Transient`], decode
    /// failures become [`RepoError::Mapping`], everything else passes
    /// through as [`RepoError::Database`]. There is deliberately no `From`
    /// impl so call sites cannot skip classification with `?`.
    pub fn from_db(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Transient(err),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => Self::Mapping(err.to_string()),
            other => Self::Database(other),
        }
    }
}
