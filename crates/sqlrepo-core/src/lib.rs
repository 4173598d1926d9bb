// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Core types and runtime support for sqlrepo.
//!
//! This crate provides everything sqlrepo-generated code calls into at
//! run time, plus the pure SQL rendering layer shared with the generator:
//!
//! - [`dialect`] — the closed registry of database dialect descriptors
//! - [`expr`] — the expression builder DSL and its SQL renderer
//! - [`value`] — the [`SqlValue`] runtime value union
//! - [`entity`] — the [`Entity`] trait implemented by `#[derive(SqlEntity)]`
//! - [`runtime`] — placeholder expanders, parameter binding, materializers
//!   (behind the default `runtime` feature)
//!
//! Most users should use `sqlrepo` directly, which re-exports this crate.
//! The generator crate consumes the rendering layer with
//! `default-features = false`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod dialect;
pub mod entity;
pub mod error;
pub mod expr;
pub mod prelude;
pub mod row;
pub mod value;

#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub mod runtime;

/// Re-export async_trait for generated repository traits.
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use async_trait::async_trait;
/// Re-export sqlx for generated row-materialization code.
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use sqlx;
pub use dialect::{DialectDef, DialectKind, LimitSyntax, ReturningMode, TruncateFallback};
pub use entity::{ColumnDef, Entity};
pub use error::RepoError;
pub use expr::{ExprToSql, Predicate, SetList, col, param, val};
pub use row::DynamicRow;
#[cfg(feature = "runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "runtime")))]
pub use runtime::SqlRepository;
pub use value::SqlValue;

/// A page of query results together with paging bookkeeping.
///
/// Produced by the paged result recipe: the generated method runs a COUNT
/// statement followed by the page SELECT and derives `total_pages` from the
/// two inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows of the requested page, at most `page_size` of them.
    pub items: Vec<T>,

    /// Total row count of the unpaged query.
    pub total_count: i64,

    /// 1-based page number the caller asked for.
    pub page_number: i64,

    /// Requested page size.
    pub page_size: i64,

    /// `ceil(total_count / page_size)`; zero when `page_size` is zero.
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page, deriving `total_pages`.
    pub fn new(items: Vec<T>, total_count: i64, page_number: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            items,
            total_count,
            page_number,
            page_size,
            total_pages,
        }
    }

    /// True when the page holds no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map the page's items, keeping the paging bookkeeping.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// A dynamic SQL identifier supplied at call time.
///
/// Identifier parameters are never bound as SQL parameters. The runtime
/// validates the raw text against the identifier whitelist and inlines it
/// with dialect quoting; anything else fails with
/// [`RepoError::UnsafeIdentifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlIdent(String);

impl SqlIdent {
    /// Wrap a raw identifier. Validation happens at use, not construction.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw, unvalidated identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SqlIdent {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SqlIdent {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// A raw SQL fragment inlined verbatim into the statement.
///
/// Dangerous by construction: no quoting, no validation. Meant for
/// whole-statement passthrough methods only; never feed it user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFragment(String);

impl SqlFragment {
    /// Wrap raw SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The raw SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SqlFragment {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for SqlFragment {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
