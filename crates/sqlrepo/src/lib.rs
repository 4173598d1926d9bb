// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use sqlrepo_core::{
    ColumnDef, DialectDef, DialectKind, DynamicRow, Entity, ExprToSql, Page, Predicate,
    RepoError, SetList, SqlFragment, SqlIdent, SqlRepository, SqlValue, async_trait, col,
    dialect, entity, error, expr, param, row, runtime, sqlx, val, value,
};
pub use sqlrepo_core::runtime::CancellationToken;
pub use sqlrepo_impl::{SqlEntity, repository};

/// Convenient re-exports: types, builder functions, and both macros.
pub mod prelude {
    pub use sqlrepo_core::prelude::*;
    pub use sqlrepo_impl::{SqlEntity, repository};
}
