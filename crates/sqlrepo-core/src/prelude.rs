// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for repository consumers.
//!
//! ```rust,ignore
//! use sqlrepo_core::prelude::*;
//! ```

pub use crate::{
    Page, SqlFragment, SqlIdent,
    dialect::{DialectDef, DialectKind},
    entity::{ColumnDef, Entity},
    error::RepoError,
    expr::{ExprToSql, Predicate, SetList, col, param, val},
    row::DynamicRow,
    value::SqlValue,
};

#[cfg(feature = "runtime")]
pub use crate::{
    async_trait,
    runtime::{CancellationToken, SqlRepository},
};
