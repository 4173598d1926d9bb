// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Host model: the structural description of one repository interface the
//! synthesizer consumes.
//!
//! Built by [`super::parse`] from the annotated trait; predefined shape
//! methods are appended to the trait before parsing, so by the time a
//! [`MethodSpec`] exists the pipeline no longer distinguishes user-written
//! from predefined methods.

use proc_macro2::Span;
use sqlrepo_core::dialect::{DialectKind, limit_preset};
use syn::{Ident, Path, Signature, Type};

/// Role of one method parameter, inferred from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Plain value bound as a SQL parameter.
    Normal,

    /// The repository's entity type, by value.
    Entity,

    /// `Vec<Entity>`: rows of a batch operation.
    EntityList,

    /// A scalar collection expanded into an IN list.
    Collection,

    /// Cooperative cancellation token.
    Cancellation,

    /// Expression-tree predicate.
    Predicate,

    /// Expression-tree assignment list.
    SetList,

    /// Dynamic SQL identifier, validated and inlined.
    DynamicIdent,

    /// Dynamic SQL fragment, inlined verbatim.
    DynamicFragment,
}

/// One method parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub ident: Ident,

    /// Declared type.
    pub ty: Type,

    /// Inferred role.
    pub role: ParamRole,

    /// True for `Option<T>` parameters.
    pub nullable: bool,
}

/// Scalar kinds a method can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarReturn {
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `f64`
    F64,
    /// `bool`
    Bool,
    /// `String`
    Text,
}

/// The result recipe implied by a method's declared return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// `Result<u64>`: affected-row count.
    RowsAffected,

    /// `Result<()>`: execute and discard.
    Unit,

    /// `Result<T>` or `Result<Option<T>>` for a scalar `T`.
    Scalar {
        /// The scalar kind.
        kind: ScalarReturn,
        /// True for `Option<T>`.
        nullable: bool,
    },

    /// `Result<SqlValue>`: dynamically typed scalar.
    ScalarValue,

    /// `Result<Vec<SqlValue>>`: first column of every row.
    ScalarList,

    /// `Result<Vec<i64>>`: generated keys of a batch INSERT.
    IdList,

    /// `Result<Option<Entity>>`.
    Optional,

    /// `Result<Vec<Entity>>`.
    List,

    /// `Result<Page<Entity>>`.
    Page,

    /// `Result<Entity>` on an INSERT: assign the generated key, return
    /// the entity.
    EntityWithId,

    /// `Result<i64>` with `#[returning_id]`.
    GeneratedId,

    /// `Result<Vec<DynamicRow>>`.
    DynamicRows,
}

/// One method of the interface, fully described.
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// Cleaned signature, re-emitted verbatim in trait and impl.
    pub sig: Signature,

    /// Span for diagnostics.
    pub span: Span,

    /// Resolved SQL template text.
    pub template: String,

    /// `#[returning_id]` present.
    pub returning_id: bool,

    /// `#[order_by("...")]` column.
    pub order_by: Option<String>,

    /// `#[single]`: optional result errors on multiple rows.
    pub single: bool,

    /// Parameters, excluding the receiver.
    pub params: Vec<ParamSpec>,

    /// Planned result shape.
    pub ret: ReturnShape,
}

impl MethodSpec {
    /// Method name.
    pub fn name(&self) -> String {
        self.sig.ident.to_string()
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.ident == name)
    }

    /// The cancellation-token parameter, when declared.
    pub fn cancellation(&self) -> Option<&ParamSpec> {
        self.params
            .iter()
            .find(|p| p.role == ParamRole::Cancellation)
    }

    /// The entity-valued parameter, when declared.
    pub fn entity_param(&self) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.role == ParamRole::Entity)
    }

    /// The batch-rows parameter, when declared.
    pub fn entity_list_param(&self) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.role == ParamRole::EntityList)
    }
}

/// One repository interface plus its configuration.
#[derive(Debug)]
pub struct RepoSpec {
    /// Trait identifier.
    pub trait_ident: Ident,

    /// Entity type path.
    pub entity: Path,

    /// Table-name override; defaults to the entity's table.
    pub table: Option<String>,

    /// Selected dialect.
    pub dialect: DialectKind,

    /// Upper bound on rows per batch INSERT statement.
    pub max_batch_size: usize,

    /// Repository-level preset additions and overrides.
    pub presets: Vec<(String, i64)>,

    /// Methods in declaration order.
    pub methods: Vec<MethodSpec>,
}

impl RepoSpec {
    /// Resolve a limit preset: repository overrides first, then the
    /// built-in table.
    pub fn preset(&self, name: &str) -> Option<i64> {
        self.presets
            .iter()
            .find(|(preset, _)| preset == name)
            .map(|(_, value)| *value)
            .or_else(|| limit_preset(name))
    }

    /// `Trait::method` location text for diagnostics.
    pub fn location(&self, method: &MethodSpec) -> String {
        format!("{}::{}", self.trait_ident, method.name())
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_quote;

    use super::*;

    fn sample_method() -> MethodSpec {
        MethodSpec {
            sig: parse_quote! { async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> },
            span: Span::call_site(),
            template: "SELECT {{columns}} FROM {{table}} WHERE {{pk}} = @id".into(),
            returning_id: false,
            order_by: None,
            single: false,
            params: vec![ParamSpec {
                ident: parse_quote!(id),
                ty: parse_quote!(i64),
                role: ParamRole::Normal,
                nullable: false,
            }],
            ret: ReturnShape::Optional,
        }
    }

    #[test]
    fn method_lookup_helpers() {
        let m = sample_method();
        assert_eq!(m.name(), "get_by_id");
        assert!(m.param("id").is_some());
        assert!(m.param("nope").is_none());
        assert!(m.cancellation().is_none());
    }

    #[test]
    fn presets_prefer_repository_overrides() {
        let repo = RepoSpec {
            trait_ident: parse_quote!(UserRepo),
            entity: parse_quote!(User),
            table: None,
            dialect: DialectKind::Sqlite,
            max_batch_size: 100,
            presets: vec![("small".into(), 7), ("mine".into(), 42)],
            methods: vec![],
        };
        assert_eq!(repo.preset("small"), Some(7));
        assert_eq!(repo.preset("mine"), Some(42));
        assert_eq!(repo.preset("large"), Some(100));
        assert_eq!(repo.preset("missing"), None);
    }

    #[test]
    fn location_text() {
        let repo = RepoSpec {
            trait_ident: parse_quote!(UserRepo),
            entity: parse_quote!(User),
            table: None,
            dialect: DialectKind::Postgres,
            max_batch_size: 100,
            presets: vec![],
            methods: vec![],
        };
        assert_eq!(repo.location(&sample_method()), "UserRepo::get_by_id");
    }
}
