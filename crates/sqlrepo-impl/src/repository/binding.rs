// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Binding planner: resolves lexed template segments against the method's
//! parameters and the repository configuration, producing the ordered
//! render plan the synthesizer walks.
//!
//! The plan preserves textual order, which is what makes the slot-order
//! invariant hold: parameters are bound in the order of their first
//! occurrence in the rendered SQL.

use sqlrepo_core::dialect::{LimitSyntax, is_safe_identifier};

use super::{
    diagnostics::{Diagnostic, DiagnosticKind},
    model::{MethodSpec, ParamRole, RepoSpec, ReturnShape},
    template::{LimitArg, OffsetArg, Placeholder, Segment},
};

/// Where a limit value comes from at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitSource {
    /// No limit.
    None,

    /// A method parameter, possibly `Option<i64>`.
    Param {
        /// Parameter name.
        name: String,
        /// True when the parameter is `Option<i64>`.
        nullable: bool,
    },

    /// A preset constant, resolved at generation time.
    Preset(i64),

    /// `page_size`, for the paged recipe.
    PageSize,
}

/// Where an offset value comes from at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetSource {
    /// No offset.
    None,

    /// A method parameter, possibly `Option<i64>`.
    Param {
        /// Parameter name.
        name: String,
        /// True when the parameter is `Option<i64>`.
        nullable: bool,
    },

    /// `(page_number - 1) * page_size`, for the paged recipe.
    PageOffset,
}

/// One step of the render plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStep {
    /// Literal SQL text.
    Lit(String),

    /// The repository's table name, quoted.
    Table,

    /// Column list; `insert` selects the insertable subset.
    Columns {
        /// True inside INSERT templates.
        insert: bool,
    },

    /// The primary-key column, quoted.
    Pk,

    /// `ORDER BY <pk>`, synthesized for OFFSET/FETCH dialects.
    OrderByPk,

    /// Bind one method parameter.
    Param {
        /// Parameter name.
        name: String,
    },

    /// Bind the entity parameter's primary-key value.
    EntityId,

    /// Expand a collection parameter into IN-list slots.
    Collection {
        /// Parameter name.
        name: String,
    },

    /// Emit the dialect's LIMIT/OFFSET clause.
    LimitOffset {
        /// Limit value source.
        limit: LimitSource,
        /// Offset value source.
        offset: OffsetSource,
    },

    /// Dialect boolean literal.
    Bool(bool),

    /// Dialect current-timestamp expression.
    CurrentTimestamp,

    /// Dialect insert-id suffix.
    ReturningId,

    /// Rendered predicate, prefixed with `WHERE `.
    Where {
        /// Predicate parameter name.
        param: String,
    },

    /// Rendered assignment list.
    SetExpr {
        /// Assignment-list parameter name.
        param: String,
    },

    /// `col = ?, ...` over the entity's insertable columns.
    SetColumns,

    /// Validated, quoted dynamic identifier.
    DynIdent {
        /// Identifier parameter name.
        param: String,
    },

    /// Verbatim SQL fragment.
    DynFragment {
        /// Fragment parameter name.
        param: String,
    },

    /// Multi-row VALUES tuples.
    BatchValues,

    /// Whole-statement TRUNCATE (or DELETE fallback).
    Truncate,

    /// Whole-statement ANALYZE.
    Analyze,
}

/// The validated render plan for one method.
#[derive(Debug)]
pub struct BindingPlan {
    /// Steps in textual order.
    pub steps: Vec<RenderStep>,

    /// True for templates that start with INSERT.
    pub is_insert: bool,

    /// True when `{{batch_values}}` consumes a `Vec<Entity>` parameter.
    pub batch: bool,
}

/// Resolve and validate one method's segments into a plan.
pub fn plan(
    repo: &RepoSpec,
    method: &MethodSpec,
    segments: &[Segment],
) -> Result<BindingPlan, Diagnostic> {
    let location = repo.location(method);
    let fail = |kind: DiagnosticKind, message: String, remediation: &str| {
        Diagnostic::new(kind, method.span, location.clone(), message, remediation)
    };

    validate_roles(method, &fail)?;

    if let Some(column) = &method.order_by {
        if !is_safe_identifier(column) {
            return Err(fail(
                DiagnosticKind::UnsafeIdentifier,
                format!("#[order_by] column `{column}` fails the identifier whitelist"),
                "use a plain column identifier",
            ));
        }
    }

    let is_insert = method
        .template
        .trim_start()
        .to_ascii_uppercase()
        .starts_with("INSERT");
    let paged = method.ret == ReturnShape::Page;
    let mut steps = Vec::with_capacity(segments.len());
    let mut batch = false;

    for segment in segments {
        let step = match segment {
            Segment::Lit(text) => RenderStep::Lit(text.clone()),
            Segment::Param(name) => resolve_param(method, name, &fail)?,
            Segment::Placeholder(placeholder) => match placeholder {
                Placeholder::Table => RenderStep::Table,
                Placeholder::Columns => RenderStep::Columns { insert: is_insert },
                Placeholder::Pk => RenderStep::Pk,
                Placeholder::Limit(arg) => RenderStep::LimitOffset {
                    limit: resolve_limit(repo, method, arg, paged, &fail)?,
                    offset: OffsetSource::None,
                },
                Placeholder::Offset(arg) => RenderStep::LimitOffset {
                    limit: LimitSource::None,
                    offset: resolve_offset(method, arg, paged, &fail)?,
                },
                Placeholder::BoolTrue => RenderStep::Bool(true),
                Placeholder::BoolFalse => RenderStep::Bool(false),
                Placeholder::CurrentTimestamp => RenderStep::CurrentTimestamp,
                Placeholder::ReturningId => RenderStep::ReturningId,
                Placeholder::Where(param) => {
                    expect_role(method, param, ParamRole::Predicate, "a Predicate", &fail)?;
                    RenderStep::Where {
                        param: param.clone(),
                    }
                }
                Placeholder::Set(param) => {
                    expect_role(method, param, ParamRole::SetList, "a SetList", &fail)?;
                    RenderStep::SetExpr {
                        param: param.clone(),
                    }
                }
                Placeholder::SetColumns => {
                    if method.entity_param().is_none() {
                        return Err(fail(
                            DiagnosticKind::UnknownPlaceholder,
                            "`{{set_columns}}` needs an entity-typed parameter".to_string(),
                            "take the entity by value, e.g. `entity: User`",
                        ));
                    }
                    RenderStep::SetColumns
                }
                Placeholder::BatchValues => {
                    if method.entity_list_param().is_some() {
                        batch = true;
                    } else if method.entity_param().is_none() {
                        return Err(fail(
                            DiagnosticKind::UnknownPlaceholder,
                            "`{{batch_values}}` needs an entity or Vec<entity> parameter"
                                .to_string(),
                            "add `items: Vec<Entity>` or `entity: Entity`",
                        ));
                    }
                    RenderStep::BatchValues
                }
                Placeholder::Truncate => RenderStep::Truncate,
                Placeholder::Analyze => RenderStep::Analyze,
                Placeholder::Custom(name) => resolve_custom(method, name, &fail)?,
            },
        };
        steps.push(step);
    }

    merge_adjacent_limit_offset(&mut steps);
    validate_offsets(repo, method, &steps, &fail)?;
    let steps = inject_order_by(repo, method, steps, &fail)?;
    validate_batch_position(&steps, &fail)?;
    validate_recipe(method, &steps, batch, is_insert, &fail)?;

    Ok(BindingPlan {
        steps,
        is_insert,
        batch,
    })
}

fn validate_roles(
    method: &MethodSpec,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<(), Diagnostic> {
    for param in &method.params {
        let positional_only = matches!(
            param.role,
            ParamRole::Predicate
                | ParamRole::SetList
                | ParamRole::DynamicIdent
                | ParamRole::DynamicFragment
                | ParamRole::Cancellation
                | ParamRole::Entity
                | ParamRole::EntityList
        );
        if positional_only && param.nullable {
            return Err(fail(
                DiagnosticKind::NonNullableDefaultNull,
                format!(
                    "parameter `{}` has a role that cannot be optional",
                    param.ident
                ),
                "drop the Option wrapper; absence has no meaning for this parameter",
            ));
        }
    }
    Ok(())
}

fn resolve_param(
    method: &MethodSpec,
    name: &str,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<RenderStep, Diagnostic> {
    if let Some(param) = method.param(name) {
        return match param.role {
            ParamRole::Normal => Ok(RenderStep::Param {
                name: name.to_string(),
            }),
            ParamRole::Collection => Ok(RenderStep::Collection {
                name: name.to_string(),
            }),
            _ => Err(fail(
                DiagnosticKind::UnknownPlaceholder,
                format!("parameter `{name}` cannot be referenced with `@{name}`"),
                "only plain values and collections bind as SQL parameters",
            )),
        };
    }
    // `@id` against an entity-valued parameter binds the entity's key.
    if name == "id" && method.entity_param().is_some() {
        return Ok(RenderStep::EntityId);
    }
    Err(fail(
        DiagnosticKind::UnknownPlaceholder,
        format!("`@{name}` matches no method parameter"),
        "declare a parameter with this name or fix the template",
    ))
}

fn resolve_custom(
    method: &MethodSpec,
    name: &str,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<RenderStep, Diagnostic> {
    match method.param(name).map(|p| p.role) {
        Some(ParamRole::DynamicFragment) => Ok(RenderStep::DynFragment {
            param: name.to_string(),
        }),
        Some(ParamRole::DynamicIdent) => Ok(RenderStep::DynIdent {
            param: name.to_string(),
        }),
        Some(_) => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("`{{{{{name}}}}}` names a parameter that is neither SqlIdent nor SqlFragment"),
            "inline expansion is reserved for SqlIdent and SqlFragment parameters",
        )),
        None => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("unknown placeholder `{{{{{name}}}}}`"),
            "see the placeholder vocabulary in the repository macro docs",
        )),
    }
}

fn resolve_limit(
    repo: &RepoSpec,
    method: &MethodSpec,
    arg: &LimitArg,
    paged: bool,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<LimitSource, Diagnostic> {
    match arg {
        LimitArg::Preset(name) => repo.preset(name).map(LimitSource::Preset).ok_or_else(|| {
            fail(
                DiagnosticKind::UnknownPlaceholder,
                format!("unknown limit preset `{name}`"),
                "declare it with limit_presets(...) or use a built-in preset",
            )
        }),
        LimitArg::Auto if paged => Ok(LimitSource::PageSize),
        LimitArg::Auto => limit_param(method, "limit", fail),
        LimitArg::Param(name) => limit_param(method, name, fail),
    }
}

fn resolve_offset(
    method: &MethodSpec,
    arg: &OffsetArg,
    paged: bool,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<OffsetSource, Diagnostic> {
    match arg {
        OffsetArg::Auto if paged => Ok(OffsetSource::PageOffset),
        OffsetArg::Auto => {
            limit_param(method, "offset", fail).map(|source| match source {
                LimitSource::Param { name, nullable } => OffsetSource::Param { name, nullable },
                _ => unreachable!("limit_param only builds Param sources"),
            })
        }
        OffsetArg::Param(name) => {
            limit_param(method, name, fail).map(|source| match source {
                LimitSource::Param { name, nullable } => OffsetSource::Param { name, nullable },
                _ => unreachable!("limit_param only builds Param sources"),
            })
        }
    }
}

fn limit_param(
    method: &MethodSpec,
    name: &str,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<LimitSource, Diagnostic> {
    use super::shape::{last_ident, single_arg};

    match method.param(name) {
        Some(param) if param.role == ParamRole::Normal => {
            let base = if param.nullable {
                single_arg(&param.ty)
            } else {
                Some(&param.ty)
            };
            let is_i64 = base.and_then(last_ident).as_deref() == Some("i64");
            if !is_i64 {
                return Err(fail(
                    DiagnosticKind::UnknownPlaceholder,
                    format!("parameter `{name}` cannot drive a limit or offset"),
                    "limit and offset parameters must be i64 or Option<i64>",
                ));
            }
            Ok(LimitSource::Param {
                name: name.to_string(),
                nullable: param.nullable,
            })
        }
        Some(_) => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("parameter `{name}` cannot drive a limit or offset"),
            "limit and offset parameters must be i64 or Option<i64>",
        )),
        None => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("no parameter `{name}` for the limit/offset placeholder"),
            "declare the parameter or use a `{{limit:<preset>}}` constant",
        )),
    }
}

fn expect_role(
    method: &MethodSpec,
    name: &str,
    role: ParamRole,
    describe: &str,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<(), Diagnostic> {
    match method.param(name) {
        Some(param) if param.role == role => Ok(()),
        Some(_) => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("parameter `{name}` is not {describe}"),
            "match the placeholder with a parameter of the right type",
        )),
        None => Err(fail(
            DiagnosticKind::UnknownPlaceholder,
            format!("no parameter `{name}` for this placeholder"),
            "declare the parameter named in the placeholder",
        )),
    }
}

/// Merge `{{limit}}` directly followed by `{{offset}}` (whitespace apart)
/// into one clause so the dialect can order them correctly.
fn merge_adjacent_limit_offset(steps: &mut Vec<RenderStep>) {
    let mut index = 0;
    while index < steps.len() {
        let is_limit_only = matches!(
            &steps[index],
            RenderStep::LimitOffset {
                limit,
                offset: OffsetSource::None
            } if *limit != LimitSource::None
        );
        if is_limit_only {
            let mut next = index + 1;
            if matches!(steps.get(next), Some(RenderStep::Lit(text)) if text.trim().is_empty()) {
                next += 1;
            }
            let next_is_offset_only = matches!(
                steps.get(next),
                Some(RenderStep::LimitOffset {
                    limit: LimitSource::None,
                    offset
                }) if *offset != OffsetSource::None
            );
            if next_is_offset_only {
                let Some(RenderStep::LimitOffset { offset, .. }) = steps.get(next).cloned() else {
                    unreachable!("checked above");
                };
                steps.drain(index + 1..=next);
                let Some(RenderStep::LimitOffset {
                    offset: slot_offset,
                    ..
                }) = steps.get_mut(index)
                else {
                    unreachable!("checked above");
                };
                *slot_offset = offset;
            }
        }
        index += 1;
    }
}

fn validate_offsets(
    repo: &RepoSpec,
    _method: &MethodSpec,
    steps: &[RenderStep],
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<(), Diagnostic> {
    let syntax = repo.dialect.def().limit_syntax;
    for step in steps {
        let RenderStep::LimitOffset { limit, offset } = step else {
            continue;
        };
        if *offset != OffsetSource::None && *limit == LimitSource::None {
            match syntax {
                LimitSyntax::TopN => {
                    return Err(fail(
                        DiagnosticKind::DialectUnsupported,
                        "this dialect cannot express OFFSET at all".to_string(),
                        "drop the {{offset}} placeholder",
                    ));
                }
                LimitSyntax::LimitOffset
                    if !matches!(
                        repo.dialect,
                        sqlrepo_core::dialect::DialectKind::Postgres
                    ) =>
                {
                    return Err(fail(
                        DiagnosticKind::OffsetRequiresLimit,
                        format!(
                            "`{{{{offset}}}}` without `{{{{limit}}}}` is invalid for dialect `{}`",
                            repo.dialect.as_str()
                        ),
                        "add a {{limit}} placeholder (a nullable limit parameter still \
                         allows unlimited queries)",
                    ));
                }
                _ => {}
            }
        }
        if *limit != LimitSource::None
            && *offset != OffsetSource::None
            && syntax == LimitSyntax::TopN
        {
            return Err(fail(
                DiagnosticKind::DialectUnsupported,
                "TOP-style dialects cannot combine limit and offset".to_string(),
                "use an OFFSET/FETCH capable dialect for pagination",
            ));
        }
    }
    Ok(())
}

/// OFFSET/FETCH dialects require ORDER BY; synthesize `ORDER BY <pk>`
/// when the template has none.
fn inject_order_by(
    repo: &RepoSpec,
    method: &MethodSpec,
    mut steps: Vec<RenderStep>,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<Vec<RenderStep>, Diagnostic> {
    if repo.dialect.def().limit_syntax != LimitSyntax::OffsetFetch {
        return Ok(steps);
    }
    let needs_limit = steps
        .iter()
        .any(|s| matches!(s, RenderStep::LimitOffset { limit, offset }
            if *limit != LimitSource::None || *offset != OffsetSource::None));
    if !needs_limit {
        return Ok(steps);
    }
    let has_order_by = method.template.to_ascii_uppercase().contains("ORDER BY");
    if has_order_by {
        return Ok(steps);
    }
    if steps
        .iter()
        .any(|s| matches!(s, RenderStep::DynFragment { .. }))
    {
        return Err(fail(
            DiagnosticKind::MissingOrderBy,
            "OFFSET/FETCH needs ORDER BY, and none can be synthesized into a raw \
             fragment"
                .to_string(),
            "add an explicit ORDER BY to the fragment or an #[order_by] attribute",
        ));
    }
    let position = steps
        .iter()
        .position(|s| matches!(s, RenderStep::LimitOffset { .. }))
        .expect("checked above");
    match &method.order_by {
        Some(column) => {
            let quoted = repo.dialect.def().quote_ident(column);
            steps.insert(position, RenderStep::Lit(format!(" ORDER BY {quoted} ")));
        }
        None => {
            steps.insert(position, RenderStep::OrderByPk);
        }
    }
    Ok(steps)
}

fn validate_batch_position(
    steps: &[RenderStep],
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<(), Diagnostic> {
    let Some(position) = steps
        .iter()
        .position(|s| matches!(s, RenderStep::BatchValues))
    else {
        return Ok(());
    };
    let tail_ok = steps[position + 1..].iter().all(|s| match s {
        RenderStep::Lit(text) => text.trim().is_empty(),
        RenderStep::ReturningId => true,
        _ => false,
    });
    if tail_ok {
        Ok(())
    } else {
        Err(fail(
            DiagnosticKind::MalformedTemplate,
            "`{{batch_values}}` must end the statement".to_string(),
            "only `{{returning_id}}` may follow the VALUES tuples",
        ))
    }
}

fn validate_recipe(
    method: &MethodSpec,
    steps: &[RenderStep],
    batch: bool,
    is_insert: bool,
    fail: &impl Fn(DiagnosticKind, String, &str) -> Diagnostic,
) -> Result<(), Diagnostic> {
    match method.ret {
        ReturnShape::EntityWithId => {
            if !is_insert || method.entity_param().is_none() {
                return Err(fail(
                    DiagnosticKind::UnsupportedReturnShape,
                    "returning the entity requires an INSERT template and an entity parameter"
                        .to_string(),
                    "use `Result<u64, RepoError>` for non-INSERT statements",
                ));
            }
        }
        ReturnShape::GeneratedId => {
            if !is_insert {
                return Err(fail(
                    DiagnosticKind::UnsupportedReturnShape,
                    "#[returning_id] only applies to INSERT templates".to_string(),
                    "drop the attribute or make the statement an INSERT",
                ));
            }
        }
        ReturnShape::IdList => {
            if !batch {
                return Err(fail(
                    DiagnosticKind::UnsupportedReturnShape,
                    "Vec<i64> is the batch-ids shape and needs `{{batch_values}}` over \
                     Vec<entity>"
                        .to_string(),
                    "use Vec<SqlValue> to read an integer column list",
                ));
            }
        }
        _ => {}
    }
    if batch
        && !matches!(
            method.ret,
            ReturnShape::IdList | ReturnShape::RowsAffected | ReturnShape::Unit
        )
    {
        return Err(fail(
            DiagnosticKind::UnsupportedReturnShape,
            "batch inserts return Vec<i64>, u64, or ()".to_string(),
            "adjust the return type of the batch method",
        ));
    }
    let _ = steps;
    Ok(())
}

#[cfg(test)]
mod tests {
    use proc_macro2::Span;
    use sqlrepo_core::dialect::DialectKind;
    use syn::parse_quote;

    use super::*;
    use crate::repository::template::tokenize;

    fn repo(dialect: DialectKind) -> RepoSpec {
        RepoSpec {
            trait_ident: parse_quote!(UserRepo),
            entity: parse_quote!(User),
            table: Some("users".into()),
            dialect,
            max_batch_size: 100,
            presets: vec![],
            methods: vec![],
        }
    }

    fn method(template: &str, params: Vec<(&str, ParamRole, bool)>, ret: ReturnShape) -> MethodSpec {
        MethodSpec {
            sig: parse_quote! { async fn m(&self) -> Result<u64, RepoError> },
            span: Span::call_site(),
            template: template.into(),
            returning_id: false,
            order_by: None,
            single: false,
            params: params
                .into_iter()
                .map(|(name, role, nullable)| super::super::model::ParamSpec {
                    ident: syn::Ident::new(name, Span::call_site()),
                    ty: if nullable {
                        parse_quote!(Option<i64>)
                    } else {
                        parse_quote!(i64)
                    },
                    role,
                    nullable,
                })
                .collect(),
            ret,
        }
    }

    fn plan_for(
        dialect: DialectKind,
        template: &str,
        params: Vec<(&str, ParamRole, bool)>,
        ret: ReturnShape,
    ) -> Result<BindingPlan, Diagnostic> {
        let repo = repo(dialect);
        let method = method(template, params, ret);
        let segments = tokenize(template).unwrap();
        plan(&repo, &method, &segments)
    }

    #[test]
    fn slots_follow_textual_order() {
        let plan = plan_for(
            DialectKind::Sqlite,
            "UPDATE {{table}} SET a = @a, b = @b WHERE {{pk}} = @id",
            vec![
                ("a", ParamRole::Normal, false),
                ("b", ParamRole::Normal, false),
                ("id", ParamRole::Normal, false),
            ],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        let bound: Vec<&str> = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                RenderStep::Param { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(bound, vec!["a", "b", "id"]);
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT {{colums}} FROM {{table}}",
            vec![],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnknownPlaceholder);
    }

    #[test]
    fn unknown_at_param_is_rejected() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t WHERE id = @missing",
            vec![],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnknownPlaceholder);
        assert!(err.message.contains("@missing"));
    }

    #[test]
    fn collection_param_becomes_expansion() {
        let plan = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t WHERE id IN (@ids)",
            vec![("ids", ParamRole::Collection, false)],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        assert!(plan
            .steps
            .iter()
            .any(|s| matches!(s, RenderStep::Collection { name } if name == "ids")));
    }

    #[test]
    fn adjacent_limit_offset_merge() {
        let plan = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t {{limit}} {{offset}}",
            vec![
                ("limit", ParamRole::Normal, true),
                ("offset", ParamRole::Normal, true),
            ],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        let merged = plan
            .steps
            .iter()
            .filter(|s| matches!(s, RenderStep::LimitOffset { .. }))
            .count();
        assert_eq!(merged, 1);
    }

    #[test]
    fn offset_alone_rejected_on_sqlite() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t {{offset}}",
            vec![("offset", ParamRole::Normal, false)],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::OffsetRequiresLimit);
    }

    #[test]
    fn offset_alone_allowed_on_postgres() {
        let plan = plan_for(
            DialectKind::Postgres,
            "SELECT 1 FROM t {{offset}}",
            vec![("offset", ParamRole::Normal, false)],
            ReturnShape::RowsAffected,
        );
        assert!(plan.is_ok());
    }

    #[test]
    fn offset_fetch_injects_order_by_pk() {
        let plan = plan_for(
            DialectKind::SqlServer,
            "SELECT {{columns}} FROM {{table}} {{limit @n}}",
            vec![("n", ParamRole::Normal, false)],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        assert!(plan.steps.iter().any(|s| matches!(s, RenderStep::OrderByPk)));
    }

    #[test]
    fn offset_fetch_keeps_existing_order_by() {
        let plan = plan_for(
            DialectKind::SqlServer,
            "SELECT {{columns}} FROM {{table}} ORDER BY {{pk}} {{limit @n}}",
            vec![("n", ParamRole::Normal, false)],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        assert!(!plan.steps.iter().any(|s| matches!(s, RenderStep::OrderByPk)));
    }

    #[test]
    fn optional_predicate_rejected() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t {{where @p}}",
            vec![("p", ParamRole::Predicate, true)],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::NonNullableDefaultNull);
    }

    #[test]
    fn batch_values_must_be_last() {
        let err = plan_for(
            DialectKind::Sqlite,
            "INSERT INTO {{table}} ({{columns}}) VALUES {{batch_values}} ON CONFLICT DO NOTHING",
            vec![("items", ParamRole::EntityList, false)],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::MalformedTemplate);
    }

    #[test]
    fn order_by_attribute_is_validated_and_quoted() {
        let repo = repo(DialectKind::SqlServer);
        let mut m = method(
            "SELECT {{columns}} FROM {{table}} {{limit @n}}",
            vec![("n", ParamRole::Normal, false)],
            ReturnShape::RowsAffected,
        );
        m.order_by = Some("created_at".into());
        let segments = tokenize(&m.template).unwrap();
        let plan = plan(&repo, &m, &segments).unwrap();
        assert!(plan.steps.iter().any(
            |s| matches!(s, RenderStep::Lit(text) if text.contains("ORDER BY [created_at]"))
        ));

        m.order_by = Some("created_at; DROP TABLE users".into());
        let err = plan_err(&repo, &m);
        assert_eq!(err.kind, DiagnosticKind::UnsafeIdentifier);
    }

    fn plan_err(repo: &RepoSpec, method: &MethodSpec) -> Diagnostic {
        let segments = tokenize(&method.template).unwrap();
        plan(repo, method, &segments).unwrap_err()
    }

    #[test]
    fn unknown_preset_rejected() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t {{limit:huge}}",
            vec![],
            ReturnShape::RowsAffected,
        )
        .unwrap_err();
        assert!(err.message.contains("huge"));
    }

    #[test]
    fn preset_resolves_to_constant() {
        let plan = plan_for(
            DialectKind::Sqlite,
            "SELECT 1 FROM t {{limit:small}}",
            vec![],
            ReturnShape::RowsAffected,
        )
        .unwrap();
        assert!(plan.steps.iter().any(|s| matches!(
            s,
            RenderStep::LimitOffset {
                limit: LimitSource::Preset(10),
                ..
            }
        )));
    }

    #[test]
    fn id_list_requires_batch() {
        let err = plan_for(
            DialectKind::Sqlite,
            "SELECT id FROM t",
            vec![],
            ReturnShape::IdList,
        )
        .unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UnsupportedReturnShape);
    }
}
