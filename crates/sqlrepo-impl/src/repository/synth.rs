// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Repository synthesizer: composes the template plan, the binding plan,
//! and the result recipe into concrete method bodies.
//!
//! Emitted bodies compose dialect-correct SQL through the runtime
//! expanders, push parameters in slot order, wire the optional
//! cancellation token into execution, and materialize per the recipe.
//! Output is deterministic: method bodies follow declaration order and
//! slot order follows first textual occurrence.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

use super::{
    binding::{self, BindingPlan, LimitSource, OffsetSource, RenderStep},
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    model::{MethodSpec, ParamRole, RepoSpec, ReturnShape, ScalarReturn},
    template,
};

/// Synthesize every method of the interface.
///
/// Returns the impl-block method items plus the diagnostics of the
/// methods that failed; failed methods emit nothing.
pub fn synthesize_impl(repo: &RepoSpec) -> (Vec<TokenStream>, Diagnostics) {
    let mut methods = Vec::with_capacity(repo.methods.len());
    let mut diagnostics = Diagnostics::new();
    for method in &repo.methods {
        match synthesize_method(repo, method) {
            Ok(tokens) => methods.push(tokens),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }
    (methods, diagnostics)
}

/// Synthesize one method: tokenize, plan, validate, render.
pub fn synthesize_method(repo: &RepoSpec, method: &MethodSpec) -> Result<TokenStream, Diagnostic> {
    let segments = template::tokenize(&method.template).map_err(|err| {
        Diagnostic::new(
            DiagnosticKind::MalformedTemplate,
            method.span,
            repo.location(method),
            err.message,
            "fix the template text",
        )
    })?;
    let plan = binding::plan(repo, method, &segments)?;

    let body = if plan.batch {
        batch_body(repo, method, &plan)?
    } else {
        statement_body(repo, method, &plan)?
    };

    let sig = &method.sig;
    Ok(quote! {
        #sig {
            #body
        }
    })
}

struct Vars {
    sql: Ident,
    params: Ident,
    index: Ident,
}

impl Vars {
    fn main() -> Self {
        Self {
            sql: format_ident!("__sql"),
            params: format_ident!("__params"),
            index: format_ident!("__index"),
        }
    }

    fn count() -> Self {
        Self {
            sql: format_ident!("__count_sql"),
            params: format_ident!("__count_params"),
            index: format_ident!("__count_index"),
        }
    }
}

fn dialect_tokens(repo: &RepoSpec) -> TokenStream {
    let variant = format_ident!("{}", format!("{:?}", repo.dialect));
    quote! { let __dialect = ::sqlrepo::DialectKind::#variant.def(); }
}

fn table_expr(repo: &RepoSpec) -> TokenStream {
    let entity = &repo.entity;
    match &repo.table {
        Some(table) => quote!(#table),
        None => quote!(<#entity as ::sqlrepo::Entity>::TABLE),
    }
}

fn token_tokens(method: &MethodSpec) -> TokenStream {
    match method.cancellation() {
        Some(param) => {
            let ident = &param.ident;
            quote! { let __token = Some(&#ident); }
        }
        None => quote! {
            let __token: ::core::option::Option<&::sqlrepo::runtime::CancellationToken> = None;
        },
    }
}

/// Whether a step advances the parameter index.
fn uses_index(step: &RenderStep) -> bool {
    matches!(
        step,
        RenderStep::Param { .. }
            | RenderStep::EntityId
            | RenderStep::Collection { .. }
            | RenderStep::Where { .. }
            | RenderStep::SetExpr { .. }
            | RenderStep::SetColumns
            | RenderStep::BatchValues
    )
}

/// Whether a step pushes parameter values.
fn pushes_params(step: &RenderStep) -> bool {
    uses_index(step)
}

/// Whether a step consults the dialect.
fn uses_dialect(step: &RenderStep) -> bool {
    !matches!(step, RenderStep::Lit(_) | RenderStep::DynFragment { .. })
}

fn declarations(steps: &[RenderStep], vars: &Vars) -> TokenStream {
    let sql = &vars.sql;
    let params = &vars.params;
    let index = &vars.index;
    let mut tokens = quote! { let mut #sql = String::new(); };
    if steps.iter().any(pushes_params) {
        tokens.extend(quote! { let mut #params: Vec<::sqlrepo::SqlValue> = Vec::new(); });
    } else {
        tokens.extend(quote! { let #params: Vec<::sqlrepo::SqlValue> = Vec::new(); });
    }
    if steps.iter().any(uses_index) {
        tokens.extend(quote! { let mut #index: usize = 1; });
    }
    tokens
}

fn statement_body(
    repo: &RepoSpec,
    method: &MethodSpec,
    plan: &BindingPlan,
) -> Result<TokenStream, Diagnostic> {
    let mut steps = plan.steps.clone();
    // Generated-key recipes need the dialect's id suffix even when the
    // template does not spell {{returning_id}}.
    let needs_suffix = matches!(
        method.ret,
        ReturnShape::GeneratedId | ReturnShape::EntityWithId
    ) && !steps.iter().any(|s| matches!(s, RenderStep::ReturningId));
    if needs_suffix {
        steps.push(RenderStep::ReturningId);
    }

    let vars = Vars::main();
    let decls = declarations(&steps, &vars);
    let stmts = steps
        .iter()
        .map(|step| step_tokens(repo, method, step, &vars))
        .collect::<Result<Vec<_>, _>>()?;
    let dialect = dialect_tokens(repo);
    let token = token_tokens(method);
    let finish = finisher(repo, method, plan)?;

    let needs_dialect = steps.iter().any(uses_dialect) || finisher_uses_dialect(method);
    let dialect = if needs_dialect {
        dialect
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        #dialect
        #token
        #decls
        #(#stmts)*
        #finish
    })
}

fn finisher_uses_dialect(method: &MethodSpec) -> bool {
    matches!(
        method.ret,
        ReturnShape::GeneratedId | ReturnShape::EntityWithId | ReturnShape::Page
    )
}

fn step_tokens(
    repo: &RepoSpec,
    method: &MethodSpec,
    step: &RenderStep,
    vars: &Vars,
) -> Result<TokenStream, Diagnostic> {
    let entity = &repo.entity;
    let sql = &vars.sql;
    let params = &vars.params;
    let index = &vars.index;

    Ok(match step {
        RenderStep::Lit(text) => quote! { #sql.push_str(#text); },
        RenderStep::Table => {
            let table = table_expr(repo);
            quote! { ::sqlrepo::runtime::push_table(&mut #sql, __dialect, #table); }
        }
        RenderStep::Columns { insert: false } => {
            quote! { ::sqlrepo::runtime::push_columns::<#entity>(&mut #sql, __dialect); }
        }
        RenderStep::Columns { insert: true } => {
            quote! { ::sqlrepo::runtime::push_insert_columns::<#entity>(&mut #sql, __dialect); }
        }
        RenderStep::Pk => {
            quote! { ::sqlrepo::runtime::push_pk::<#entity>(&mut #sql, __dialect)?; }
        }
        RenderStep::OrderByPk => quote! {
            if !#sql.ends_with(' ') {
                #sql.push(' ');
            }
            #sql.push_str("ORDER BY ");
            ::sqlrepo::runtime::push_pk::<#entity>(&mut #sql, __dialect)?;
            #sql.push(' ');
        },
        RenderStep::Param { name } => {
            let ident = format_ident!("{name}");
            quote! {
                #sql.push_str(&__dialect.param_ref(#name, #index));
                #index += 1;
                #params.push(::sqlrepo::SqlValue::from(#ident.clone()));
            }
        }
        RenderStep::EntityId => {
            let owner = entity_param_ident(method)?;
            quote! {
                #sql.push_str(&__dialect.param_ref("id", #index));
                #index += 1;
                #params.push(::sqlrepo::Entity::id_value(&#owner));
            }
        }
        RenderStep::Collection { name } => {
            let ident = format_ident!("{name}");
            quote! {
                #sql.push_str(&::sqlrepo::runtime::expand_collection(
                    __dialect,
                    #name,
                    #ident.len(),
                    #index,
                ));
                #index += #ident.len();
                #params.extend(#ident.iter().cloned().map(::sqlrepo::SqlValue::from));
            }
        }
        RenderStep::LimitOffset { limit, offset } => {
            let limit = limit_tokens(limit);
            let offset = offset_tokens(offset);
            quote! {
                {
                    let __limit: ::core::option::Option<i64> = #limit;
                    let __offset: ::core::option::Option<i64> = #offset;
                    ::sqlrepo::runtime::expand_limit_offset(&mut #sql, __dialect, __limit, __offset)?;
                }
            }
        }
        RenderStep::Bool(value) => {
            quote! { ::sqlrepo::runtime::expand_bool(&mut #sql, __dialect, #value); }
        }
        RenderStep::CurrentTimestamp => {
            quote! { ::sqlrepo::runtime::expand_current_timestamp(&mut #sql, __dialect); }
        }
        RenderStep::ReturningId => {
            quote! { ::sqlrepo::runtime::push_returning_id::<#entity>(&mut #sql, __dialect)?; }
        }
        RenderStep::Where { param } => {
            let ident = format_ident!("{param}");
            quote! {
                {
                    let __rendered = ::sqlrepo::ExprToSql::for_entity::<#entity>(__dialect)
                        .starting_at(#index)
                        .where_clause(&#ident)?;
                    #sql.push_str("WHERE ");
                    #sql.push_str(&__rendered.sql);
                    #index += __rendered.params.len();
                    #params.extend(__rendered.into_values()?);
                }
            }
        }
        RenderStep::SetExpr { param } => {
            let ident = format_ident!("{param}");
            quote! {
                {
                    let __rendered = ::sqlrepo::ExprToSql::for_entity::<#entity>(__dialect)
                        .starting_at(#index)
                        .set_clause(&#ident)?;
                    #sql.push_str(&__rendered.sql);
                    #index += __rendered.params.len();
                    #params.extend(__rendered.into_values()?);
                }
            }
        }
        RenderStep::SetColumns => {
            let owner = entity_param_ident(method)?;
            quote! {
                {
                    let mut __first = true;
                    for __column in <#entity as ::sqlrepo::Entity>::insert_columns() {
                        if !__first {
                            #sql.push_str(", ");
                        }
                        __first = false;
                        #sql.push_str(&__dialect.quote_ident(__column.name));
                        #sql.push_str(" = ");
                        #sql.push_str(&__dialect.param_ref(__column.name, #index));
                        #index += 1;
                    }
                    #params.extend(::sqlrepo::Entity::to_values(&#owner));
                }
            }
        }
        RenderStep::DynIdent { param } => {
            let ident = format_ident!("{param}");
            quote! {
                #sql.push_str(&::sqlrepo::runtime::quote_dynamic_ident(__dialect, #ident.as_str())?);
            }
        }
        RenderStep::DynFragment { param } => {
            let ident = format_ident!("{param}");
            quote! { #sql.push_str(#ident.as_str()); }
        }
        RenderStep::Truncate => {
            let table = table_expr(repo);
            quote! { #sql.push_str(&__dialect.truncate_or_delete(#table)); }
        }
        RenderStep::Analyze => {
            let table = table_expr(repo);
            quote! { #sql.push_str(&__dialect.analyze(#table)); }
        }
        RenderStep::BatchValues => {
            // Single-row insert: one VALUES tuple from the entity param.
            let owner = entity_param_ident(method)?;
            quote! {
                #sql.push_str(&::sqlrepo::runtime::expand_batch_values(
                    __dialect,
                    <#entity as ::sqlrepo::Entity>::insert_columns().count(),
                    1,
                    #index,
                ));
                #index += <#entity as ::sqlrepo::Entity>::insert_columns().count();
                #params.extend(::sqlrepo::Entity::to_values(&#owner));
            }
        }
    })
}

fn limit_tokens(source: &LimitSource) -> TokenStream {
    match source {
        LimitSource::None => quote!(::core::option::Option::None),
        LimitSource::Param { name, nullable } => {
            let ident = format_ident!("{name}");
            if *nullable {
                quote!(#ident)
            } else {
                quote!(Some(#ident))
            }
        }
        LimitSource::Preset(value) => quote!(Some(#value)),
        LimitSource::PageSize => quote!(Some(page_size)),
    }
}

fn offset_tokens(source: &OffsetSource) -> TokenStream {
    match source {
        OffsetSource::None => quote!(::core::option::Option::None),
        OffsetSource::Param { name, nullable } => {
            let ident = format_ident!("{name}");
            if *nullable {
                quote!(#ident)
            } else {
                quote!(Some(#ident))
            }
        }
        OffsetSource::PageOffset => quote!(Some((page_number - 1) * page_size)),
    }
}

fn entity_param_ident(method: &MethodSpec) -> Result<Ident, Diagnostic> {
    method
        .entity_param()
        .map(|p| p.ident.clone())
        .ok_or_else(|| {
            Diagnostic::new(
                DiagnosticKind::UnknownPlaceholder,
                method.span,
                method.name(),
                "this template needs an entity-typed parameter".to_string(),
                "take the entity by value, e.g. `entity: User`",
            )
        })
}

fn finisher(
    repo: &RepoSpec,
    method: &MethodSpec,
    plan: &BindingPlan,
) -> Result<TokenStream, Diagnostic> {
    let entity = &repo.entity;
    Ok(match method.ret {
        ReturnShape::RowsAffected => quote! {
            ::sqlrepo::runtime::execute(self.pool(), &__sql, __params, __token).await
        },
        ReturnShape::Unit => quote! {
            ::sqlrepo::runtime::execute(self.pool(), &__sql, __params, __token)
                .await
                .map(|_| ())
        },
        ReturnShape::Scalar { kind, nullable } => {
            let convert = scalar_convert(kind, nullable);
            quote! {
                let __value =
                    ::sqlrepo::runtime::fetch_scalar(self.pool(), &__sql, __params, __token)
                        .await?;
                #convert
            }
        }
        ReturnShape::ScalarValue => quote! {
            ::sqlrepo::runtime::fetch_scalar(self.pool(), &__sql, __params, __token).await
        },
        ReturnShape::ScalarList => quote! {
            ::sqlrepo::runtime::fetch_scalar_list(self.pool(), &__sql, __params, __token).await
        },
        ReturnShape::Optional if method.single => quote! {
            ::sqlrepo::runtime::fetch_single::<#entity>(self.pool(), &__sql, __params, __token)
                .await
        },
        ReturnShape::Optional => quote! {
            ::sqlrepo::runtime::fetch_optional::<#entity>(self.pool(), &__sql, __params, __token)
                .await
        },
        ReturnShape::List => quote! {
            ::sqlrepo::runtime::fetch_list::<#entity>(self.pool(), &__sql, __params, __token)
                .await
        },
        ReturnShape::DynamicRows => quote! {
            ::sqlrepo::runtime::fetch_dynamic_rows(self.pool(), &__sql, __params, __token).await
        },
        ReturnShape::GeneratedId => quote! {
            ::sqlrepo::runtime::fetch_generated_id(
                self.pool(),
                __dialect,
                &__sql,
                __params,
                __token,
            )
            .await
        },
        ReturnShape::EntityWithId => {
            let owner = entity_param_ident(method)?;
            quote! {
                let __id = ::sqlrepo::runtime::fetch_generated_id(
                    self.pool(),
                    __dialect,
                    &__sql,
                    __params,
                    __token,
                )
                .await?;
                let mut __entity = #owner;
                ::sqlrepo::Entity::assign_generated_id(&mut __entity, __id);
                Ok(__entity)
            }
        }
        ReturnShape::Page => page_finisher(repo, method, plan)?,
        ReturnShape::IdList => {
            // Reached only through the batch path.
            return Err(Diagnostic::new(
                DiagnosticKind::UnsupportedReturnShape,
                method.span,
                repo.location(method),
                "Vec<i64> requires a batch INSERT template".to_string(),
                "add `{{batch_values}}` over a Vec<entity> parameter",
            ));
        }
    })
}

fn scalar_convert(kind: ScalarReturn, nullable: bool) -> TokenStream {
    match (kind, nullable) {
        (ScalarReturn::I64, false) => quote! { __value.require_i64() },
        (ScalarReturn::I64, true) => quote! { __value.opt_i64() },
        (ScalarReturn::I32, false) => quote! { __value.require_i64().map(|v| v as i32) },
        (ScalarReturn::I32, true) => {
            quote! { __value.opt_i64().map(|v| v.map(|v| v as i32)) }
        }
        (ScalarReturn::F64, false) => quote! { __value.require_f64() },
        (ScalarReturn::F64, true) => quote! { __value.opt_f64() },
        (ScalarReturn::Bool, false) => quote! { __value.require_bool() },
        (ScalarReturn::Bool, true) => quote! { __value.opt_bool() },
        (ScalarReturn::Text, false) => quote! { __value.require_text() },
        (ScalarReturn::Text, true) => quote! { __value.opt_text() },
    }
}

fn page_finisher(
    repo: &RepoSpec,
    method: &MethodSpec,
    plan: &BindingPlan,
) -> Result<TokenStream, Diagnostic> {
    for required in ["page_number", "page_size"] {
        let ok = method
            .param(required)
            .is_some_and(|p| p.role == ParamRole::Normal && !p.nullable);
        if !ok {
            return Err(Diagnostic::new(
                DiagnosticKind::UnsupportedReturnShape,
                method.span,
                repo.location(method),
                format!("paged methods need an i64 `{required}` parameter"),
                "declare `page_number: i64, page_size: i64`",
            ));
        }
    }

    // COUNT runs over the same table and predicate, without ordering or
    // paging.
    let count_vars = Vars::count();
    let mut count_steps = vec![
        RenderStep::Lit("SELECT COUNT(*) FROM ".to_string()),
        RenderStep::Table,
    ];
    for step in &plan.steps {
        if let RenderStep::Where { param } = step {
            count_steps.push(RenderStep::Lit(" ".to_string()));
            count_steps.push(RenderStep::Where {
                param: param.clone(),
            });
        }
    }
    let count_decls = declarations(&count_steps, &count_vars);
    let count_stmts = count_steps
        .iter()
        .map(|step| step_tokens(repo, method, step, &count_vars))
        .collect::<Result<Vec<_>, _>>()?;

    let entity = &repo.entity;
    Ok(quote! {
        #count_decls
        #(#count_stmts)*
        ::sqlrepo::runtime::fetch_page::<#entity>(
            self.pool(),
            &__count_sql,
            __count_params,
            &__sql,
            __params,
            page_number,
            page_size,
            __token,
        )
        .await
    })
}

fn batch_body(
    repo: &RepoSpec,
    method: &MethodSpec,
    plan: &BindingPlan,
) -> Result<TokenStream, Diagnostic> {
    let entity = &repo.entity;
    let position = plan
        .steps
        .iter()
        .position(|s| matches!(s, RenderStep::BatchValues))
        .expect("batch plans contain the values step");
    let prefix = &plan.steps[..position];
    if prefix.iter().any(pushes_params) {
        return Err(Diagnostic::new(
            DiagnosticKind::MalformedTemplate,
            method.span,
            repo.location(method),
            "batch INSERT templates cannot bind extra parameters".to_string(),
            "keep the template to INSERT INTO ... VALUES {{batch_values}}",
        ));
    }

    let items = method
        .entity_list_param()
        .map(|p| p.ident.clone())
        .expect("batch plans have a Vec<entity> parameter");
    let vars = Vars::main();
    let sql = &vars.sql;
    let stmts = prefix
        .iter()
        .map(|step| step_tokens(repo, method, step, &vars))
        .collect::<Result<Vec<_>, _>>()?;
    let dialect = dialect_tokens(repo);
    let token = token_tokens(method);
    let max_batch = repo.max_batch_size;

    let call = match method.ret {
        ReturnShape::IdList => quote! {
            let __pk = <#entity as ::sqlrepo::Entity>::primary_key().ok_or_else(|| {
                ::sqlrepo::RepoError::Unsupported("entity has no primary key".to_string())
            })?;
            ::sqlrepo::runtime::batch_insert_returning_ids(
                self.pool(),
                __dialect,
                &__sql,
                __pk.name,
                __rows,
                #max_batch,
                __token,
            )
            .await
        },
        ReturnShape::RowsAffected => quote! {
            ::sqlrepo::runtime::batch_insert(
                self.pool(),
                __dialect,
                &__sql,
                __rows,
                #max_batch,
                __token,
            )
            .await
        },
        ReturnShape::Unit => quote! {
            ::sqlrepo::runtime::batch_insert(
                self.pool(),
                __dialect,
                &__sql,
                __rows,
                #max_batch,
                __token,
            )
            .await
            .map(|_| ())
        },
        _ => unreachable!("binding validated batch return shapes"),
    };

    Ok(quote! {
        #dialect
        #token
        let mut #sql = String::new();
        #(#stmts)*
        let __rows: Vec<Vec<::sqlrepo::SqlValue>> = #items
            .iter()
            .map(|__entity| ::sqlrepo::Entity::to_values(__entity))
            .collect();
        #call
    })
}
