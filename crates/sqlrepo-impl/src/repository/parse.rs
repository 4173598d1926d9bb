// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Parsing for the `#[repository]` attribute: macro arguments, the trait
//! body, and per-method attributes, producing the host model.

use darling::{FromMeta, ast::NestedMeta};
use proc_macro2::TokenStream;
use sqlrepo_core::dialect::DialectKind;
use syn::{ItemTrait, Path, TraitItem, TraitItemFn, Type, spanned::Spanned};

use super::{
    diagnostics::{Diagnostic, DiagnosticKind, Diagnostics},
    model::{MethodSpec, ParamRole, ParamSpec, RepoSpec},
    shape::plan_return_shape,
    shapes::{ShapeKind, shape_methods},
};

/// Raw macro arguments parsed by darling.
#[derive(Debug, FromMeta)]
pub struct RepoAttrs {
    /// Entity type path.
    pub entity: Path,

    /// Table-name override.
    #[darling(default)]
    pub table: Option<String>,

    /// Dialect tag.
    #[darling(default)]
    pub dialect: Option<String>,

    /// Primary-key type used by shape signatures.
    #[darling(default)]
    pub id_type: Option<Path>,

    /// Rows per batch INSERT statement.
    #[darling(default)]
    pub max_batch_size: Option<usize>,

    /// Predefined shapes to merge into the trait.
    #[darling(default)]
    pub shapes: Option<darling::util::PathList>,

    /// Named LIMIT preset additions and overrides.
    #[darling(default)]
    pub limit_presets: Option<Presets>,
}

/// `limit_presets(name = value, ...)`, kept in declaration order.
#[derive(Debug, Default)]
pub struct Presets(pub Vec<(String, i64)>);

impl FromMeta for Presets {
    fn from_list(items: &[NestedMeta]) -> darling::Result<Self> {
        let mut presets = Vec::with_capacity(items.len());
        for item in items {
            let NestedMeta::Meta(syn::Meta::NameValue(pair)) = item else {
                return Err(darling::Error::custom(
                    "limit presets are written `name = value`",
                )
                .with_span(item));
            };
            let name = pair
                .path
                .get_ident()
                .ok_or_else(|| darling::Error::custom("preset names are plain identifiers"))?
                .to_string();
            let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(value),
                ..
            }) = &pair.value
            else {
                return Err(
                    darling::Error::custom("preset values are integer literals")
                        .with_span(&pair.value),
                );
            };
            presets.push((name, value.base10_parse()?));
        }
        Ok(Self(presets))
    }
}

/// Parse result: the model, the trait to re-emit, and any diagnostics.
pub struct ParsedRepository {
    /// The host model for synthesis.
    pub spec: RepoSpec,

    /// The trait with shape methods appended and macro attributes
    /// stripped.
    pub trait_item: ItemTrait,

    /// Per-method failures; affected methods are excluded from the model.
    pub diagnostics: Diagnostics,
}

/// Parse the macro arguments and the annotated trait.
pub fn parse(args: TokenStream, input: TokenStream) -> syn::Result<ParsedRepository> {
    let metas = NestedMeta::parse_meta_list(args)?;
    let attrs = RepoAttrs::from_list(&metas).map_err(syn::Error::from)?;
    let mut trait_item: ItemTrait = syn::parse2(input)?;
    let mut diagnostics = Diagnostics::new();

    let dialect = match &attrs.dialect {
        None => DialectKind::default(),
        Some(tag) => match DialectKind::parse(tag) {
            Some(kind) => kind,
            None => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DialectUnsupported,
                    trait_item.ident.span(),
                    trait_item.ident.to_string(),
                    format!("unknown dialect `{tag}`"),
                    "use one of: sqlite, mysql, postgres, sqlserver, oracle",
                ));
                DialectKind::default()
            }
        },
    };

    let id_type: Type = match &attrs.id_type {
        Some(path) => Type::Path(syn::TypePath {
            qself: None,
            path: path.clone(),
        }),
        None => syn::parse_quote!(i64),
    };

    append_shape_methods(&mut trait_item, &attrs, &id_type, &mut diagnostics);

    let trait_name = trait_item.ident.to_string();
    let mut methods = Vec::new();
    for item in &mut trait_item.items {
        let TraitItem::Fn(method) = item else { continue };
        match parse_method(method, &attrs.entity, &trait_name) {
            Ok(spec) => methods.push(spec),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    let spec = RepoSpec {
        trait_ident: trait_item.ident.clone(),
        entity: attrs.entity.clone(),
        table: attrs.table.clone(),
        dialect,
        max_batch_size: attrs.max_batch_size.unwrap_or(100).max(1),
        presets: attrs.limit_presets.map(|p| p.0).unwrap_or_default(),
        methods,
    };

    Ok(ParsedRepository {
        spec,
        trait_item,
        diagnostics,
    })
}

fn append_shape_methods(
    trait_item: &mut ItemTrait,
    attrs: &RepoAttrs,
    id_type: &Type,
    diagnostics: &mut Diagnostics,
) {
    let Some(shapes) = &attrs.shapes else { return };
    let mut taken: Vec<String> = trait_item
        .items
        .iter()
        .filter_map(|item| match item {
            TraitItem::Fn(method) => Some(method.sig.ident.to_string()),
            _ => None,
        })
        .collect();

    for path in shapes.iter() {
        let label = path
            .get_ident()
            .map(ToString::to_string)
            .unwrap_or_default();
        let Some(kind) = ShapeKind::parse(&label) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownPlaceholder,
                path.span(),
                trait_item.ident.to_string(),
                format!("unknown shape `{label}`"),
                format!("known shapes: {}", ShapeKind::LABELS.join(", ")),
            ));
            continue;
        };
        for method in shape_methods(kind, &attrs.entity, id_type) {
            let name = method.sig.ident.to_string();
            if taken.iter().any(|existing| existing == &name) {
                continue;
            }
            taken.push(name);
            trait_item.items.push(TraitItem::Fn(method));
        }
    }
}

fn parse_method(
    method: &mut TraitItemFn,
    entity: &Path,
    trait_name: &str,
) -> Result<MethodSpec, Diagnostic> {
    let location = format!("{trait_name}::{}", method.sig.ident);
    let span = method.sig.ident.span();

    let mut template = None;
    let mut returning_id = false;
    let mut order_by = None;
    let mut single = false;
    let mut parse_error = None;

    method.attrs.retain(|attr| {
        if attr.path().is_ident("sql") {
            match attr.parse_args::<syn::LitStr>() {
                Ok(lit) => template = Some(lit.value()),
                Err(_) => {
                    parse_error = Some("the #[sql] attribute takes one string literal");
                }
            }
            false
        } else if attr.path().is_ident("returning_id") {
            returning_id = true;
            false
        } else if attr.path().is_ident("order_by") {
            match attr.parse_args::<syn::LitStr>() {
                Ok(lit) => order_by = Some(lit.value()),
                Err(_) => {
                    parse_error = Some("the #[order_by] attribute takes one string literal");
                }
            }
            false
        } else if attr.path().is_ident("single") {
            single = true;
            false
        } else {
            true
        }
    });

    if let Some(message) = parse_error {
        return Err(Diagnostic::new(
            DiagnosticKind::MalformedTemplate,
            span,
            location.clone(),
            message.to_string(),
            "see the repository macro docs for attribute syntax",
        ));
    }

    let Some(template) = template else {
        return Err(Diagnostic::new(
            DiagnosticKind::MalformedTemplate,
            span,
            location.clone(),
            "method has no #[sql] template".to_string(),
            "attach #[sql(\"...\")] or inherit the method from a shape",
        ));
    };

    if method.sig.asyncness.is_none() {
        return Err(Diagnostic::new(
            DiagnosticKind::UnsupportedReturnShape,
            span,
            location.clone(),
            "repository methods must be async".to_string(),
            "declare the method `async fn`",
        ));
    }

    let mut params = Vec::new();
    let mut saw_receiver = false;
    for input in &method.sig.inputs {
        match input {
            syn::FnArg::Receiver(receiver) => {
                saw_receiver = true;
                if receiver.reference.is_none() || receiver.mutability.is_some() {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnsupportedReturnShape,
                        span,
                        location.clone(),
                        "repository methods take `&self`".to_string(),
                        "change the receiver to `&self`",
                    ));
                }
            }
            syn::FnArg::Typed(typed) => {
                let syn::Pat::Ident(pat) = typed.pat.as_ref() else {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnsupportedReturnShape,
                        span,
                        location.clone(),
                        "parameter patterns must be plain identifiers".to_string(),
                        "name the parameter directly",
                    ));
                };
                let (role, nullable) = classify_param(&typed.ty, entity);
                params.push(ParamSpec {
                    ident: pat.ident.clone(),
                    ty: (*typed.ty).clone(),
                    role,
                    nullable,
                });
            }
        }
    }
    if !saw_receiver {
        return Err(Diagnostic::new(
            DiagnosticKind::UnsupportedReturnShape,
            span,
            location.clone(),
            "repository methods take `&self`".to_string(),
            "add the `&self` receiver",
        ));
    }

    let ret = plan_return_shape(&method.sig, entity, returning_id).map_err(|message| {
        Diagnostic::new(
            DiagnosticKind::UnsupportedReturnShape,
            span,
            location.clone(),
            message,
            "see the result-shape table in the repository macro docs",
        )
    })?;

    Ok(MethodSpec {
        sig: method.sig.clone(),
        span,
        template,
        returning_id,
        order_by,
        single,
        params,
        ret,
    })
}

fn classify_param(ty: &Type, entity: &Path) -> (ParamRole, bool) {
    use super::shape::{last_ident, single_arg};

    let entity_ident = entity
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();

    if let Some(name) = last_ident(ty) {
        match name.as_str() {
            "Option" => {
                if let Some(inner) = single_arg(ty) {
                    let (role, _) = classify_param(inner, entity);
                    return (role, true);
                }
            }
            "CancellationToken" => return (ParamRole::Cancellation, false),
            "Predicate" => return (ParamRole::Predicate, false),
            "SetList" => return (ParamRole::SetList, false),
            "SqlIdent" => return (ParamRole::DynamicIdent, false),
            "SqlFragment" => return (ParamRole::DynamicFragment, false),
            "Vec" => {
                if let Some(inner) = single_arg(ty) {
                    if last_ident(inner).as_deref() == Some(entity_ident.as_str()) {
                        return (ParamRole::EntityList, false);
                    }
                    if last_ident(inner).as_deref() == Some("u8") {
                        return (ParamRole::Normal, false);
                    }
                }
                return (ParamRole::Collection, false);
            }
            name if name == entity_ident => return (ParamRole::Entity, false),
            _ => {}
        }
    }
    (ParamRole::Normal, false)
}
