// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Result-shape planner: infers the materialization recipe from a
//! method's declared return type.
//!
//! | declared | recipe |
//! |----------|--------|
//! | `Result<u64>` | affected-row count |
//! | `Result<()>` | execute, discard |
//! | `Result<i32/i64/f64/bool/String>` | scalar, NULL is an error |
//! | `Result<Option<scalar>>` | scalar, NULL allowed |
//! | `Result<Option<Entity>>` | optional entity |
//! | `Result<Vec<Entity>>` | entity list |
//! | `Result<Page<Entity>>` | COUNT + page SELECT |
//! | `Result<Vec<DynamicRow>>` | ordered column-value maps |
//! | `Result<Vec<SqlValue>>` | first column of every row |
//! | `Result<SqlValue>` | dynamically typed scalar |
//! | `Result<i64>` + `#[returning_id]` | generated key |
//! | `Result<Vec<i64>>` + `{{batch_values}}` | batch generated keys |
//! | `Result<Entity>` | INSERT, assign generated key, return entity |

use syn::{Path, ReturnType, Signature, Type};

use super::model::{ReturnShape, ScalarReturn};

/// Infer the recipe, or explain why the shape is unsupported.
pub fn plan_return_shape(
    sig: &Signature,
    entity: &Path,
    returning_id: bool,
) -> Result<ReturnShape, String> {
    let ReturnType::Type(_, ty) = &sig.output else {
        return Err("repository methods must return Result<_, RepoError>".to_string());
    };
    let (ok_ty, err_ty) = result_args(ty)
        .ok_or_else(|| "repository methods must return Result<_, RepoError>".to_string())?;
    if last_ident(err_ty).as_deref() != Some("RepoError") {
        return Err("the error type of a repository method must be RepoError".to_string());
    }
    shape_of(ok_ty, entity, returning_id)
}

fn shape_of(ty: &Type, entity: &Path, returning_id: bool) -> Result<ReturnShape, String> {
    if let Type::Tuple(tuple) = ty {
        if tuple.elems.is_empty() {
            return Ok(ReturnShape::Unit);
        }
        return Err("tuple returns are not supported".to_string());
    }

    let ident = last_ident(ty).ok_or_else(|| unsupported(ty))?;
    match ident.as_str() {
        "u64" => Ok(ReturnShape::RowsAffected),
        "i64" if returning_id => Ok(ReturnShape::GeneratedId),
        "i64" => Ok(scalar(ScalarReturn::I64, false)),
        "i32" => Ok(scalar(ScalarReturn::I32, false)),
        "f64" => Ok(scalar(ScalarReturn::F64, false)),
        "bool" => Ok(scalar(ScalarReturn::Bool, false)),
        "String" => Ok(scalar(ScalarReturn::Text, false)),
        "SqlValue" => Ok(ReturnShape::ScalarValue),
        "Option" => {
            let inner = single_arg(ty).ok_or_else(|| unsupported(ty))?;
            if is_entity(inner, entity) {
                return Ok(ReturnShape::Optional);
            }
            match last_ident(inner).as_deref() {
                Some("i64") => Ok(scalar(ScalarReturn::I64, true)),
                Some("i32") => Ok(scalar(ScalarReturn::I32, true)),
                Some("f64") => Ok(scalar(ScalarReturn::F64, true)),
                Some("bool") => Ok(scalar(ScalarReturn::Bool, true)),
                Some("String") => Ok(scalar(ScalarReturn::Text, true)),
                _ => Err(unsupported(ty)),
            }
        }
        "Vec" => {
            let inner = single_arg(ty).ok_or_else(|| unsupported(ty))?;
            if is_entity(inner, entity) {
                return Ok(ReturnShape::List);
            }
            match last_ident(inner).as_deref() {
                Some("DynamicRow") => Ok(ReturnShape::DynamicRows),
                Some("SqlValue") => Ok(ReturnShape::ScalarList),
                Some("i64") => Ok(ReturnShape::IdList),
                _ => Err(unsupported(ty)),
            }
        }
        "Page" => {
            let inner = single_arg(ty).ok_or_else(|| unsupported(ty))?;
            if is_entity(inner, entity) {
                Ok(ReturnShape::Page)
            } else {
                Err("Page<_> must be parameterized with the repository entity".to_string())
            }
        }
        _ if is_entity(ty, entity) => Ok(ReturnShape::EntityWithId),
        _ => Err(unsupported(ty)),
    }
}

const fn scalar(kind: ScalarReturn, nullable: bool) -> ReturnShape {
    ReturnShape::Scalar { kind, nullable }
}

fn unsupported(ty: &Type) -> String {
    format!(
        "`{}` is not a supported return shape",
        quote::quote!(#ty)
    )
}

fn is_entity(ty: &Type, entity: &Path) -> bool {
    let entity_ident = entity
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default();
    last_ident(ty).as_deref() == Some(entity_ident.as_str())
}

/// Last path-segment identifier of a type, when it is a plain path.
pub fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// The single generic argument of a type like `Option<T>` or `Vec<T>`.
pub fn single_arg(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

/// The `(T, E)` arguments of a `Result<T, E>` type.
pub fn result_args(ty: &Type) -> Option<(&Type, &Type)> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut iter = args.args.iter();
    match (iter.next()?, iter.next()?) {
        (syn::GenericArgument::Type(ok), syn::GenericArgument::Type(err)) => Some((ok, err)),
        _ => None,
    }
}
