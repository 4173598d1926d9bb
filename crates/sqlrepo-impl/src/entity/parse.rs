// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute parsing for the `SqlEntity` derive.

use convert_case::{Case, Casing};
use darling::{FromDeriveInput, FromField, ast};
use syn::{DeriveInput, Ident, Type};

/// Raw entity-level attributes parsed by darling.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(sql_entity), supports(struct_named))]
pub struct EntityAttrs {
    /// Struct identifier.
    pub ident: Ident,

    /// Struct fields.
    pub data: ast::Data<darling::util::Ignored, FieldAttrs>,

    /// Database table name. Required.
    pub table: String,
}

/// Raw field-level attributes parsed by darling.
#[derive(Debug, FromField)]
#[darling(attributes(sql))]
pub struct FieldAttrs {
    /// Field identifier; always present for named structs.
    pub ident: Option<Ident>,

    /// Field type.
    pub ty: Type,

    /// `#[sql(id)]`: primary key.
    #[darling(default)]
    pub id: bool,

    /// `#[sql(column = "...")]`: column-name override.
    #[darling(default)]
    pub column: Option<String>,

    /// `#[sql(readonly)]`: excluded from INSERT column lists.
    #[darling(default)]
    pub readonly: bool,
}

/// Scalar kinds an entity field can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `bool`
    Bool,
    /// `String`
    Text,
    /// `Vec<u8>`
    Bytes,
}

impl ScalarKind {
    /// True for the integer kinds a generated key can be assigned to.
    pub fn is_integer(self) -> bool {
        matches!(self, Self::I16 | Self::I32 | Self::I64)
    }
}

/// One parsed entity field.
#[derive(Debug)]
pub struct FieldModel {
    /// Rust field identifier.
    pub ident: Ident,

    /// Mapped column name.
    pub column: String,

    /// Scalar kind of the field (after unwrapping `Option`).
    pub kind: ScalarKind,

    /// True for `Option<T>` fields.
    pub nullable: bool,

    /// True for the `#[sql(id)]` field.
    pub is_id: bool,

    /// True for `#[sql(readonly)]` fields.
    pub readonly: bool,
}

impl FieldModel {
    /// True when the column participates in INSERT statements.
    pub fn insertable(&self) -> bool {
        !self.is_id && !self.readonly
    }
}

/// Fully parsed entity model.
#[derive(Debug)]
pub struct EntityModel {
    /// Struct identifier.
    pub ident: Ident,

    /// Table name from `#[sql_entity(table = "...")]`.
    pub table: String,

    /// Fields in declaration order.
    pub fields: Vec<FieldModel>,
}

impl EntityModel {
    /// Parse and validate a derive input.
    pub fn from_input(input: &DeriveInput) -> syn::Result<Self> {
        let attrs = EntityAttrs::from_derive_input(input).map_err(syn::Error::from)?;
        let raw_fields = attrs
            .data
            .take_struct()
            .expect("darling guarantees struct_named")
            .fields;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let ident = raw
                .ident
                .clone()
                .expect("named struct fields have identifiers");
            let (kind, nullable) = classify(&raw.ty).ok_or_else(|| {
                syn::Error::new_spanned(
                    &raw.ty,
                    "unsupported field type; use bool, i16, i32, i64, f32, f64, String, \
                     Vec<u8>, or Option of one of these",
                )
            })?;
            if raw.id && nullable {
                return Err(syn::Error::new_spanned(
                    &raw.ty,
                    "the #[sql(id)] field cannot be Option",
                ));
            }
            let column = raw
                .column
                .clone()
                .unwrap_or_else(|| ident.to_string().to_case(Case::Snake));
            fields.push(FieldModel {
                ident,
                column,
                kind,
                nullable,
                is_id: raw.id,
                readonly: raw.readonly,
            });
        }

        let model = Self {
            ident: attrs.ident,
            table: attrs.table,
            fields,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> syn::Result<()> {
        let ids = self.fields.iter().filter(|f| f.is_id).count();
        if ids == 0 {
            return Err(syn::Error::new(
                self.ident.span(),
                "entity needs exactly one #[sql(id)] field",
            ));
        }
        if ids > 1 {
            return Err(syn::Error::new(
                self.ident.span(),
                "entity has more than one #[sql(id)] field",
            ));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.column == field.column) {
                return Err(syn::Error::new(
                    field.ident.span(),
                    format!(
                        "ambiguous column mapping: `{}` is used by more than one field",
                        field.column
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The primary-key field.
    pub fn id_field(&self) -> &FieldModel {
        self.fields
            .iter()
            .find(|f| f.is_id)
            .expect("validated: exactly one id field")
    }
}

/// Classify a field type into a scalar kind plus nullability.
pub fn classify(ty: &Type) -> Option<(ScalarKind, bool)> {
    if let Some(inner) = option_inner(ty) {
        let (kind, nested) = classify(inner)?;
        if nested {
            return None;
        }
        return Some((kind, true));
    }
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    let kind = match segment.ident.to_string().as_str() {
        "i16" => ScalarKind::I16,
        "i32" => ScalarKind::I32,
        "i64" => ScalarKind::I64,
        "f32" => ScalarKind::F32,
        "f64" => ScalarKind::F64,
        "bool" => ScalarKind::Bool,
        "String" => ScalarKind::Text,
        "Vec" => {
            let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
                return None;
            };
            let mut iter = args.args.iter();
            match (iter.next(), iter.next()) {
                (Some(syn::GenericArgument::Type(Type::Path(inner))), None)
                    if inner.path.is_ident("u8") =>
                {
                    ScalarKind::Bytes
                }
                _ => return None,
            }
        }
        _ => return None,
    };
    if kind != ScalarKind::Bytes && !segment.arguments.is_none() {
        return None;
    }
    Some((kind, false))
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn model(input: DeriveInput) -> syn::Result<EntityModel> {
        EntityModel::from_input(&input)
    }

    fn user_input() -> DeriveInput {
        parse_quote! {
            #[sql_entity(table = "users")]
            pub struct User {
                #[sql(id)]
                pub id: i64,
                pub name: String,
                #[sql(column = "is_active")]
                pub active: bool,
                pub score: Option<i64>,
                #[sql(readonly)]
                pub created_at: String,
            }
        }
    }

    #[test]
    fn parses_table_and_fields_in_order() {
        let m = model(user_input()).unwrap();
        assert_eq!(m.table, "users");
        let columns: Vec<&str> = m.fields.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(
            columns,
            vec!["id", "name", "is_active", "score", "created_at"]
        );
    }

    #[test]
    fn snake_case_default_column_names() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: i64,
                createdAt: String,
            }
        };
        let m = model(input).unwrap();
        assert_eq!(m.fields[1].column, "created_at");
    }

    #[test]
    fn id_and_readonly_are_not_insertable() {
        let m = model(user_input()).unwrap();
        let insertable: Vec<&str> = m
            .fields
            .iter()
            .filter(|f| f.insertable())
            .map(|f| f.column.as_str())
            .collect();
        assert_eq!(insertable, vec!["name", "is_active", "score"]);
    }

    #[test]
    fn nullable_detection() {
        let m = model(user_input()).unwrap();
        assert!(m.fields[3].nullable);
        assert!(!m.fields[1].nullable);
    }

    #[test]
    fn missing_table_fails() {
        let input: DeriveInput = parse_quote! {
            struct T {
                #[sql(id)]
                id: i64,
            }
        };
        assert!(model(input).is_err());
    }

    #[test]
    fn missing_id_fails() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                name: String,
            }
        };
        let err = model(input).unwrap_err();
        assert!(err.to_string().contains("#[sql(id)]"));
    }

    #[test]
    fn duplicate_id_fails() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                a: i64,
                #[sql(id)]
                b: i64,
            }
        };
        assert!(model(input).is_err());
    }

    #[test]
    fn optional_id_fails() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: Option<i64>,
            }
        };
        assert!(model(input).is_err());
    }

    #[test]
    fn duplicate_column_mapping_fails() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: i64,
                #[sql(column = "name")]
                a: String,
                #[sql(column = "name")]
                b: String,
            }
        };
        let err = model(input).unwrap_err();
        assert!(err.to_string().contains("ambiguous column mapping"));
    }

    #[test]
    fn unsupported_type_fails() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: i64,
                tags: Vec<String>,
            }
        };
        assert!(model(input).is_err());
    }

    #[test]
    fn classify_scalars() {
        let ty: Type = parse_quote!(i64);
        assert_eq!(classify(&ty), Some((ScalarKind::I64, false)));
        let ty: Type = parse_quote!(Option<String>);
        assert_eq!(classify(&ty), Some((ScalarKind::Text, true)));
        let ty: Type = parse_quote!(Vec<u8>);
        assert_eq!(classify(&ty), Some((ScalarKind::Bytes, false)));
        let ty: Type = parse_quote!(Option<Option<i64>>);
        assert_eq!(classify(&ty), None);
        let ty: Type = parse_quote!(std::string::String);
        assert_eq!(classify(&ty), Some((ScalarKind::Text, false)));
    }
}
