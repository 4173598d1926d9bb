// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Code generation for the `SqlEntity` derive.

use proc_macro2::TokenStream;
use quote::quote;

use super::parse::{EntityModel, FieldModel, ScalarKind};

/// Emit the `Entity` impl for a parsed model.
pub fn generate(model: &EntityModel) -> TokenStream {
    let ident = &model.ident;
    let table = &model.table;
    let columns = model.fields.iter().map(column_def);
    let getters = model.fields.iter().map(|field| {
        let name = &field.ident;
        let getter = row_getter(field);
        quote! { #name: #getter }
    });
    let values = model
        .fields
        .iter()
        .filter(|f| f.insertable())
        .map(|field| {
            let name = &field.ident;
            quote! { ::sqlrepo::SqlValue::from(self.#name.clone()) }
        });
    let id = model.id_field();
    let id_ident = &id.ident;
    let assign = match id.kind {
        ScalarKind::I64 => quote! { self.#id_ident = id; },
        ScalarKind::I32 => quote! { self.#id_ident = id as i32; },
        ScalarKind::I16 => quote! { self.#id_ident = id as i16; },
        _ => quote! { let _ = id; },
    };

    quote! {
        #[automatically_derived]
        impl ::sqlrepo::Entity for #ident {
            const TABLE: &'static str = #table;

            const COLUMNS: &'static [::sqlrepo::ColumnDef] = &[
                #(#columns),*
            ];

            fn to_values(&self) -> Vec<::sqlrepo::SqlValue> {
                vec![#(#values),*]
            }

            fn id_value(&self) -> ::sqlrepo::SqlValue {
                ::sqlrepo::SqlValue::from(self.#id_ident.clone())
            }

            fn assign_generated_id(&mut self, id: i64) {
                #assign
            }

            fn from_row(
                row: &::sqlrepo::sqlx::any::AnyRow,
            ) -> Result<Self, ::sqlrepo::RepoError> {
                Ok(Self {
                    #(#getters),*
                })
            }
        }
    }
}

fn column_def(field: &FieldModel) -> TokenStream {
    let name = &field.column;
    let field_name = field.ident.to_string();
    let nullable = field.nullable;
    let boolean = field.kind == ScalarKind::Bool;
    let insertable = field.insertable();
    let primary_key = field.is_id;
    quote! {
        ::sqlrepo::ColumnDef {
            name: #name,
            field: #field_name,
            nullable: #nullable,
            boolean: #boolean,
            insertable: #insertable,
            primary_key: #primary_key,
        }
    }
}

fn row_getter(field: &FieldModel) -> TokenStream {
    let col = &field.column;
    match (field.kind, field.nullable) {
        (ScalarKind::I64, false) => quote! { ::sqlrepo::runtime::get_i64(row, #col)? },
        (ScalarKind::I64, true) => quote! { ::sqlrepo::runtime::get_opt_i64(row, #col)? },
        (ScalarKind::I32, false) => quote! { ::sqlrepo::runtime::get_i64(row, #col)? as i32 },
        (ScalarKind::I32, true) => {
            quote! { ::sqlrepo::runtime::get_opt_i64(row, #col)?.map(|v| v as i32) }
        }
        (ScalarKind::I16, false) => quote! { ::sqlrepo::runtime::get_i64(row, #col)? as i16 },
        (ScalarKind::I16, true) => {
            quote! { ::sqlrepo::runtime::get_opt_i64(row, #col)?.map(|v| v as i16) }
        }
        (ScalarKind::F64, false) => quote! { ::sqlrepo::runtime::get_f64(row, #col)? },
        (ScalarKind::F64, true) => quote! { ::sqlrepo::runtime::get_opt_f64(row, #col)? },
        (ScalarKind::F32, false) => quote! { ::sqlrepo::runtime::get_f64(row, #col)? as f32 },
        (ScalarKind::F32, true) => {
            quote! { ::sqlrepo::runtime::get_opt_f64(row, #col)?.map(|v| v as f32) }
        }
        (ScalarKind::Bool, false) => quote! { ::sqlrepo::runtime::get_bool(row, #col)? },
        (ScalarKind::Bool, true) => quote! { ::sqlrepo::runtime::get_opt_bool(row, #col)? },
        (ScalarKind::Text, false) => quote! { ::sqlrepo::runtime::get_text(row, #col)? },
        (ScalarKind::Text, true) => quote! { ::sqlrepo::runtime::get_opt_text(row, #col)? },
        (ScalarKind::Bytes, false) => quote! { ::sqlrepo::runtime::get_bytes(row, #col)? },
        (ScalarKind::Bytes, true) => quote! { ::sqlrepo::runtime::get_opt_bytes(row, #col)? },
    }
}

#[cfg(test)]
mod tests {
    use syn::{DeriveInput, parse_quote};

    use super::*;

    fn generate_for(input: DeriveInput) -> String {
        let model = EntityModel::from_input(&input).unwrap();
        generate(&model).to_string()
    }

    fn user() -> DeriveInput {
        parse_quote! {
            #[sql_entity(table = "users")]
            pub struct User {
                #[sql(id)]
                pub id: i64,
                pub name: String,
                #[sql(column = "is_active")]
                pub active: bool,
                pub score: Option<i64>,
            }
        }
    }

    #[test]
    fn emits_table_and_columns() {
        let output = generate_for(user());
        assert!(output.contains("const TABLE : & 'static str = \"users\""));
        assert!(output.contains("\"is_active\""));
        assert!(output.contains("primary_key : true"));
    }

    #[test]
    fn maps_boolean_column() {
        let output = generate_for(user());
        assert!(output.contains("boolean : true"));
        assert!(output.contains("get_bool"));
    }

    #[test]
    fn id_excluded_from_values() {
        let output = generate_for(user());
        assert!(!output.contains("self . id . clone"));
        assert!(output.contains("self . name . clone"));
    }

    #[test]
    fn nullable_field_uses_optional_getter() {
        let output = generate_for(user());
        assert!(output.contains("get_opt_i64"));
    }

    #[test]
    fn integer_id_assignable() {
        let output = generate_for(user());
        assert!(output.contains("self . id = id"));
    }

    #[test]
    fn narrow_integer_id_casts() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: i32,
            }
        };
        let output = generate_for(input);
        assert!(output.contains("id as i32"));
    }

    #[test]
    fn text_id_ignores_generated_key() {
        let input: DeriveInput = parse_quote! {
            #[sql_entity(table = "t")]
            struct T {
                #[sql(id)]
                id: String,
            }
        };
        let output = generate_for(input);
        assert!(output.contains("let _ = id"));
    }
}
