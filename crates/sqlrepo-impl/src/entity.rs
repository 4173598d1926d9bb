// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `SqlEntity` derive: entity descriptor generation.
//!
//! Parsing ([`parse`]) turns the annotated struct into an [`parse::EntityModel`];
//! code generation ([`codegen`]) emits the `Entity` impl: column metadata
//! constants, row materialization, insert-value extraction, and generated-key
//! assignment.

pub mod codegen;
pub mod parse;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Entry point for the `SqlEntity` derive macro.
pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parse::EntityModel::from_input(&input) {
        Ok(model) => codegen::generate(&model).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
