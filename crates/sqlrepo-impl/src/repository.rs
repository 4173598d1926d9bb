// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `#[repository]` attribute: pipeline assembly.
//!
//! Submodules, in pipeline order:
//!
//! - [`parse`] — macro arguments, trait body, method attributes
//! - [`template`] — SQL template lexer
//! - [`binding`] — placeholder resolution and the render plan
//! - [`shape`] — result-recipe planning
//! - [`shapes`] — the predefined shape library
//! - [`synth`] — method-body synthesis
//! - [`diagnostics`] — located, actionable failures
//!
//! The trait is always re-emitted (cleaned, under `#[async_trait]`). The
//! impl block is emitted only when every method synthesized; otherwise the
//! diagnostics surface as `compile_error!`s and the impl is withheld so a
//! single template typo does not cascade into missing-method errors.

pub mod binding;
pub mod diagnostics;
pub mod model;
pub mod parse;
pub mod shape;
pub mod shapes;
pub mod synth;
pub mod template;

use proc_macro2::TokenStream;
use quote::quote;

/// Entry point for the `#[repository]` attribute macro.
pub fn expand(args: TokenStream, input: TokenStream) -> TokenStream {
    let parsed = match parse::parse(args, input) {
        Ok(parsed) => parsed,
        Err(err) => return err.to_compile_error(),
    };
    let parse::ParsedRepository {
        spec,
        mut trait_item,
        mut diagnostics,
    } = parsed;

    let (methods, synth_diagnostics) = synth::synthesize_impl(&spec);
    for diagnostic in synth_diagnostics.items() {
        diagnostics.push(diagnostic.clone());
    }

    trait_item
        .attrs
        .push(syn::parse_quote!(#[::sqlrepo::async_trait]));

    if !diagnostics.is_empty() {
        let errors = diagnostics.to_compile_errors();
        return quote! {
            #trait_item
            #errors
        };
    }

    let trait_ident = &spec.trait_ident;
    quote! {
        #trait_item

        #[::sqlrepo::async_trait]
        impl #trait_ident for ::sqlrepo::SqlRepository {
            #(#methods)*
        }
    }
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    #[test]
    fn emits_trait_and_impl() {
        let output = expand(
            quote!(entity = User, table = "users", dialect = "sqlite"),
            quote! {
                pub trait UserRepo {
                    #[sql("SELECT COUNT(*) FROM {{table}}")]
                    async fn count(&self) -> Result<i64, RepoError>;
                }
            },
        )
        .to_string();
        assert!(output.contains("pub trait UserRepo"));
        assert!(output.contains("impl UserRepo for :: sqlrepo :: SqlRepository"));
        assert!(output.contains("async_trait"));
        assert!(!output.contains("compile_error"));
    }

    #[test]
    fn diagnostics_replace_the_impl() {
        let output = expand(
            quote!(entity = User),
            quote! {
                pub trait UserRepo {
                    #[sql("SELECT {{nope}} FROM {{table}}")]
                    async fn broken(&self) -> Result<i64, RepoError>;

                    #[sql("SELECT COUNT(*) FROM {{table}}")]
                    async fn fine(&self) -> Result<i64, RepoError>;
                }
            },
        )
        .to_string();
        assert!(output.contains("compile_error"));
        assert!(output.contains("UnknownPlaceholder"));
        // Trait survives for IDE friendliness; the impl is withheld.
        assert!(output.contains("pub trait UserRepo"));
        assert!(!output.contains("impl UserRepo"));
    }

    #[test]
    fn method_bodies_follow_declaration_order() {
        let output = expand(
            quote!(entity = User),
            quote! {
                pub trait UserRepo {
                    #[sql("SELECT COUNT(*) FROM {{table}}")]
                    async fn first(&self) -> Result<i64, RepoError>;

                    #[sql("DELETE FROM {{table}}")]
                    async fn second(&self) -> Result<u64, RepoError>;
                }
            },
        )
        .to_string();
        let first = output.find("async fn first").expect("first present");
        let second = output.find("async fn second").expect("second present");
        assert!(first < second);
    }

    #[test]
    fn unparseable_arguments_become_compile_error() {
        let output = expand(
            quote!(no_entity_here = 1),
            quote! {
                pub trait UserRepo {}
            },
        )
        .to_string();
        assert!(output.contains("compile_error"));
    }
}
