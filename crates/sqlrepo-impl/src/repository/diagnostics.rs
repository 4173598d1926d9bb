// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Generation-time diagnostics.
//!
//! Every failure the generator can detect carries a category, the
//! offending location (trait and method), and remediation text. The
//! validator runs before synthesis; methods with fatal diagnostics emit
//! nothing, and all collected diagnostics surface as `compile_error!`
//! invocations at the offending span.

use proc_macro2::{Span, TokenStream};
use quote::quote_spanned;

/// Category of a generation-time failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Template text that does not lex: unclosed braces, nesting, a
    /// placeholder missing its required argument.
    MalformedTemplate,

    /// A `{{name}}` that is neither built-in nor a fragment/identifier
    /// parameter, or an `@name` matching no method parameter.
    UnknownPlaceholder,

    /// A literal dynamic identifier that fails the whitelist.
    UnsafeIdentifier,

    /// `{{offset}}` with no limit in a dialect whose syntax cannot express
    /// a bare offset.
    OffsetRequiresLimit,

    /// OFFSET/FETCH pagination with no ORDER BY and no primary key to
    /// synthesize one from.
    MissingOrderBy,

    /// A declared return type no recipe covers.
    UnsupportedReturnShape,

    /// A construct the selected dialect cannot render.
    DialectUnsupported,

    /// Two entity fields map to the same column.
    AmbiguousColumn,

    /// A role parameter (predicate, set list, identifier, fragment,
    /// cancellation) declared optional; absence has no meaning for these.
    NonNullableDefaultNull,
}

impl DiagnosticKind {
    /// Stable label used in the rendered message.
    pub fn label(self) -> &'static str {
        match self {
            Self::MalformedTemplate => "MalformedTemplate",
            Self::UnknownPlaceholder => "UnknownPlaceholder",
            Self::UnsafeIdentifier => "UnsafeIdentifier",
            Self::OffsetRequiresLimit => "OffsetRequiresLimit",
            Self::MissingOrderBy => "MissingOrderBy",
            Self::UnsupportedReturnShape => "UnsupportedReturnShape",
            Self::DialectUnsupported => "DialectUnsupported",
            Self::AmbiguousColumn => "AmbiguousColumn",
            Self::NonNullableDefaultNull => "NonNullableDefaultNull",
        }
    }
}

/// One generation-time failure, located and actionable.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Failure category.
    pub kind: DiagnosticKind,

    /// Span the compiler error points at.
    pub span: Span,

    /// `Trait::method` location text.
    pub location: String,

    /// What went wrong.
    pub message: String,

    /// How to fix it.
    pub remediation: String,
}

impl Diagnostic {
    /// Build a diagnostic.
    pub fn new(
        kind: DiagnosticKind,
        span: Span,
        location: impl Into<String>,
        message: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            span,
            location: location.into(),
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    /// Render to a `compile_error!` at the recorded span.
    pub fn to_compile_error(&self) -> TokenStream {
        let text = format!(
            "{} at {}: {}. {}",
            self.kind.label(),
            self.location,
            self.message,
            self.remediation
        );
        quote_spanned!(self.span => ::core::compile_error!(#text);)
    }
}

/// Accumulator for diagnostics across an interface.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// True when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The recorded failures.
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Render every failure to `compile_error!` invocations.
    pub fn to_compile_errors(&self) -> TokenStream {
        self.items.iter().map(Diagnostic::to_compile_error).collect()
    }
}
