// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! SQL template lexer.
//!
//! Turns template text into literal segments, `@param` references, and
//! `{{...}}` placeholder nodes. Placeholder syntax: `{{name}}`,
//! `{{name:arg}}`, `{{name @param}}`; whitespace inside the braces is
//! insignificant and nesting is not allowed. Text inside single-quoted
//! SQL strings is never scanned for `@` or `{{`.
//!
//! Public vocabulary: `table`, `columns`, `pk`, `limit`, `limit:<preset>`,
//! `offset`, `bool_true`, `bool_false`, `current_timestamp`,
//! `returning_id`, `where @<param>`, `batch_values`, plus bare
//! fragment/identifier parameter names. The predefined shape library
//! additionally uses the internal `set_columns`, `set @<param>`,
//! `truncate`, and `analyze` placeholders; these are accepted from user
//! templates too.

/// Argument of a `{{limit}}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitArg {
    /// `{{limit}}`: bind the method parameter named `limit`.
    Auto,

    /// `{{limit @name}}`: bind an explicit parameter.
    Param(String),

    /// `{{limit:preset}}`: a named constant.
    Preset(String),
}

/// Argument of an `{{offset}}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetArg {
    /// `{{offset}}`: bind the method parameter named `offset`.
    Auto,

    /// `{{offset @name}}`: bind an explicit parameter.
    Param(String),
}

/// A `{{...}}` placeholder node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `{{table}}`
    Table,

    /// `{{columns}}`
    Columns,

    /// `{{pk}}`
    Pk,

    /// `{{limit}}` and variants.
    Limit(LimitArg),

    /// `{{offset}}` and variants.
    Offset(OffsetArg),

    /// `{{bool_true}}`
    BoolTrue,

    /// `{{bool_false}}`
    BoolFalse,

    /// `{{current_timestamp}}`
    CurrentTimestamp,

    /// `{{returning_id}}`
    ReturningId,

    /// `{{where @param}}`
    Where(String),

    /// `{{set @param}}`
    Set(String),

    /// `{{set_columns}}`
    SetColumns,

    /// `{{batch_values}}`
    BatchValues,

    /// `{{truncate}}`
    Truncate,

    /// `{{analyze}}`
    Analyze,

    /// Any other name; resolved against fragment/identifier parameters by
    /// the binding planner.
    Custom(String),
}

/// One lexed segment of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal SQL text.
    Lit(String),

    /// `@name` parameter reference in literal text.
    Param(String),

    /// A `{{...}}` placeholder.
    Placeholder(Placeholder),
}

/// Lexer failure, located by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    /// Human-readable reason.
    pub message: String,
}

impl TemplateError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lex a template into segments.
pub fn tokenize(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '\'' => {
                // Copy a single-quoted SQL string verbatim, honoring the
                // doubled-quote escape.
                literal.push('\'');
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    literal.push(c);
                    if c == '\'' {
                        if matches!(chars.peek(), Some((_, '\''))) {
                            let (_, c) = chars.next().expect("peeked");
                            literal.push(c);
                        } else {
                            closed = true;
                            break;
                        }
                    }
                }
                if !closed {
                    return Err(TemplateError::new("unterminated string literal"));
                }
            }
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                flush(&mut segments, &mut literal);
                let start = pos + 2;
                let end = template[start..]
                    .find("}}")
                    .map(|offset| start + offset)
                    .ok_or_else(|| TemplateError::new("unclosed `{{` placeholder"))?;
                let inner = &template[start..end];
                if inner.contains('{') {
                    return Err(TemplateError::new("placeholders cannot nest"));
                }
                segments.push(Segment::Placeholder(parse_placeholder(inner.trim())?));
                // Skip to just past the closing braces.
                while let Some((p, _)) = chars.peek().copied() {
                    if p < end + 2 {
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            '@' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.peek().copied() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    literal.push('@');
                } else {
                    flush(&mut segments, &mut literal);
                    segments.push(Segment::Param(name));
                }
            }
            other => literal.push(other),
        }
    }
    flush(&mut segments, &mut literal);
    Ok(segments)
}

fn flush(segments: &mut Vec<Segment>, literal: &mut String) {
    if !literal.is_empty() {
        segments.push(Segment::Lit(std::mem::take(literal)));
    }
}

fn parse_placeholder(inner: &str) -> Result<Placeholder, TemplateError> {
    if inner.is_empty() {
        return Err(TemplateError::new("empty `{{}}` placeholder"));
    }

    // `{{name @param}}`
    if let Some((name, param)) = inner.split_once('@') {
        let name = name.trim();
        let param = param.trim();
        if param.is_empty() {
            return Err(TemplateError::new(format!(
                "`{{{{{name} @...}}}}` is missing its parameter name"
            )));
        }
        return match name {
            "where" => Ok(Placeholder::Where(param.to_string())),
            "set" => Ok(Placeholder::Set(param.to_string())),
            "limit" => Ok(Placeholder::Limit(LimitArg::Param(param.to_string()))),
            "offset" => Ok(Placeholder::Offset(OffsetArg::Param(param.to_string()))),
            other => Err(TemplateError::new(format!(
                "`{{{{{other}}}}}` does not take a parameter argument"
            ))),
        };
    }

    // `{{name:arg}}`
    if let Some((name, arg)) = inner.split_once(':') {
        let name = name.trim();
        let arg = arg.trim();
        return match name {
            "limit" if !arg.is_empty() => Ok(Placeholder::Limit(LimitArg::Preset(arg.to_string()))),
            "limit" => Err(TemplateError::new("`{{limit:}}` is missing its preset name")),
            other => Err(TemplateError::new(format!(
                "`{{{{{other}:...}}}}` does not take a preset argument"
            ))),
        };
    }

    Ok(match inner {
        "table" => Placeholder::Table,
        "columns" => Placeholder::Columns,
        "pk" => Placeholder::Pk,
        "limit" => Placeholder::Limit(LimitArg::Auto),
        "offset" => Placeholder::Offset(OffsetArg::Auto),
        "bool_true" => Placeholder::BoolTrue,
        "bool_false" => Placeholder::BoolFalse,
        "current_timestamp" => Placeholder::CurrentTimestamp,
        "returning_id" => Placeholder::ReturningId,
        "batch_values" => Placeholder::BatchValues,
        "set_columns" => Placeholder::SetColumns,
        "truncate" => Placeholder::Truncate,
        "analyze" => Placeholder::Analyze,
        "where" => {
            return Err(TemplateError::new(
                "`{{where}}` needs a predicate parameter: `{{where @name}}`",
            ));
        }
        "set" => {
            return Err(TemplateError::new(
                "`{{set}}` needs an assignment-list parameter: `{{set @name}}`",
            ));
        }
        other => Placeholder::Custom(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_literal() {
        let segments = tokenize("SELECT 1").unwrap();
        assert_eq!(segments, vec![Segment::Lit("SELECT 1".into())]);
    }

    #[test]
    fn lexes_placeholders_and_params_in_order() {
        let segments =
            tokenize("SELECT {{columns}} FROM {{table}} WHERE {{pk}} = @id").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Lit("SELECT ".into()),
                Segment::Placeholder(Placeholder::Columns),
                Segment::Lit(" FROM ".into()),
                Segment::Placeholder(Placeholder::Table),
                Segment::Lit(" WHERE ".into()),
                Segment::Placeholder(Placeholder::Pk),
                Segment::Lit(" = ".into()),
                Segment::Param("id".into()),
            ]
        );
    }

    #[test]
    fn whitespace_inside_braces_is_insignificant() {
        let segments = tokenize("{{  table  }}").unwrap();
        assert_eq!(segments, vec![Segment::Placeholder(Placeholder::Table)]);
        let segments = tokenize("{{ where   @pred }}").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Placeholder(Placeholder::Where("pred".into()))]
        );
    }

    #[test]
    fn limit_variants() {
        assert_eq!(
            tokenize("{{limit}}").unwrap(),
            vec![Segment::Placeholder(Placeholder::Limit(LimitArg::Auto))]
        );
        assert_eq!(
            tokenize("{{limit:small}}").unwrap(),
            vec![Segment::Placeholder(Placeholder::Limit(LimitArg::Preset(
                "small".into()
            )))]
        );
        assert_eq!(
            tokenize("{{limit @n}}").unwrap(),
            vec![Segment::Placeholder(Placeholder::Limit(LimitArg::Param(
                "n".into()
            )))]
        );
    }

    #[test]
    fn unknown_names_become_custom() {
        assert_eq!(
            tokenize("{{query}}").unwrap(),
            vec![Segment::Placeholder(Placeholder::Custom("query".into()))]
        );
    }

    #[test]
    fn unclosed_placeholder_fails() {
        let err = tokenize("SELECT {{columns FROM t").unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn nested_placeholder_fails() {
        assert!(tokenize("{{a {{b}} }}").is_err());
    }

    #[test]
    fn where_without_param_fails() {
        assert!(tokenize("{{where}}").is_err());
    }

    #[test]
    fn single_brace_is_literal() {
        let segments = tokenize("{json}").unwrap();
        assert_eq!(segments, vec![Segment::Lit("{json}".into())]);
    }

    #[test]
    fn at_inside_string_literal_is_not_a_param() {
        let segments = tokenize("WHERE email = 'a@b.com' AND id = @id").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Lit("WHERE email = 'a@b.com' AND id = ".into()),
                Segment::Param("id".into()),
            ]
        );
    }

    #[test]
    fn doubled_quote_escape_inside_string() {
        let segments = tokenize("WHERE note = 'it''s @here'").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Lit("WHERE note = 'it''s @here'".into())]
        );
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(tokenize("WHERE a = 'oops").is_err());
    }

    #[test]
    fn bare_at_sign_stays_literal() {
        let segments = tokenize("SELECT '@' , @ FROM t").unwrap();
        assert!(matches!(&segments[0], Segment::Lit(text) if text.contains("@ FROM")));
    }

    #[test]
    fn empty_placeholder_fails() {
        assert!(tokenize("{{}}").is_err());
        assert!(tokenize("{{  }}").is_err());
    }
}
