// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Runtime value union for SQL parameters and scalar results.
//!
//! Every parameter a generated method binds, and every scalar it reads
//! back, travels as a [`SqlValue`]. Date/time values are carried as
//! ISO-8601 text: the portable `sqlx::Any` driver has no cross-database
//! datetime codec, and `{{current_timestamp}}` covers the server-side
//! cases.

use crate::error::RepoError;

/// A dynamically typed SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean. Rendered as a dialect literal in boolean-column positions.
    Bool(bool),

    /// Any integer width; bound as 64-bit.
    Int(i64),

    /// Any float width; bound as 64-bit.
    Float(f64),

    /// Character data, including ISO-8601 timestamps.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// True for [`SqlValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the carried type, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Escape LIKE pattern metacharacters (`\`, `%`, `_`) in user input.
    ///
    /// The escape character is `\`, matching the `ESCAPE` clause the
    /// expression renderer emits.
    #[must_use]
    pub fn escape_like(input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for ch in input.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }

    /// Require an integer, raising [`RepoError::NullScalar`] on NULL.
    pub fn require_i64(&self) -> Result<i64, RepoError> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Null => Err(RepoError::NullScalar),
            other => Err(RepoError::Mapping(format!(
                "expected int, found {}",
                other.type_name()
            ))),
        }
    }

    /// Integer or NULL.
    pub fn opt_i64(&self) -> Result<Option<i64>, RepoError> {
        match self {
            Self::Null => Ok(None),
            other => other.require_i64().map(Some),
        }
    }

    /// Require a float; integers widen.
    pub fn require_f64(&self) -> Result<f64, RepoError> {
        match self {
            Self::Float(v) => Ok(*v),
            Self::Int(v) => Ok(*v as f64),
            Self::Null => Err(RepoError::NullScalar),
            other => Err(RepoError::Mapping(format!(
                "expected float, found {}",
                other.type_name()
            ))),
        }
    }

    /// Float or NULL; integers widen.
    pub fn opt_f64(&self) -> Result<Option<f64>, RepoError> {
        match self {
            Self::Null => Ok(None),
            other => other.require_f64().map(Some),
        }
    }

    /// Require a boolean; integers 0/1 coerce (SQLite and MySQL store
    /// booleans as integers).
    pub fn require_bool(&self) -> Result<bool, RepoError> {
        match self {
            Self::Bool(v) => Ok(*v),
            Self::Int(v) => Ok(*v != 0),
            Self::Null => Err(RepoError::NullScalar),
            other => Err(RepoError::Mapping(format!(
                "expected bool, found {}",
                other.type_name()
            ))),
        }
    }

    /// Boolean or NULL.
    pub fn opt_bool(&self) -> Result<Option<bool>, RepoError> {
        match self {
            Self::Null => Ok(None),
            other => other.require_bool().map(Some),
        }
    }

    /// Require text.
    pub fn require_text(&self) -> Result<String, RepoError> {
        match self {
            Self::Text(v) => Ok(v.clone()),
            Self::Null => Err(RepoError::NullScalar),
            other => Err(RepoError::Mapping(format!(
                "expected text, found {}",
                other.type_name()
            ))),
        }
    }

    /// Text or NULL.
    pub fn opt_text(&self) -> Result<Option<String>, RepoError> {
        match self {
            Self::Null => Ok(None),
            other => other.require_text().map(Some),
        }
    }

    /// Require binary data.
    pub fn require_bytes(&self) -> Result<Vec<u8>, RepoError> {
        match self {
            Self::Bytes(v) => Ok(v.clone()),
            Self::Null => Err(RepoError::NullScalar),
            other => Err(RepoError::Mapping(format!(
                "expected bytes, found {}",
                other.type_name()
            ))),
        }
    }

    /// Binary data or NULL.
    pub fn opt_bytes(&self) -> Result<Option<Vec<u8>>, RepoError> {
        match self {
            Self::Null => Ok(None),
            other => other.require_bytes().map(Some),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_option_none_is_null() {
        let v: SqlValue = Option::<i64>::None.into();
        assert!(v.is_null());
    }

    #[test]
    fn from_option_some() {
        let v: SqlValue = Some("hi").into();
        assert_eq!(v, SqlValue::Text("hi".into()));
    }

    #[test]
    fn require_i64_null_is_null_scalar() {
        assert!(matches!(
            SqlValue::Null.require_i64(),
            Err(RepoError::NullScalar)
        ));
    }

    #[test]
    fn require_i64_wrong_type_is_mapping() {
        assert!(matches!(
            SqlValue::Text("x".into()).require_i64(),
            Err(RepoError::Mapping(_))
        ));
    }

    #[test]
    fn require_f64_widens_int() {
        assert_eq!(SqlValue::Int(3).require_f64().unwrap(), 3.0);
    }

    #[test]
    fn require_bool_coerces_int() {
        assert!(SqlValue::Int(1).require_bool().unwrap());
        assert!(!SqlValue::Int(0).require_bool().unwrap());
    }

    #[test]
    fn opt_text_null() {
        assert_eq!(SqlValue::Null.opt_text().unwrap(), None);
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(SqlValue::escape_like("50%_\\"), "50\\%\\_\\\\");
    }

    #[test]
    fn escape_like_passes_plain_text() {
        assert_eq!(SqlValue::escape_like("plain"), "plain");
    }
}
