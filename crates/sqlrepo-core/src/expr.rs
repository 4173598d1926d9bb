// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Expression builder DSL and its SQL renderer.
//!
//! Predicates and SET projections are built as values, never compiled at
//! run time:
//!
//! ```rust
//! use sqlrepo_core::expr::{col, param, val};
//!
//! let predicate = col("age").gt(val(18)).and(col("name").contains("bob"));
//! let reusable = col("score").ge(param("cutoff"));
//! ```
//!
//! [`ExprToSql`] renders a tree against a dialect and an entity's column
//! map into a SQL fragment plus an ordered parameter list. Rendering
//! rules:
//!
//! - column references use dialect quoting and the entity's column map
//! - captured values become anonymous slots `p0, p1, ...`
//! - [`param`] markers become named slots, shared per name, unfilled until
//!   [`Predicate::bind`] or [`RenderedSql::bind`] supplies a value
//! - boolean values compared against boolean columns render as dialect
//!   literals, not parameters
//! - `contains` over an empty collection renders `1=0` with no parameters
//! - string matching escapes `%`/`_` in the runtime value; the SQL keeps
//!   the parameter marker unchanged

use std::collections::HashMap;

use crate::{
    dialect::{DialectDef, ParamStyle},
    entity::{ColumnDef, Entity, find_column},
    error::RepoError,
    value::SqlValue,
};

/// Binary operators of the expression IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `LIKE`
    Like,
}

impl BinOp {
    const fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Like => "LIKE",
        }
    }
}

/// A node of the expression IR.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to an entity column, by field or column name.
    Column(String),

    /// A captured value; becomes an anonymous parameter slot.
    Value(SqlValue),

    /// A named placeholder; becomes a named slot filled later.
    Param(String),

    /// Binary operation.
    Binary {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },

    /// Logical negation.
    Not(Box<Expr>),

    /// `LOWER(...)`.
    Lower(Box<Expr>),

    /// `<target> IN (...)` over a captured collection.
    InList {
        /// The tested expression.
        target: Box<Expr>,
        /// Base name for the expanded slots.
        base: String,
        /// Collection items.
        items: Vec<SqlValue>,
    },

    /// `<expr> IS NULL`.
    IsNull(Box<Expr>),

    /// `<expr> IS NOT NULL`.
    IsNotNull(Box<Expr>),
}

/// Reference a column by field or column name.
#[must_use]
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Capture a value as an anonymous parameter.
#[must_use]
pub fn val(value: impl Into<SqlValue>) -> Expr {
    Expr::Value(value.into())
}

/// Declare a named placeholder, filled later via [`Predicate::bind`].
///
/// Two occurrences of the same name share one logical slot.
#[must_use]
pub fn param(name: impl Into<String>) -> Expr {
    Expr::Param(name.into())
}

impl From<SqlValue> for Expr {
    fn from(value: SqlValue) -> Self {
        Expr::Value(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        val(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        val(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        val(value)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        val(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        val(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        val(value)
    }
}

impl Expr {
    fn binary(self, op: BinOp, rhs: impl Into<Expr>) -> Predicate {
        Predicate::from_expr(Expr::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        })
    }

    /// `self = rhs`.
    pub fn eq(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Eq, rhs)
    }

    /// `self <> rhs`.
    pub fn ne(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Ne, rhs)
    }

    /// `self < rhs`.
    pub fn lt(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Le, rhs)
    }

    /// `self > rhs`.
    pub fn gt(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(self, rhs: impl Into<Expr>) -> Predicate {
        self.binary(BinOp::Ge, rhs)
    }

    /// Case-insensitive equality: `LOWER(self) = LOWER(rhs)`.
    pub fn eq_ignore_case(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::from_expr(Expr::Binary {
            op: BinOp::Eq,
            lhs: Box::new(Expr::Lower(Box::new(self))),
            rhs: Box::new(Expr::Lower(Box::new(rhs.into()))),
        })
    }

    /// Substring match: `self LIKE '%value%'` with metacharacters escaped
    /// in the bound value.
    pub fn contains(self, value: &str) -> Predicate {
        self.binary(
            BinOp::Like,
            Expr::Value(SqlValue::Text(format!("%{}%", SqlValue::escape_like(value)))),
        )
    }

    /// Prefix match: `self LIKE 'value%'`.
    pub fn starts_with(self, value: &str) -> Predicate {
        self.binary(
            BinOp::Like,
            Expr::Value(SqlValue::Text(format!("{}%", SqlValue::escape_like(value)))),
        )
    }

    /// Suffix match: `self LIKE '%value'`.
    pub fn ends_with(self, value: &str) -> Predicate {
        self.binary(
            BinOp::Like,
            Expr::Value(SqlValue::Text(format!("%{}", SqlValue::escape_like(value)))),
        )
    }

    /// Membership test against a captured collection. Slots are named
    /// after the column; use [`Expr::in_collection`] to pick the base
    /// name.
    pub fn in_list<I, V>(self, items: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let base = match &self {
            Expr::Column(name) => name.clone(),
            _ => "item".to_string(),
        };
        self.in_collection(base, items)
    }

    /// Membership test with an explicit base name for the expanded slots
    /// (`base_0`, `base_1`, ...).
    pub fn in_collection<I, V>(self, base: impl Into<String>, items: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Predicate::from_expr(Expr::InList {
            target: Box::new(self),
            base: base.into(),
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// `self IS NULL`.
    pub fn is_null(self) -> Predicate {
        Predicate::from_expr(Expr::IsNull(Box::new(self)))
    }

    /// `self IS NOT NULL`.
    pub fn is_not_null(self) -> Predicate {
        Predicate::from_expr(Expr::IsNotNull(Box::new(self)))
    }
}

/// A boolean expression over an entity, plus any placeholder fills.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    expr: Expr,
    fills: Vec<(String, SqlValue)>,
}

impl Predicate {
    fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            fills: Vec::new(),
        }
    }

    /// Conjunction; placeholder fills from both sides are kept.
    #[must_use]
    pub fn and(mut self, other: Predicate) -> Predicate {
        let mut fills = std::mem::take(&mut self.fills);
        fills.extend(other.fills);
        Predicate {
            expr: Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(self.expr),
                rhs: Box::new(other.expr),
            },
            fills,
        }
    }

    /// Disjunction; placeholder fills from both sides are kept.
    #[must_use]
    pub fn or(mut self, other: Predicate) -> Predicate {
        let mut fills = std::mem::take(&mut self.fills);
        fills.extend(other.fills);
        Predicate {
            expr: Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(self.expr),
                rhs: Box::new(other.expr),
            },
            fills,
        }
    }

    /// Negation.
    #[must_use]
    pub fn not(self) -> Predicate {
        Predicate {
            expr: Expr::Not(Box::new(self.expr)),
            fills: self.fills,
        }
    }

    /// Supply a value for a named placeholder declared with [`param`].
    ///
    /// Filling a name the predicate never declares fails at render time
    /// with [`RepoError::UnknownParameter`], listing the declared names.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.fills.push((name.into(), value.into()));
        self
    }

    /// The underlying expression tree.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// An ordered list of column assignments for SET clauses.
///
/// Unlisted columns are not touched by the rendered UPDATE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetList {
    sets: Vec<(String, Expr)>,
    fills: Vec<(String, SqlValue)>,
}

impl SetList {
    /// Empty assignment list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `column = expr`, keeping call order.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.sets.push((column.into(), value.into()));
        self
    }

    /// Supply a value for a named placeholder used in an assignment.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.fills.push((name.into(), value.into()));
        self
    }

    /// Number of assignments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True when no assignments were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// One parameter slot of a rendered fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedParam {
    /// Slot name: `p0, p1, ...` for captured values, the declared name for
    /// placeholders, `base_i` for collection expansions.
    pub name: String,

    /// The value, absent for not-yet-filled placeholders.
    pub value: Option<SqlValue>,

    /// True for slots created by [`param`] markers.
    pub placeholder: bool,
}

/// A rendered SQL fragment plus its ordered parameter slots.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    /// The SQL fragment, without a leading keyword.
    pub sql: String,

    /// Parameter slots in order of first textual occurrence.
    pub params: Vec<RenderedParam>,
}

impl RenderedSql {
    /// Fill a named placeholder slot after rendering.
    pub fn bind(
        mut self,
        name: &str,
        value: impl Into<SqlValue>,
    ) -> Result<RenderedSql, RepoError> {
        let value = value.into();
        let mut hit = false;
        for slot in &mut self.params {
            if slot.placeholder && slot.name == name {
                slot.value = Some(value.clone());
                hit = true;
            }
        }
        if hit {
            Ok(self)
        } else {
            Err(RepoError::UnknownParameter {
                name: name.to_string(),
                available: self.placeholder_names(),
            })
        }
    }

    /// Names of the declared placeholder slots, deduplicated, in order.
    #[must_use]
    pub fn placeholder_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for slot in &self.params {
            if slot.placeholder && !names.iter().any(|n| n == &slot.name) {
                names.push(slot.name.clone());
            }
        }
        names
    }

    /// Extract the bind values in slot order.
    ///
    /// Fails with [`RepoError::UnboundParameter`] when a placeholder was
    /// never filled.
    pub fn into_values(self) -> Result<Vec<SqlValue>, RepoError> {
        self.params
            .into_iter()
            .map(|slot| {
                slot.value
                    .ok_or_else(|| RepoError::UnboundParameter(slot.name))
            })
            .collect()
    }
}

/// Renders expression trees against a dialect and a column map.
#[derive(Debug, Clone, Copy)]
pub struct ExprToSql<'a> {
    dialect: &'static DialectDef,
    columns: &'a [ColumnDef],
    start_index: usize,
}

impl<'a> ExprToSql<'a> {
    /// Renderer over an explicit column map.
    #[must_use]
    pub fn new(dialect: &'static DialectDef, columns: &'a [ColumnDef]) -> Self {
        Self {
            dialect,
            columns,
            start_index: 1,
        }
    }

    /// Renderer over an entity's columns.
    #[must_use]
    pub fn for_entity<E: Entity>(dialect: &'static DialectDef) -> ExprToSql<'static> {
        ExprToSql::new(dialect, E::COLUMNS)
    }

    /// Set the 1-based index of the first slot, for composing after
    /// earlier parameters in the same statement.
    #[must_use]
    pub fn starting_at(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    /// Render a predicate to a WHERE fragment (without the keyword).
    pub fn where_clause(&self, predicate: &Predicate) -> Result<RenderedSql, RepoError> {
        let mut ctx = Ctx::new(self.dialect, self.columns, self.start_index);
        let sql = ctx.walk(&predicate.expr)?;
        ctx.apply_fills(&predicate.fills)?;
        Ok(RenderedSql {
            sql,
            params: ctx.slots,
        })
    }

    /// Render an assignment list to a SET fragment (without the keyword),
    /// in member order.
    pub fn set_clause(&self, sets: &SetList) -> Result<RenderedSql, RepoError> {
        let mut ctx = Ctx::new(self.dialect, self.columns, self.start_index);
        let mut parts = Vec::with_capacity(sets.sets.len());
        for (column, value) in &sets.sets {
            let target = ctx.column_sql(column)?;
            let rendered = ctx.walk(value)?;
            parts.push(format!("{target} = {rendered}"));
        }
        ctx.apply_fills(&sets.fills)?;
        Ok(RenderedSql {
            sql: parts.join(", "),
            params: ctx.slots,
        })
    }
}

struct Ctx<'a> {
    dialect: &'static DialectDef,
    columns: &'a [ColumnDef],
    next_index: usize,
    anon_counter: usize,
    slots: Vec<RenderedParam>,
    named_refs: HashMap<String, String>,
}

impl<'a> Ctx<'a> {
    fn new(dialect: &'static DialectDef, columns: &'a [ColumnDef], start_index: usize) -> Self {
        Self {
            dialect,
            columns,
            next_index: start_index,
            anon_counter: 0,
            slots: Vec::new(),
            named_refs: HashMap::new(),
        }
    }

    fn column_sql(&self, name: &str) -> Result<String, RepoError> {
        let column = find_column(self.columns, name)
            .ok_or_else(|| RepoError::UnknownColumn(name.to_string()))?;
        Ok(self.dialect.quote_ident(column.name))
    }

    fn column_def(&self, expr: &Expr) -> Option<&ColumnDef> {
        match expr {
            Expr::Column(name) => find_column(self.columns, name),
            _ => None,
        }
    }

    fn push_value(&mut self, value: SqlValue) -> String {
        let name = format!("p{}", self.anon_counter);
        self.anon_counter += 1;
        let sql = self.dialect.param_ref(&name, self.next_index);
        self.next_index += 1;
        self.slots.push(RenderedParam {
            name,
            value: Some(value),
            placeholder: false,
        });
        sql
    }

    fn push_placeholder(&mut self, name: &str) -> String {
        // Named-marker dialects share one slot per name; positional and
        // indexed dialects repeat the slot at each occurrence.
        if matches!(self.dialect.param_style, ParamStyle::Named(_)) {
            if let Some(existing) = self.named_refs.get(name) {
                return existing.clone();
            }
        }
        let sql = self.dialect.param_ref(name, self.next_index);
        self.next_index += 1;
        self.slots.push(RenderedParam {
            name: name.to_string(),
            value: None,
            placeholder: true,
        });
        self.named_refs.insert(name.to_string(), sql.clone());
        sql
    }

    fn apply_fills(&mut self, fills: &[(String, SqlValue)]) -> Result<(), RepoError> {
        for (name, value) in fills {
            let mut hit = false;
            for slot in &mut self.slots {
                if slot.placeholder && &slot.name == name {
                    slot.value = Some(value.clone());
                    hit = true;
                }
            }
            if !hit {
                let available = self
                    .slots
                    .iter()
                    .filter(|s| s.placeholder)
                    .map(|s| s.name.clone())
                    .collect();
                return Err(RepoError::UnknownParameter {
                    name: name.clone(),
                    available,
                });
            }
        }
        Ok(())
    }

    fn walk(&mut self, expr: &Expr) -> Result<String, RepoError> {
        match expr {
            Expr::Column(name) => self.column_sql(name),
            Expr::Value(value) => Ok(self.push_value(value.clone())),
            Expr::Param(name) => Ok(self.push_placeholder(name)),
            Expr::Binary { op, lhs, rhs } => self.walk_binary(*op, lhs, rhs),
            Expr::Not(inner) => Ok(format!("NOT ({})", self.walk(inner)?)),
            Expr::Lower(inner) => Ok(format!("LOWER({})", self.walk(inner)?)),
            Expr::InList {
                target,
                base,
                items,
            } => self.walk_in_list(target, base, items),
            Expr::IsNull(inner) => Ok(format!("{} IS NULL", self.walk(inner)?)),
            Expr::IsNotNull(inner) => Ok(format!("{} IS NOT NULL", self.walk(inner)?)),
        }
    }

    fn walk_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<String, RepoError> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let left = self.walk(lhs)?;
            let right = self.walk(rhs)?;
            return Ok(format!("({left} {} {right})", op.sql()));
        }

        // Boolean literals against boolean columns render inline.
        if matches!(op, BinOp::Eq | BinOp::Ne) {
            if let (Some(column), Expr::Value(SqlValue::Bool(b))) = (self.column_def(lhs), rhs) {
                if column.boolean {
                    let left = self.walk(lhs)?;
                    return Ok(format!("{left} {} {}", op.sql(), self.dialect.render_bool(*b)));
                }
            }
        }

        let left = self.walk(lhs)?;
        let right = self.walk(rhs)?;
        let escape = if matches!(op, BinOp::Like) {
            self.dialect.like_escape
        } else {
            ""
        };
        Ok(format!("{left} {} {right}{escape}", op.sql()))
    }

    fn walk_in_list(
        &mut self,
        target: &Expr,
        base: &str,
        items: &[SqlValue],
    ) -> Result<String, RepoError> {
        if items.is_empty() {
            return Ok("1=0".to_string());
        }
        let target_sql = self.walk(target)?;
        let mut refs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let name = format!("{base}_{i}");
            let sql = self.dialect.param_ref(&name, self.next_index);
            self.next_index += 1;
            self.slots.push(RenderedParam {
                name,
                value: Some(item.clone()),
                placeholder: false,
            });
            refs.push(sql);
        }
        Ok(format!("{target_sql} IN ({})", refs.join(", ")))
    }
}
