//! SELECT statement AST with a fluent builder.
//!
//! `Select` is the value type planners produce; the consuming builder methods
//! are the short-lived mutable accumulator that finalizes into it.

use super::dialect::Dialect;
use super::expr::Expr;
use super::token::{Token, TokenStream};

/// A table source: a pre-qualified physical name (`database.schema.table`,
/// emitted unquoted) or a subquery.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table(String),
    Subquery(Box<Select>),
}

impl TableSource {
    fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            TableSource::Table(name) => {
                ts.push(Token::Raw(name.clone()));
            }
            TableSource::Subquery(select) => {
                ts.lparen().newline();
                ts.append(&select.to_tokens_for_dialect(dialect));
                ts.newline().rparen();
            }
        }
        ts
    }
}

/// FROM clause: source with optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: TableSource,
    pub alias: Option<String>,
}

impl FromClause {
    fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = self.source.to_tokens_for_dialect(dialect);
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

/// SQL join kinds. The planners only emit LEFT joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub source: TableSource,
    pub alias: Option<String>,
    pub on: Option<Expr>,
}

impl JoinClause {
    fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self.kind {
            JoinKind::Left => ts.push(Token::Left),
            JoinKind::Inner => ts.push(Token::Inner),
        };
        ts.space().push(Token::Join).space();
        ts.append(&self.source.to_tokens_for_dialect(dialect));
        if let Some(alias) = &self.alias {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        if let Some(on) = &self.on {
            ts.space().push(Token::On).space();
            ts.append(&on.to_tokens_for_dialect(dialect));
        }
        ts
    }
}

/// ORDER BY item. Direction is always rendered explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub desc: bool,
}

impl OrderByItem {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = self.expr.to_tokens_for_dialect(dialect);
        ts.space()
            .push(if self.desc { Token::Desc } else { Token::Asc });
        ts
    }
}

/// UNION ALL of multiple SELECT statements.
///
/// With `by_name` set (Snowflake), legs are combined by column name via
/// `UNION ALL BY NAME` instead of positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionAll {
    pub selects: Vec<Select>,
    pub by_name: bool,
}

impl UnionAll {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        for (i, select) in self.selects.iter().enumerate() {
            if i > 0 {
                ts.newline().push(Token::Union).space().push(Token::All);
                if self.by_name {
                    ts.space().push(Token::ByName);
                }
                ts.newline();
            }
            ts.append(&select.to_tokens_for_dialect(dialect));
        }
        ts
    }
}

/// Body of a common table expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CteBody {
    Select(Box<Select>),
    Union(UnionAll),
}

/// Common table expression: `WITH name AS (body)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub body: CteBody,
}

impl Cte {
    fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.name.clone()))
            .space()
            .push(Token::As)
            .space()
            .lparen()
            .newline();
        match &self.body {
            CteBody::Select(select) => ts.append(&select.to_tokens_for_dialect(dialect)),
            CteBody::Union(union) => ts.append(&union.to_tokens_for_dialect(dialect)),
        };
        ts.newline().rparen();
        ts
    }
}

/// A complete SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub ctes: Vec<Cte>,
    pub projections: Vec<Expr>,
    pub from: Option<FromClause>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one projection.
    pub fn select(mut self, expr: Expr) -> Self {
        self.projections.push(expr);
        self
    }

    /// Set the FROM clause to a physical table.
    pub fn from_table(mut self, qualified: &str, alias: &str) -> Self {
        self.from = Some(FromClause {
            source: TableSource::Table(qualified.into()),
            alias: Some(alias.into()),
        });
        self
    }

    /// Add a LEFT JOIN to a physical table.
    pub fn left_join(mut self, qualified: &str, alias: &str, on: Expr) -> Self {
        self.joins.push(JoinClause {
            kind: JoinKind::Left,
            source: TableSource::Table(qualified.into()),
            alias: Some(alias.into()),
            on: Some(on),
        });
        self
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn and_where(mut self, condition: Expr) -> Self {
        use super::expr::ExprExt;
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    /// Add a HAVING condition, ANDed with any existing one.
    pub fn and_having(mut self, condition: Expr) -> Self {
        use super::expr::ExprExt;
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn order_by(mut self, expr: Expr, desc: bool) -> Self {
        self.order_by.push(OrderByItem { expr, desc });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        if !self.ctes.is_empty() {
            ts.push(Token::With).space();
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    ts.comma().newline();
                }
                ts.append(&cte.to_tokens_for_dialect(dialect));
            }
            ts.newline();
        }

        ts.push(Token::Select);
        if self.projections.is_empty() {
            ts.space().push(Token::Star);
        } else {
            ts.space();
            for (i, expr) in self.projections.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            ts.append(&from.to_tokens_for_dialect(dialect));
        }

        for join in &self.joins {
            ts.newline();
            ts.append(&join.to_tokens_for_dialect(dialect));
        }

        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens_for_dialect(dialect));
        }

        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }
        }

        if let Some(having) = &self.having {
            ts.newline().push(Token::Having).space();
            ts.append(&having.to_tokens_for_dialect(dialect));
        }

        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&item.to_tokens_for_dialect(dialect));
            }
        }

        if let Some(limit) = &self.limit {
            ts.newline()
                .push(Token::Limit)
                .space()
                .push(Token::LitInt(*limit as i64));
        }

        ts
    }

    /// Render this statement for a dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}
