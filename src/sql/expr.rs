//! Expression AST - the core of SQL expression building.
//!
//! Every node is value-typed and immutable once built; rendering walks the
//! tree into a token stream. No dialect-specific text lives in the AST —
//! the `Raw` escape hatch is reserved for a handful of pre-rendered dialect
//! fragments (relative-date endpoints).

use super::dialect::Dialect;
use super::query::{OrderByItem, Select};
use super::token::{Token, TokenStream};

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
    Concat,
    Like,
    NotLike,
    ILike,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

/// A SQL expression.
///
/// Binary operations render without automatic parentheses; grouping that
/// must survive into the output is explicit via `Paren`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    /// Column reference, optionally qualified by a table alias.
    Column {
        table: Option<String>,
        column: String,
    },

    /// `*` or `table.*`
    Star { table: Option<String> },

    /// `expr AS "alias"`
    Aliased { expr: Box<Expr>, alias: String },

    /// Function call. `within_group` carries the LISTAGG ordering clause.
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
        within_group: Vec<OrderByItem>,
    },

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },

    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },

    InList {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    Case {
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    Cast {
        expr: Box<Expr>,
        type_name: String,
    },

    Subquery(Box<Select>),

    /// Window function: `name(args) OVER (PARTITION BY .. ORDER BY ..)`.
    Window {
        name: String,
        args: Vec<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<OrderByItem>,
    },

    /// Parenthesized expression.
    Paren(Box<Expr>),

    /// Raw SQL fragment. Trusted pre-rendered dialect text only.
    Raw(String),
}

impl Expr {
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Aliased { expr, alias } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::Ident(alias.clone()));
            }

            Expr::Function {
                name,
                args,
                distinct,
                within_group,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
                if !within_group.is_empty() {
                    ts.space().push(Token::WithinGroup).space().lparen();
                    ts.push(Token::OrderBy).space();
                    for (i, item) in within_group.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&item.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(binary_op_token(*op));
                ts.space();
                ts.append(&right.to_tokens_for_dialect(dialect));
            }

            Expr::UnaryOp { op, expr } => {
                ts.push(match op {
                    UnaryOperator::Not => Token::Not,
                    UnaryOperator::Minus => Token::Minus,
                });
                ts.space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::InList {
                expr,
                values,
                negated,
            } => {
                // "x IN ()" is invalid SQL: an empty list degenerates to a
                // constant predicate.
                if values.is_empty() {
                    ts.push(Token::LitBool(*negated));
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::Case {
                when_clauses,
                else_clause,
            } => {
                ts.push(Token::Case);
                for (when, then) in when_clauses {
                    ts.space().push(Token::When).space();
                    ts.append(&when.to_tokens_for_dialect(dialect));
                    ts.space().push(Token::Then).space();
                    ts.append(&then.to_tokens_for_dialect(dialect));
                }
                if let Some(else_expr) = else_clause {
                    ts.space().push(Token::Else).space();
                    ts.append(&else_expr.to_tokens_for_dialect(dialect));
                }
                ts.space().push(Token::End);
            }

            Expr::Cast { expr, type_name } => {
                ts.push(Token::Cast).push(Token::LParen);
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::Raw(type_name.clone()));
                ts.rparen();
            }

            Expr::Subquery(select) => {
                ts.lparen();
                ts.append(&select.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Window {
                name,
                args,
                partition_by,
                order_by,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
                ts.space().push(Token::Over).space().lparen();
                let mut need_space = false;
                if !partition_by.is_empty() {
                    ts.push(Token::PartitionBy).space();
                    for (i, expr) in partition_by.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&expr.to_tokens_for_dialect(dialect));
                    }
                    need_space = true;
                }
                if !order_by.is_empty() {
                    if need_space {
                        ts.space();
                    }
                    ts.push(Token::OrderBy).space();
                    for (i, item) in order_by.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&item.to_tokens_for_dialect(dialect));
                    }
                }
                ts.rparen();
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }
}

fn binary_op_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Plus => Token::Plus,
        BinaryOperator::Minus => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
        BinaryOperator::Concat => Token::Concat,
        BinaryOperator::Like => Token::Like,
        BinaryOperator::NotLike => Token::NotLike,
        BinaryOperator::ILike => Token::ILike,
    }
}

// =============================================================================
// Expression constructors
// =============================================================================

/// Create an unqualified column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (`table.column`).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
        within_group: vec![],
    }
}

/// SUM(expr)
pub fn sum(expr: Expr) -> Expr {
    func("SUM", vec![expr])
}

/// COUNT(expr)
pub fn count(expr: Expr) -> Expr {
    func("COUNT", vec![expr])
}

/// COUNT(DISTINCT expr)
pub fn count_distinct(expr: Expr) -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![expr],
        distinct: true,
        within_group: vec![],
    }
}

/// AVG(expr)
pub fn avg(expr: Expr) -> Expr {
    func("AVG", vec![expr])
}

/// MIN(expr)
pub fn min(expr: Expr) -> Expr {
    func("MIN", vec![expr])
}

/// MAX(expr)
pub fn max(expr: Expr) -> Expr {
    func("MAX", vec![expr])
}

/// Raw SQL fragment. Trusted static text only - never user input.
pub fn raw_sql(sql: &str) -> Expr {
    Expr::Raw(sql.into())
}

// =============================================================================
// Fluent expression building
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binop(self, op: BinaryOperator, other: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other),
        }
    }

    fn eq(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Eq, other)
    }

    fn ne(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Ne, other)
    }

    fn gt(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Gt, other)
    }

    fn gte(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Gte, other)
    }

    fn lt(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Lt, other)
    }

    fn lte(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Lte, other)
    }

    fn and(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::And, other)
    }

    fn or(self, other: Expr) -> Expr {
        self.binop(BinaryOperator::Or, other)
    }

    fn like(self, pattern: Expr) -> Expr {
        self.binop(BinaryOperator::Like, pattern)
    }

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(Expr::Paren(Box::new(self.into_expr()))),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// Alias this expression for a SELECT list.
    fn alias(self, name: &str) -> Expr {
        Expr::Aliased {
            expr: Box::new(self.into_expr()),
            alias: name.into(),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

/// Chain conditions with AND; `None` when the input is empty.
pub fn and_all(conditions: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    conditions.into_iter().reduce(|acc, cond| acc.and(cond))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> String {
        expr.to_tokens_for_dialect(Dialect::Postgres)
            .serialize(Dialect::Postgres)
    }

    #[test]
    fn test_qualified_column() {
        assert_eq!(render(&table_col("Orders", "PRICE")), "\"Orders\".\"PRICE\"");
    }

    #[test]
    fn test_aggregate_over_product() {
        let expr = sum(table_col("Orders", "PRICE").binop(BinaryOperator::Mul, table_col("Orders", "QUANTITY")));
        assert_eq!(render(&expr), "SUM(\"Orders\".\"PRICE\" * \"Orders\".\"QUANTITY\")");
    }

    #[test]
    fn test_count_distinct() {
        assert_eq!(render(&count_distinct(col("CUSTOMER_ID"))), "COUNT(DISTINCT \"CUSTOMER_ID\")");
    }

    #[test]
    fn test_aliased() {
        let expr = table_col("Customers", "COUNTRY").alias("Country");
        assert_eq!(render(&expr), "\"Customers\".\"COUNTRY\" AS \"Country\"");
    }

    #[test]
    fn test_concat_chain_renders_flat() {
        let expr = lit_str("%")
            .binop(BinaryOperator::Concat, lit_str("United"))
            .binop(BinaryOperator::Concat, lit_str("%"));
        assert_eq!(render(&expr), "'%' || 'United' || '%'");
    }

    #[test]
    fn test_in_list_empty_degenerates() {
        assert_eq!(render(&col("x").in_list(vec![])), "FALSE");
        let not_in = Expr::InList {
            expr: Box::new(col("x")),
            values: vec![],
            negated: true,
        };
        assert_eq!(render(&not_in), "TRUE");
    }

    #[test]
    fn test_between() {
        let expr = col("age").between(lit_int(18), lit_int(65));
        assert_eq!(render(&expr), "\"age\" BETWEEN 18 AND 65");
    }

    #[test]
    fn test_case_guard() {
        let expr = Expr::Case {
            when_clauses: vec![(col("STATUS").eq(lit_str("completed")), col("PRICE"))],
            else_clause: None,
        };
        assert_eq!(
            render(&expr),
            "CASE WHEN \"STATUS\" = 'completed' THEN \"PRICE\" END"
        );
    }

    #[test]
    fn test_cast() {
        let expr = Expr::Cast {
            expr: Box::new(col("x")),
            type_name: "VARCHAR".into(),
        };
        assert_eq!(render(&expr), "CAST(\"x\" AS VARCHAR)");
    }

    #[test]
    fn test_paren_preserved() {
        let expr = Expr::Paren(Box::new(col("a").binop(BinaryOperator::Plus, col("b"))))
            .binop(BinaryOperator::Div, col("c"));
        assert_eq!(render(&expr), "(\"a\" + \"b\") / \"c\"");
    }

    #[test]
    fn test_window_over_empty() {
        let expr = Expr::Window {
            name: "SUM".into(),
            args: vec![col("Revenue")],
            partition_by: vec![],
            order_by: vec![],
        };
        assert_eq!(render(&expr), "SUM(\"Revenue\") OVER ()");
    }

    #[test]
    fn test_listagg_within_group() {
        use crate::sql::query::OrderByItem;
        let expr = Expr::Function {
            name: "LISTAGG".into(),
            args: vec![table_col("Customers", "COUNTRY"), lit_str(", ")],
            distinct: false,
            within_group: vec![OrderByItem {
                expr: table_col("Customers", "COUNTRY"),
                desc: false,
            }],
        };
        assert_eq!(
            render(&expr),
            "LISTAGG(\"Customers\".\"COUNTRY\", ', ') WITHIN GROUP (ORDER BY \"Customers\".\"COUNTRY\" ASC)"
        );
    }

    #[test]
    fn test_and_all() {
        assert_eq!(and_all(vec![]), None);
        let combined = and_all(vec![col("a").eq(lit_int(1)), col("b").eq(lit_int(2))]).unwrap();
        assert_eq!(render(&combined), "\"a\" = 1 AND \"b\" = 2");
    }
}
