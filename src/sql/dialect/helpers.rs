//! Shared building blocks for dialect implementations.

use crate::sql::expr::{func, BinaryOperator, Expr};

use super::wildcard_pattern;

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, Snowflake, ClickHouse, Dremio.
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: Databricks (Spark SQL).
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// `column <op> '%' || pattern || '%'` where `<op>` is LIKE or ILIKE.
pub fn like_contains(column: Expr, pattern: Expr, op: BinaryOperator) -> Expr {
    Expr::BinaryOp {
        left: Box::new(column),
        op,
        right: Box::new(wildcard_pattern(pattern)),
    }
}

/// `<case>(column) LIKE '%' || <case>(pattern) || '%'` for dialects without
/// ILIKE. `lower_fn` carries the dialect's exact function casing.
pub fn lowered_contains(column: Expr, pattern: Expr, lower_fn: &str) -> Expr {
    Expr::BinaryOp {
        left: Box::new(func(lower_fn, vec![column])),
        op: BinaryOperator::Like,
        right: Box::new(wildcard_pattern(func(lower_fn, vec![pattern]))),
    }
}
