//! SQL generation: a typed statement AST rendered to multi-dialect SQL.
//!
//! - [`expr`] - expression AST and builder DSL
//! - [`query`] - SELECT statement AST and fluent builder
//! - [`token`] - token types; quoting and escaping live here
//! - [`dialect`] - per-warehouse dialect implementations and registry

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

pub use dialect::{Dialect, DialectCapabilities, SqlDialect};
pub use expr::{
    and_all, avg, col, count, count_distinct, func, lit_bool, lit_float, lit_int, lit_null,
    lit_str, max, min, raw_sql, star, sum, table_col, BinaryOperator, Expr, ExprExt, Literal,
    UnaryOperator,
};
pub use query::{
    Cte, CteBody, FromClause, JoinClause, JoinKind, OrderByItem, Select, TableSource, UnionAll,
};
pub use token::{Token, TokenStream};
