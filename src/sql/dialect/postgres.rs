//! PostgreSQL dialect.
//!
//! - ANSI double-quote identifiers
//! - `date_trunc('grain', expr)` time truncation
//! - ILIKE for case-insensitive matching
//! - `CURRENT_DATE + INTERVAL` date arithmetic

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;
use crate::sql::expr::{lit_str, BinaryOperator, Expr};

use super::{helpers, DialectCapabilities, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_cte: true,
            supports_arrays: true,
            supports_ilike: true,
            ..Default::default()
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn render_time_grain(&self, expr: Expr, grain: TimeGrain) -> Expr {
        Expr::Function {
            name: "date_trunc".into(),
            args: vec![lit_str(grain.as_str()), expr],
            distinct: false,
            within_group: vec![],
        }
    }

    fn render_string_contains(&self, column: Expr, pattern: Expr) -> Expr {
        helpers::like_contains(column, pattern, BinaryOperator::ILike)
    }

    fn current_date_sql(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        format!("{} + INTERVAL '{} {}'", date_sql, count, unit.as_str())
    }
}
