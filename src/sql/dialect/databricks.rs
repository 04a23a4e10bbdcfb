//! Databricks SQL dialect.
//!
//! Spark SQL semantics: backtick identifiers, lowercase builtin casing,
//! `date_add`/`add_months` date arithmetic.

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;
use crate::sql::expr::{lit_str, Expr};

use super::{helpers, DialectCapabilities, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct Databricks;

impl SqlDialect for Databricks {
    fn name(&self) -> &'static str {
        "databricks"
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_cte: true,
            supports_arrays: true,
            ..Default::default()
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
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
        helpers::lowered_contains(column, pattern, "lower")
    }

    fn current_date_sql(&self) -> &'static str {
        "current_date()"
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        match unit {
            RelativeUnit::Day => format!("date_add({}, {})", date_sql, count),
            RelativeUnit::Week => format!("date_add({}, {})", date_sql, count * 7),
            RelativeUnit::Month => format!("add_months({}, {})", date_sql, count),
            RelativeUnit::Year => format!("add_months({}, {})", date_sql, count * 12),
        }
    }
}
