//! Snowflake dialect.
//!
//! - Case-sensitive double-quoted identifiers
//! - `DATE_TRUNC('grain', expr)` time truncation
//! - Native `CONTAINS(col, pattern)`
//! - `UNION ALL BY NAME` for column-name-matched set unions

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;
use crate::sql::expr::{lit_str, Expr};

use super::{helpers, DialectCapabilities, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct Snowflake;

impl SqlDialect for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_cte: true,
            supports_qualify: true,
            supports_arrays: true,
            supports_window_filters: true,
            supports_ilike: true,
            supports_time_travel: true,
            supports_semi_structured: true,
            union_by_name: true,
        }
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn render_time_grain(&self, expr: Expr, grain: TimeGrain) -> Expr {
        Expr::Function {
            name: "DATE_TRUNC".into(),
            args: vec![lit_str(grain.as_str()), expr],
            distinct: false,
            within_group: vec![],
        }
    }

    fn render_string_contains(&self, column: Expr, pattern: Expr) -> Expr {
        Expr::Function {
            name: "CONTAINS".into(),
            args: vec![column, pattern],
            distinct: false,
            within_group: vec![],
        }
    }

    fn current_date_sql(&self) -> &'static str {
        "CURRENT_DATE()"
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        format!("DATEADD('{}', {}, {})", unit.as_str(), count, date_sql)
    }
}
