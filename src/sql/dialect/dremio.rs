//! Dremio dialect.
//!
//! Calcite-based ANSI SQL with a reduced function surface: no ILIKE (lowered
//! LIKE instead), no MODE aggregation.

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;
use crate::sql::expr::{lit_str, Expr};

use super::{helpers, DialectCapabilities, SqlDialect};

#[derive(Debug, Clone, Copy)]
pub struct Dremio;

impl SqlDialect for Dremio {
    fn name(&self) -> &'static str {
        "dremio"
    }

    fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            supports_cte: true,
            ..Default::default()
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
        helpers::lowered_contains(column, pattern, "LOWER")
    }

    fn current_date_sql(&self) -> &'static str {
        "CURRENT_DATE"
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        format!(
            "DATE_ADD({}, INTERVAL '{}' {})",
            date_sql,
            count,
            unit.as_str().to_uppercase()
        )
    }
}
