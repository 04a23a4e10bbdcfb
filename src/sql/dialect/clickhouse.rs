//! ClickHouse dialect.
//!
//! - Double-quoted identifiers
//! - Named truncation functions per grain (`toStartOfMonth`, `toMonday`, ...)
//! - Native conversion functions for common casts (`toInt64`, `toString`)
//! - `addDays`/`addMonths`/... date arithmetic

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;
use crate::sql::expr::{func, BinaryOperator, Expr};

use super::{helpers, DialectCapabilities, SqlDialect};

fn grain_function(grain: TimeGrain) -> &'static str {
    match grain {
        TimeGrain::Year => "toStartOfYear",
        TimeGrain::Quarter => "toStartOfQuarter",
        TimeGrain::Month => "toStartOfMonth",
        TimeGrain::Week => "toMonday",
        TimeGrain::Day => "toDate",
        TimeGrain::Hour => "toStartOfHour",
        TimeGrain::Minute => "toStartOfMinute",
        TimeGrain::Second => "toStartOfSecond",
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClickHouse;

impl SqlDialect for ClickHouse {
    fn name(&self) -> &'static str {
        "clickhouse"
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
        func(grain_function(grain), vec![expr])
    }

    fn render_cast(&self, expr: Expr, target_type: &str) -> Expr {
        let native = match target_type.to_uppercase().as_str() {
            "INT" | "INTEGER" => Some("toInt64"),
            "FLOAT" => Some("toFloat64"),
            "STRING" => Some("toString"),
            "DATE" => Some("toDate"),
            _ => None,
        };
        match native {
            Some(name) => func(name, vec![expr]),
            None => Expr::Cast {
                expr: Box::new(expr),
                type_name: target_type.to_string(),
            },
        }
    }

    fn render_string_contains(&self, column: Expr, pattern: Expr) -> Expr {
        helpers::like_contains(column, pattern, BinaryOperator::ILike)
    }

    fn current_date_sql(&self) -> &'static str {
        "today()"
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        let function = match unit {
            RelativeUnit::Day => "addDays",
            RelativeUnit::Week => "addWeeks",
            RelativeUnit::Month => "addMonths",
            RelativeUnit::Year => "addYears",
        };
        format!("{}({}, {})", function, date_sql, count)
    }
}
