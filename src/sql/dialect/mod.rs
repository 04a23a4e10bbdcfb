//! SQL dialect definitions.
//!
//! Each warehouse dialect is a unit struct implementing `SqlDialect`; the
//! `Dialect` enum delegates to them so the rest of the compiler can pass a
//! `Copy` handle around. Dialects differ in identifier quoting, time-grain
//! truncation, casts, string matching, date arithmetic, and union-by-name
//! support.

mod clickhouse;
mod databricks;
mod dremio;
pub mod helpers;
mod postgres;
pub mod registry;
mod snowflake;

pub use clickhouse::ClickHouse;
pub use databricks::Databricks;
pub use dremio::Dremio;
pub use postgres::Postgres;
pub use snowflake::Snowflake;

use crate::model::query::RelativeUnit;
use crate::model::types::TimeGrain;

use super::expr::{lit_str, BinaryOperator, Expr};
use super::query::Select;

/// Flags indicating what SQL features a dialect supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialectCapabilities {
    pub supports_cte: bool,
    pub supports_qualify: bool,
    pub supports_arrays: bool,
    pub supports_window_filters: bool,
    pub supports_ilike: bool,
    pub supports_time_travel: bool,
    pub supports_semi_structured: bool,
    /// `UNION ALL BY NAME`: legs are matched by column name, so NULL
    /// padding columns can be omitted.
    pub union_by_name: bool,
}

/// SQL dialect trait - the per-warehouse operator surface.
pub trait SqlDialect: std::fmt::Debug {
    /// Registry key for this dialect.
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> DialectCapabilities;

    /// Quote an identifier (table alias, column, CTE name).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Wrap a column expression in the dialect's time truncation for a grain.
    fn render_time_grain(&self, expr: Expr, grain: TimeGrain) -> Expr;

    /// Render a cast to the given target type.
    fn render_cast(&self, expr: Expr, target_type: &str) -> Expr {
        Expr::Cast {
            expr: Box::new(expr),
            type_name: target_type.to_string(),
        }
    }

    /// Case-insensitive substring match.
    ///
    /// Default: `column LIKE '%' || pattern || '%'`.
    fn render_string_contains(&self, column: Expr, pattern: Expr) -> Expr {
        helpers::like_contains(column, pattern, BinaryOperator::Like)
    }

    /// SQL text for the current date.
    fn current_date_sql(&self) -> &'static str;

    /// SQL text adding `count` units to an already-rendered date expression.
    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String;
}

/// Supported warehouse dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dialect {
    Postgres,
    Snowflake,
    ClickHouse,
    Dremio,
    Databricks,
}

impl Dialect {
    /// All registered dialects, in registry order.
    pub const ALL: [Dialect; 5] = [
        Dialect::Postgres,
        Dialect::Snowflake,
        Dialect::ClickHouse,
        Dialect::Dremio,
        Dialect::Databricks,
    ];

    fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::Snowflake => &Snowflake,
            Dialect::ClickHouse => &ClickHouse,
            Dialect::Dremio => &Dremio,
            Dialect::Databricks => &Databricks,
        }
    }

    /// Render a complete statement AST to SQL text for this dialect.
    pub fn compile(&self, select: &Select) -> String {
        select.to_tokens_for_dialect(*self).serialize(*self)
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn capabilities(&self) -> DialectCapabilities {
        self.dialect().capabilities()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn render_time_grain(&self, expr: Expr, grain: TimeGrain) -> Expr {
        self.dialect().render_time_grain(expr, grain)
    }

    fn render_cast(&self, expr: Expr, target_type: &str) -> Expr {
        self.dialect().render_cast(expr, target_type)
    }

    fn render_string_contains(&self, column: Expr, pattern: Expr) -> Expr {
        self.dialect().render_string_contains(column, pattern)
    }

    fn current_date_sql(&self) -> &'static str {
        self.dialect().current_date_sql()
    }

    fn date_add_sql(&self, date_sql: &str, unit: RelativeUnit, count: i64) -> String {
        self.dialect().date_add_sql(date_sql, unit, count)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the `'%' || pattern || '%'` wildcard wrapper used by LIKE-style
/// contains implementations.
pub(crate) fn wildcard_pattern(pattern: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(Expr::BinaryOp {
            left: Box::new(lit_str("%")),
            op: BinaryOperator::Concat,
            right: Box::new(pattern),
        }),
        op: BinaryOperator::Concat,
        right: Box::new(lit_str("%")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expr::table_col;

    fn render(dialect: Dialect, expr: &Expr) -> String {
        expr.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(Dialect::Snowflake.to_string(), "snowflake");
        assert_eq!(Dialect::ClickHouse.to_string(), "clickhouse");
        assert_eq!(Dialect::Dremio.to_string(), "dremio");
        assert_eq!(Dialect::Databricks.to_string(), "databricks");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::Postgres.quote_identifier("Orders"), "\"Orders\"");
        assert_eq!(Dialect::Databricks.quote_identifier("Orders"), "`Orders`");
        assert_eq!(
            Dialect::Snowflake.quote_identifier("odd\"name"),
            "\"odd\"\"name\""
        );
        assert_eq!(
            Dialect::Databricks.quote_identifier("odd`name"),
            "`odd``name`"
        );
    }

    #[test]
    fn test_time_grain_per_dialect() {
        let col = || table_col("Orders", "ORDER_DATE");

        let pg = Dialect::Postgres.render_time_grain(col(), TimeGrain::Month);
        assert_eq!(
            render(Dialect::Postgres, &pg),
            "date_trunc('month', \"Orders\".\"ORDER_DATE\")"
        );

        let sf = Dialect::Snowflake.render_time_grain(col(), TimeGrain::Month);
        assert_eq!(
            render(Dialect::Snowflake, &sf),
            "DATE_TRUNC('month', \"Orders\".\"ORDER_DATE\")"
        );

        let ch = Dialect::ClickHouse.render_time_grain(col(), TimeGrain::Quarter);
        assert_eq!(
            render(Dialect::ClickHouse, &ch),
            "toStartOfQuarter(\"Orders\".\"ORDER_DATE\")"
        );

        let ch_week = Dialect::ClickHouse.render_time_grain(col(), TimeGrain::Week);
        assert_eq!(
            render(Dialect::ClickHouse, &ch_week),
            "toMonday(\"Orders\".\"ORDER_DATE\")"
        );

        let db = Dialect::Databricks.render_time_grain(col(), TimeGrain::Day);
        assert_eq!(
            render(Dialect::Databricks, &db),
            "date_trunc('day', `Orders`.`ORDER_DATE`)"
        );
    }

    #[test]
    fn test_string_contains_per_dialect() {
        let col = || table_col("Customers", "COUNTRY");
        let pat = || lit_str("United");

        let pg = Dialect::Postgres.render_string_contains(col(), pat());
        assert_eq!(
            render(Dialect::Postgres, &pg),
            "\"Customers\".\"COUNTRY\" ILIKE '%' || 'United' || '%'"
        );

        let sf = Dialect::Snowflake.render_string_contains(col(), pat());
        assert_eq!(
            render(Dialect::Snowflake, &sf),
            "CONTAINS(\"Customers\".\"COUNTRY\", 'United')"
        );

        let ch = Dialect::ClickHouse.render_string_contains(col(), pat());
        assert!(render(Dialect::ClickHouse, &ch).contains("ILIKE"));

        let dr = Dialect::Dremio.render_string_contains(col(), pat());
        assert_eq!(
            render(Dialect::Dremio, &dr),
            "LOWER(\"Customers\".\"COUNTRY\") LIKE '%' || LOWER('United') || '%'"
        );

        let db = Dialect::Databricks.render_string_contains(col(), pat());
        assert_eq!(
            render(Dialect::Databricks, &db),
            "lower(`Customers`.`COUNTRY`) LIKE '%' || lower('United') || '%'"
        );
    }

    #[test]
    fn test_cast_clickhouse_native() {
        let expr = Dialect::ClickHouse.render_cast(table_col("T", "X"), "INT");
        assert_eq!(render(Dialect::ClickHouse, &expr), "toInt64(\"T\".\"X\")");

        let fallback = Dialect::ClickHouse.render_cast(table_col("T", "X"), "DECIMAL(10,2)");
        assert_eq!(
            render(Dialect::ClickHouse, &fallback),
            "CAST(\"T\".\"X\" AS DECIMAL(10,2))"
        );

        let pg = Dialect::Postgres.render_cast(table_col("T", "X"), "INT");
        assert_eq!(render(Dialect::Postgres, &pg), "CAST(\"T\".\"X\" AS INT)");
    }

    #[test]
    fn test_date_add() {
        assert_eq!(
            Dialect::Postgres.date_add_sql("CURRENT_DATE", RelativeUnit::Month, -3),
            "CURRENT_DATE + INTERVAL '-3 month'"
        );
        assert_eq!(
            Dialect::Snowflake.date_add_sql("CURRENT_DATE()", RelativeUnit::Day, 1),
            "DATEADD('day', 1, CURRENT_DATE())"
        );
        assert_eq!(
            Dialect::ClickHouse.date_add_sql("today()", RelativeUnit::Week, 2),
            "addWeeks(today(), 2)"
        );
        assert_eq!(
            Dialect::Databricks.date_add_sql("current_date()", RelativeUnit::Year, 1),
            "add_months(current_date(), 12)"
        );
        assert_eq!(
            Dialect::Dremio.date_add_sql("CURRENT_DATE", RelativeUnit::Day, 7),
            "DATE_ADD(CURRENT_DATE, INTERVAL '7' DAY)"
        );
    }

    #[test]
    fn test_union_by_name_capability() {
        assert!(Dialect::Snowflake.capabilities().union_by_name);
        assert!(!Dialect::Postgres.capabilities().union_by_name);
        assert!(!Dialect::Databricks.capabilities().union_by_name);
    }
}
