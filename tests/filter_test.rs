//! Filter operators: alias sets, value shapes, relative-date expansion.

mod common;

use common::{query, sales_model};
use lodestar::error::ErrorCode;
use lodestar::pipeline::compile;

fn country_filter_sql(op: &str, value: &str) -> String {
    let model = sales_model();
    let request = query(&format!(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue]
where:
  - field: Country
    op: "{}"
    value: {}
"#,
        op, value
    ));
    compile(&request, &model, "postgres").unwrap().sql
}

#[test]
fn test_operator_alias_sets_produce_identical_sql() {
    let cases: [&[&str]; 4] = [
        &["equals", "=", "eq"],
        &["notequals", "!=", "neq"],
        &["gte", ">="],
        &["lte", "<="],
    ];
    for aliases in cases {
        let baseline = country_filter_sql(aliases[0], "France");
        for alias in &aliases[1..] {
            assert_eq!(
                baseline,
                country_filter_sql(alias, "France"),
                "alias '{}' diverged from '{}'",
                alias,
                aliases[0]
            );
        }
    }
}

#[test]
fn test_comparison_operators() {
    assert!(country_filter_sql("equals", "France")
        .contains("WHERE \"Customers\".\"COUNTRY\" = 'France'"));
    assert!(country_filter_sql("notequals", "France")
        .contains("WHERE \"Customers\".\"COUNTRY\" <> 'France'"));
    assert!(country_filter_sql("gt", "10").contains("WHERE \"Customers\".\"COUNTRY\" > 10"));
}

#[test]
fn test_in_list_and_aliases() {
    let inlist = country_filter_sql("inlist", "[France, Germany]");
    assert!(
        inlist.contains("WHERE \"Customers\".\"COUNTRY\" IN ('France', 'Germany')"),
        "sql: {}",
        inlist
    );
    assert_eq!(inlist, country_filter_sql("in", "[France, Germany]"));

    let notin = country_filter_sql("not_in", "[France]");
    assert!(
        notin.contains("WHERE \"Customers\".\"COUNTRY\" NOT IN ('France')"),
        "sql: {}",
        notin
    );
    assert_eq!(notin, country_filter_sql("notinlist", "[France]"));
}

#[test]
fn test_null_operators() {
    let set = country_filter_sql("set", "null");
    assert!(set.contains("WHERE \"Customers\".\"COUNTRY\" IS NOT NULL"), "sql: {}", set);
    assert_eq!(set, country_filter_sql("is_not_null", "null"));

    let notset = country_filter_sql("notset", "null");
    assert!(notset.contains("WHERE \"Customers\".\"COUNTRY\" IS NULL"), "sql: {}", notset);
    assert_eq!(notset, country_filter_sql("is_null", "null"));
}

#[test]
fn test_string_matching_operators() {
    assert!(country_filter_sql("starts_with", "Fr")
        .contains("WHERE \"Customers\".\"COUNTRY\" LIKE 'Fr%'"));
    assert!(country_filter_sql("ends_with", "ance")
        .contains("WHERE \"Customers\".\"COUNTRY\" LIKE '%ance'"));
    assert!(country_filter_sql("like", "Fr_nce")
        .contains("WHERE \"Customers\".\"COUNTRY\" LIKE 'Fr_nce'"));
    assert!(country_filter_sql("notlike", "Fr%")
        .contains("WHERE \"Customers\".\"COUNTRY\" NOT LIKE 'Fr%'"));
    let notcontains = country_filter_sql("notcontains", "United");
    assert!(
        notcontains.contains("NOT (\"Customers\".\"COUNTRY\" ILIKE '%' || 'United' || '%')"),
        "sql: {}",
        notcontains
    );
}

#[test]
fn test_between_and_not_between() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Order Date]
  measures: [Revenue]
where:
  - field: Order Date
    op: between
    value: ["2024-01-01", "2024-12-31"]
"#,
    );
    let sql = compile(&request, &model, "postgres").unwrap().sql;
    assert!(
        sql.contains("WHERE \"Orders\".\"ORDER_DATE\" BETWEEN '2024-01-01' AND '2024-12-31'"),
        "sql: {}",
        sql
    );

    let request = query(
        r#"
select:
  dimensions: [Order Date]
  measures: [Revenue]
where:
  - field: Order Date
    op: notbetween
    value: ["2024-01-01", "2024-12-31"]
"#,
    );
    let sql = compile(&request, &model, "postgres").unwrap().sql;
    assert!(sql.contains("NOT BETWEEN"), "sql: {}", sql);
}

#[test]
fn test_between_requires_two_values() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Order Date]
  measures: [Revenue]
where:
  - field: Order Date
    op: between
    value: ["2024-01-01"]
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFilterValue);
}

#[test]
fn test_relative_filter_expands_per_dialect() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Order Date]
  measures: [Revenue]
where:
  - field: Order Date
    op: relative
    value:
      unit: month
      count: 3
"#,
    );

    let pg = compile(&request, &model, "postgres").unwrap().sql;
    assert!(
        pg.contains(
            "(\"Orders\".\"ORDER_DATE\" >= CURRENT_DATE + INTERVAL '1 day' + INTERVAL '-3 month' \
             AND \"Orders\".\"ORDER_DATE\" < CURRENT_DATE + INTERVAL '1 day')"
        ),
        "sql: {}",
        pg
    );

    let sf = compile(&request, &model, "snowflake").unwrap().sql;
    assert!(
        sf.contains("DATEADD('month', -3, DATEADD('day', 1, CURRENT_DATE()))"),
        "sql: {}",
        sf
    );

    let ch = compile(&request, &model, "clickhouse").unwrap().sql;
    assert!(
        ch.contains("addMonths(addDays(today(), 1), -3)"),
        "sql: {}",
        ch
    );

    let databricks = compile(&request, &model, "databricks").unwrap().sql;
    assert!(
        databricks.contains("add_months(date_add(current_date(), 1), -3)"),
        "sql: {}",
        databricks
    );
}

#[test]
fn test_relative_filter_future_excluding_current() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Order Date]
  measures: [Revenue]
where:
  - field: Order Date
    op: relative
    value:
      unit: week
      count: 2
      direction: future
      include_current: false
"#,
    );

    let sql = compile(&request, &model, "postgres").unwrap().sql;
    assert!(
        sql.contains(">= CURRENT_DATE + INTERVAL '1 day'"),
        "start excludes today: {}",
        sql
    );
    assert!(
        sql.contains("< CURRENT_DATE + INTERVAL '1 day' + INTERVAL '2 week'"),
        "end is start plus the window: {}",
        sql
    );
}

#[test]
fn test_unknown_filter_field() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue]
where:
  - field: Shoe Size
    op: equals
    value: 42
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownField);
}

#[test]
fn test_unknown_measure_and_dimension() {
    let model = sales_model();

    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Profit]
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownMeasure);

    let request = query(
        r#"
select:
  dimensions: [Continent]
  measures: [Revenue]
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownDimension);
}

#[test]
fn test_invalid_grain_suffix() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: ["Order Date:fortnight"]
  measures: [Revenue]
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidGrain);
}

#[test]
fn test_order_by_unselected_field_fails() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue]
order_by:
  - field: Order Count
"#,
    );
    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownField);
}
