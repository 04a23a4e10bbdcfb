//! Composite Fact Layer plans: multi-fact queries via a UNION ALL CTE.

mod common;

use common::{query, sales_model};
use lodestar::error::ErrorCode;
use lodestar::pipeline::compile;

fn two_fact_query() -> lodestar::model::QueryObject {
    query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue, Return Amount]
"#,
    )
}

#[test]
fn test_cfl_two_facts_postgres() {
    let model = sales_model();
    let result = compile(&two_fact_query(), &model, "postgres").unwrap();
    let sql = &result.sql;

    assert!(sql.contains("WITH \"composite_01\" AS ("), "sql: {}", sql);
    assert!(sql.contains("UNION ALL\n"), "sql: {}", sql);
    assert!(!sql.contains("BY NAME"), "positional union on postgres: {}", sql);

    // Orders leg: own pre-aggregation column plus NULL padding for the
    // sibling fact's measure.
    assert!(sql.contains("FROM WAREHOUSE.PUBLIC.ORDERS AS \"Orders\""), "sql: {}", sql);
    assert!(
        sql.contains("\"Orders\".\"PRICE\" * \"Orders\".\"QUANTITY\" AS \"Revenue\""),
        "sql: {}",
        sql
    );
    assert!(sql.contains("NULL AS \"Return Amount\""), "sql: {}", sql);

    // Store Returns leg mirrors the column set.
    assert!(
        sql.contains("FROM WAREHOUSE.PUBLIC.STORE_RETURNS AS \"Store Returns\""),
        "sql: {}",
        sql
    );
    assert!(sql.contains("NULL AS \"Revenue\""), "sql: {}", sql);
    assert!(
        sql.contains("\"Store Returns\".\"RETURN_AMOUNT\" AS \"Return Amount\""),
        "sql: {}",
        sql
    );

    // Outer query re-aggregates over the CTE and groups by the conformed
    // dimension alias.
    assert!(sql.contains("SUM(\"Revenue\") AS \"Revenue\""), "sql: {}", sql);
    assert!(sql.contains("SUM(\"Return Amount\") AS \"Return Amount\""), "sql: {}", sql);
    assert!(sql.contains("FROM composite_01 AS \"composite_01\""), "sql: {}", sql);
    assert!(sql.contains("GROUP BY \"Country\""), "sql: {}", sql);

    let mut facts = result.resolved.fact_tables.clone();
    facts.sort();
    assert_eq!(facts, vec!["Orders", "Store Returns"]);
}

#[test]
fn test_union_legs_share_column_order() {
    let model = sales_model();
    let sql = compile(&two_fact_query(), &model, "postgres").unwrap().sql;

    // Every leg projects Country, Revenue, Return Amount in that order.
    let legs: Vec<&str> = sql.split("UNION ALL").collect();
    assert_eq!(legs.len(), 2, "two legs expected: {}", sql);
    for leg in legs {
        let country = leg.find("AS \"Country\"").expect("leg projects Country");
        let revenue = leg.find("AS \"Revenue\"").expect("leg projects Revenue");
        let returns = leg.find("AS \"Return Amount\"").expect("leg projects Return Amount");
        assert!(country < revenue && revenue < returns, "column order differs: {}", leg);
    }
}

#[test]
fn test_cfl_snowflake_union_by_name() {
    let model = sales_model();
    let sql = compile(&two_fact_query(), &model, "snowflake").unwrap().sql;

    assert!(sql.contains("UNION ALL BY NAME"), "sql: {}", sql);
    // Legs omit sibling NULL padding entirely.
    assert!(!sql.contains("NULL AS \"Revenue\""), "sql: {}", sql);
    assert!(!sql.contains("NULL AS \"Return Amount\""), "sql: {}", sql);
}

#[test]
fn test_star_vs_cfl_dichotomy() {
    let model = sales_model();

    // Measures on one fact: never a CTE.
    let single = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue, Order Count]
"#,
    );
    let sql = compile(&single, &model, "postgres").unwrap().sql;
    assert!(!sql.contains("composite_01"), "sql: {}", sql);

    // Measures on two facts: always the composite_01 CTE.
    let sql = compile(&two_fact_query(), &model, "postgres").unwrap().sql;
    assert!(sql.contains("composite_01"), "sql: {}", sql);
}

#[test]
fn test_metric_spanning_facts_rebuilds_in_outer_query() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Net Revenue]
"#,
    );

    let result = compile(&request, &model, "postgres").unwrap();
    let sql = &result.sql;

    // Component measures are routed to their legs...
    assert!(sql.contains("composite_01"), "sql: {}", sql);
    assert!(sql.contains("\"Orders\".\"PRICE\" * \"Orders\".\"QUANTITY\" AS \"Revenue\""));
    assert!(sql.contains("\"Store Returns\".\"RETURN_AMOUNT\" AS \"Return Amount\""));
    // ...and the metric is applied over the aggregated leg columns.
    assert!(
        sql.contains("SUM(\"Revenue\") - SUM(\"Return Amount\") AS \"Net Revenue\""),
        "sql: {}",
        sql
    );
}

#[test]
fn test_cfl_where_filter_applies_in_each_leg() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue, Return Amount]
where:
  - field: Country
    op: equals
    value: France
"#,
    );

    let sql = compile(&request, &model, "postgres").unwrap().sql;
    let hits = sql.matches("WHERE \"Customers\".\"COUNTRY\" = 'France'").count();
    assert_eq!(hits, 2, "both legs filter before aggregation: {}", sql);
}

#[test]
fn test_cfl_having_reaggregates_by_alias() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue, Return Amount]
having:
  - field: Revenue
    op: gt
    value: 1000
"#,
    );

    let sql = compile(&request, &model, "postgres").unwrap().sql;
    assert!(sql.contains("HAVING SUM(\"Revenue\") > 1000"), "sql: {}", sql);
}

#[test]
fn test_total_with_cfl_is_unsupported() {
    let model = sales_model();
    let request = query(
        r#"
select:
  dimensions: [Country]
  measures: [Revenue Total, Return Amount]
"#,
    );

    let err = compile(&request, &model, "postgres").unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedFeature);
}
