//! Shared fixtures for integration tests: a small retail model with two
//! fact tables sharing the Customers dimension table.
#![allow(dead_code)]

use lodestar::model::{loader, QueryObject, SemanticModel};
use lodestar::semantic::SemanticValidator;

pub const SALES_MODEL: &str = r#"
version: 1.0
dataObjects:
  Customers:
    label: Customers
    code: CUSTOMERS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Customer Id: { label: Customer Id, code: CUSTOMER_ID, abstractType: int }
      Country: { label: Country, code: COUNTRY, abstractType: string }
  Orders:
    label: Orders
    code: ORDERS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Order Id: { label: Order Id, code: ORDER_ID, abstractType: int }
      Customer Id: { label: Customer Id, code: CUSTOMER_ID, abstractType: int }
      Ship Customer Id: { label: Ship Customer Id, code: SHIP_CUSTOMER_ID, abstractType: int }
      Price: { label: Price, code: PRICE, abstractType: float }
      Quantity: { label: Quantity, code: QUANTITY, abstractType: int }
      Order Date: { label: Order Date, code: ORDER_DATE, abstractType: date }
      Status: { label: Status, code: STATUS, abstractType: string }
    joins:
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Customer Id]
        columnsTo: [Customer Id]
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Ship Customer Id]
        columnsTo: [Customer Id]
        secondary: true
        pathName: ship
  Store Returns:
    label: Store Returns
    code: STORE_RETURNS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Return Id: { label: Return Id, code: RETURN_ID, abstractType: int }
      Return Customer Id: { label: Return Customer Id, code: CUSTOMER_ID, abstractType: int }
      Return Amount: { label: Return Amount, code: RETURN_AMOUNT, abstractType: float }
    joins:
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Return Customer Id]
        columnsTo: [Customer Id]
dimensions:
  Country:
    label: Country
    dataObject: Customers
    column: Country
    resultType: string
  Order Date:
    label: Order Date
    dataObject: Orders
    column: Order Date
    resultType: date
measures:
  Revenue:
    label: Revenue
    resultType: float
    aggregation: sum
    expression: "{[Orders].[Price]} * {[Orders].[Quantity]}"
  Order Count:
    label: Order Count
    column: { dataObject: Orders, column: Order Id }
    resultType: int
    aggregation: count
  Return Amount:
    label: Return Amount
    column: { dataObject: Store Returns, column: Return Amount }
    resultType: float
    aggregation: sum
  Customer Count:
    label: Customer Count
    column: { dataObject: Customers, column: Customer Id }
    resultType: int
    aggregation: count_distinct
  Customer Count Fanned:
    label: Customer Count Fanned
    column: { dataObject: Customers, column: Customer Id }
    resultType: int
    aggregation: count_distinct
    allowFanOut: true
  Completed Revenue:
    label: Completed Revenue
    resultType: float
    aggregation: sum
    expression: "{[Orders].[Price]} * {[Orders].[Quantity]}"
    filter:
      column: { dataObject: Orders, column: Status }
      operator: equals
      values: [completed]
  Revenue Total:
    label: Revenue Total
    resultType: float
    aggregation: sum
    expression: "{[Orders].[Price]} * {[Orders].[Quantity]}"
    total: true
  Top Country:
    label: Top Country
    column: { dataObject: Customers, column: Country }
    resultType: string
    aggregation: mode
metrics:
  Average Order Value:
    label: Average Order Value
    expression: "{[Revenue]} / {[Order Count]}"
  Net Revenue:
    label: Net Revenue
    expression: "{[Revenue]} - {[Return Amount]}"
"#;

/// Load the shared model and assert it validates cleanly.
pub fn sales_model() -> SemanticModel {
    let loaded = loader::from_yaml_str(SALES_MODEL, "sales.yaml").expect("fixture model parses");
    let issues = SemanticValidator::new().validate(&loaded.model, Some(&loaded.source_map));
    assert!(issues.is_empty(), "fixture model should validate: {:?}", issues);
    loaded.model
}

/// Parse a query request from YAML.
pub fn query(yaml: &str) -> QueryObject {
    serde_yaml::from_str(yaml).expect("fixture query parses")
}
