//! Data objects: physical tables or views with columns and join declarations.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::types::{Cardinality, DataType};

/// A column within a data object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Column {
    /// Display name, unique within the owning data object.
    pub label: String,
    /// Physical column name in the database.
    pub code: String,
    #[serde(rename = "abstractType")]
    pub abstract_type: DataType,
    #[serde(rename = "sqlType", default)]
    pub sql_type: Option<String>,
    #[serde(rename = "sqlPrecision", default)]
    pub sql_precision: Option<u32>,
    #[serde(rename = "sqlScale", default)]
    pub sql_scale: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A join declared on a data object, connecting it to another data object.
///
/// `columns_from` and `columns_to` are parallel lists of column display names
/// on this object and the target respectively.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinDef {
    #[serde(rename = "joinType")]
    pub join_type: Cardinality,
    #[serde(rename = "joinTo")]
    pub join_to: String,
    #[serde(rename = "columnsFrom")]
    pub columns_from: Vec<String>,
    #[serde(rename = "columnsTo")]
    pub columns_to: Vec<String>,
    #[serde(default)]
    pub secondary: bool,
    /// Required iff `secondary` is set.
    #[serde(rename = "pathName", default)]
    pub path_name: Option<String>,
}

/// A database table or view with its columns and joins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataObject {
    /// Display name; also the SQL alias for this object.
    pub label: String,
    /// Physical table name.
    pub code: String,
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default)]
    pub joins: Vec<JoinDef>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl DataObject {
    /// Fully qualified table reference: `database.schema.code`.
    ///
    /// Emitted unquoted; the surrounding layers control identifier case.
    pub fn qualified_code(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.code)
    }

    /// Look up a column's physical code by display name, falling back to the
    /// display name itself when unknown (resolution reports the miss).
    pub fn column_code(&self, name: &str) -> String {
        self.columns
            .get(name)
            .map(|c| c.code.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_data_object() {
        let yaml = r#"
label: Orders
code: ORDERS
database: WAREHOUSE
schema: PUBLIC
columns:
  Price:
    label: Price
    code: PRICE
    abstractType: float
joins:
  - joinType: many-to-one
    joinTo: Customers
    columnsFrom: [Customer Id]
    columnsTo: [Customer Id]
"#;
        let obj: DataObject = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(obj.qualified_code(), "WAREHOUSE.PUBLIC.ORDERS");
        assert_eq!(obj.column_code("Price"), "PRICE");
        assert_eq!(obj.column_code("Missing"), "Missing");
        assert_eq!(obj.joins.len(), 1);
        assert!(!obj.joins[0].secondary);
        assert_eq!(obj.joins[0].join_type, Cardinality::ManyToOne);
    }

    #[test]
    fn test_deserialize_secondary_join() {
        let yaml = r#"
joinType: many-to-one
joinTo: Dates
columnsFrom: [Ship Date]
columnsTo: [Date]
secondary: true
pathName: ship
"#;
        let join: JoinDef = serde_yaml::from_str(yaml).unwrap();
        assert!(join.secondary);
        assert_eq!(join.path_name.as_deref(), Some("ship"));
    }
}
