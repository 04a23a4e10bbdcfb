//! Core value types for the semantic model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Abstract column types carried by the model YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Json,
    Int,
    Float,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Boolean,
}

impl DataType {
    /// Is this a date/time type a time grain can apply to?
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataType::Date
                | DataType::Time
                | DataType::TimeTz
                | DataType::Timestamp
                | DataType::TimestampTz
        )
    }
}

/// Aggregation kinds for measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationType {
    Sum,
    Count,
    CountDistinct,
    Avg,
    Min,
    Max,
    AnyValue,
    Median,
    Mode,
    Listagg,
}

impl AggregationType {
    /// The SQL function name and whether DISTINCT is implied.
    ///
    /// `count_distinct` lowers to `COUNT` with the distinct flag set.
    pub fn sql_function(&self) -> (&'static str, bool) {
        match self {
            AggregationType::Sum => ("SUM", false),
            AggregationType::Count => ("COUNT", false),
            AggregationType::CountDistinct => ("COUNT", true),
            AggregationType::Avg => ("AVG", false),
            AggregationType::Min => ("MIN", false),
            AggregationType::Max => ("MAX", false),
            AggregationType::AnyValue => ("ANY_VALUE", false),
            AggregationType::Median => ("MEDIAN", false),
            AggregationType::Mode => ("MODE", false),
            AggregationType::Listagg => ("LISTAGG", false),
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationType::CountDistinct => write!(f, "COUNT_DISTINCT"),
            other => write!(f, "{}", other.sql_function().0),
        }
    }
}

/// Time truncation grains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrain {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeGrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGrain::Year => "year",
            TimeGrain::Quarter => "quarter",
            TimeGrain::Month => "month",
            TimeGrain::Week => "week",
            TimeGrain::Day => "day",
            TimeGrain::Hour => "hour",
            TimeGrain::Minute => "minute",
            TimeGrain::Second => "second",
        }
    }
}

impl FromStr for TimeGrain {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(TimeGrain::Year),
            "quarter" => Ok(TimeGrain::Quarter),
            "month" => Ok(TimeGrain::Month),
            "week" => Ok(TimeGrain::Week),
            "day" => Ok(TimeGrain::Day),
            "hour" => Ok(TimeGrain::Hour),
            "minute" => Ok(TimeGrain::Minute),
            "second" => Ok(TimeGrain::Second),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TimeGrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join cardinality as declared on the owning side of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl Cardinality {
    /// Does traversing a join with this cardinality multiply rows?
    ///
    /// `reversed` means the edge was walked against its declared direction,
    /// i.e. from the "one" side into the "many" side.
    pub fn causes_fanout(&self, reversed: bool) -> bool {
        match self {
            Cardinality::ManyToMany => true,
            Cardinality::ManyToOne => reversed,
            Cardinality::OneToOne => false,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::ManyToOne => write!(f, "many-to-one"),
            Cardinality::OneToOne => write!(f, "one-to-one"),
            Cardinality::ManyToMany => write!(f, "many-to-many"),
        }
    }
}
