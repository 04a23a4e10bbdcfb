//! # Lodestar
//!
//! Compiles a declarative YAML semantic model plus a structured analytical
//! query into dialect-specific SQL for five warehouses: PostgreSQL,
//! Snowflake, ClickHouse, Dremio, and Databricks SQL.
//!
//! ## Pipeline
//!
//! ```text
//! (model, query, dialect) → Resolver → ResolvedQuery
//!                         → Star or CFL planner → SQL AST
//!                         → dialect renderer → SQL text + report
//! ```
//!
//! Single-fact queries produce a star plan: one SELECT with the fact as
//! root and LEFT JOINs to every required data object. Queries whose
//! measures span multiple facts produce a Composite Fact Layer plan: a
//! `composite_01` CTE unioning one leg per fact, aggregated in an outer
//! SELECT over the conformed dimensions.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use lodestar::model::loader;
//! use lodestar::pipeline;
//!
//! let loaded = loader::from_yaml_str(model_yaml, "model.yaml")?;
//! let issues = lodestar::semantic::SemanticValidator::new()
//!     .validate(&loaded.model, Some(&loaded.source_map));
//! assert!(issues.is_empty());
//!
//! let query: lodestar::model::QueryObject = serde_yaml::from_str(query_yaml)?;
//! let result = pipeline::compile(&query, &loaded.model, "postgres")?;
//! println!("{}", result.sql);
//! ```
//!
//! The core is synchronous, stateless, and allocation-only; it is safe to
//! call concurrently with independent inputs. The dialect registry is
//! populated once, lazily, and read-only thereafter.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod planner;
pub mod semantic;
pub mod sql;

pub use error::{CompileError, CompileResult, ErrorCode, Issue, SourceSpan};
pub use pipeline::{compile, CompilationResult, ResolvedInfo};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::error::{CompileError, CompileResult, ErrorCode, Issue};
    pub use crate::model::{
        loader, QueryObject, SemanticModel,
    };
    pub use crate::pipeline::{compile, CompilationResult};
    pub use crate::semantic::{QueryResolver, SemanticValidator};
    pub use crate::sql::dialect::{registry, Dialect, SqlDialect};
    pub use crate::sql::{Expr, Select};
}
