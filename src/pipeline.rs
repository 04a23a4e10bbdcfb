//! Orchestrates the full compilation pipeline:
//! Query → Resolution → Planning → AST → SQL.

use tracing::{debug, warn};

use crate::error::CompileResult;
use crate::model::{QueryObject, SemanticModel};
use crate::planner::{CflPlanner, StarPlanner};
use crate::semantic::{detect_fanout, QueryResolver};
use crate::sql::dialect::{registry, Dialect, SqlDialect};

/// Summary of what was resolved during compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedInfo {
    pub fact_tables: Vec<String>,
    pub dimensions: Vec<String>,
    pub measures: Vec<String>,
}

/// The result of compiling a query to SQL.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub sql: String,
    pub dialect: String,
    pub resolved: ResolvedInfo,
    /// Non-blocking findings, including syntax-check failures.
    pub warnings: Vec<String>,
    /// False when the post-generation syntax check could not parse the
    /// output. Never blocks compilation.
    pub sql_valid: bool,
}

/// Compile a query against a validated model for the named dialect.
pub fn compile(
    query: &QueryObject,
    model: &SemanticModel,
    dialect_name: &str,
) -> CompileResult<CompilationResult> {
    // Phase 0: dialect lookup (resolution renders grains and filters with it).
    let dialect = registry::get(dialect_name)?;

    // Phase 1: resolution.
    let resolved = QueryResolver::new(model, dialect).resolve(query)?;

    // Phase 1.5: fanout refusal. Skipped for CFL, where each fact is
    // aggregated independently inside its own leg.
    if !resolved.requires_cfl {
        detect_fanout(&resolved, model)?;
    }

    // Phase 2: planning.
    let plan = if resolved.requires_cfl {
        CflPlanner::new().plan(&resolved, model, dialect)?
    } else {
        StarPlanner::new().plan(&resolved, model)
    };

    // Phase 2.5: grand-total window wrapper.
    let ast = crate::planner::wrap_with_totals(plan.ast, &resolved)?;

    // Phase 3: rendering.
    let sql = dialect.compile(&ast);

    // Phase 4: syntactic sanity check - warnings only, never blocking.
    let warnings = syntax_check(&sql, dialect);
    let sql_valid = warnings.is_empty();
    if !sql_valid {
        warn!(dialect = %dialect, "generated SQL failed the syntax check");
    }

    debug!(dialect = %dialect, bytes = sql.len(), "compilation finished");

    Ok(CompilationResult {
        sql,
        dialect: dialect.name().to_string(),
        resolved: ResolvedInfo {
            fact_tables: resolved.fact_tables(),
            dimensions: resolved.dimensions.iter().map(|d| d.name.clone()).collect(),
            measures: resolved.measures.iter().map(|m| m.name.clone()).collect(),
        },
        warnings,
        sql_valid,
    })
}

/// Parse the generated SQL with sqlparser for the closest matching dialect.
///
/// Dremio speaks Calcite-flavored ANSI SQL, which the generic dialect
/// approximates best.
fn syntax_check(sql: &str, dialect: Dialect) -> Vec<String> {
    use sqlparser::dialect::{
        ClickHouseDialect, DatabricksDialect, GenericDialect, PostgreSqlDialect, SnowflakeDialect,
    };
    use sqlparser::parser::Parser;

    let result = match dialect {
        Dialect::Postgres => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::Snowflake => Parser::parse_sql(&SnowflakeDialect {}, sql),
        Dialect::ClickHouse => Parser::parse_sql(&ClickHouseDialect {}, sql),
        Dialect::Databricks => Parser::parse_sql(&DatabricksDialect {}, sql),
        Dialect::Dremio => Parser::parse_sql(&GenericDialect {}, sql),
    };

    match result {
        Ok(_) => vec![],
        Err(err) => vec![format!("SQL syntax check ({}): {}", dialect.name(), err)],
    }
}
