//! Unified error types for the compilation core.
//!
//! Errors are propagated as tagged values: every issue carries a stable
//! machine-readable code plus a human message, and optionally a YAML source
//! span and a dotted path into the model document.

use std::fmt;

use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Stable error codes surfaced to callers.
///
/// The wire names (SCREAMING_SNAKE) are what API layers and tests match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Parse errors
    ParseError,

    // Reference errors
    UnknownDataObject,
    UnknownColumn,
    UnknownDimension,
    UnknownMeasure,
    UnknownField,
    UnknownJoinTarget,
    UnknownJoinColumn,
    UnknownPathName,

    // Semantic errors
    DuplicateName,
    NonUniqueColumn,
    CyclicJoin,
    MultipathJoin,
    JoinColumnCountMismatch,
    SecondaryMissingPathname,
    DuplicateSecondaryPath,
    UnresolvedMeasureRef,
    UnresolvedDimensionRef,
    MetricCycle,

    // Resolution errors
    UnknownFilterOperator,
    InvalidFilterValue,
    InvalidGrain,
    AmbiguousJoin,
    Fanout,

    // Configuration errors
    UnsupportedDialect,
    UnsupportedFeature,
}

impl ErrorCode {
    /// The stable wire name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::UnknownDataObject => "UNKNOWN_DATA_OBJECT",
            ErrorCode::UnknownColumn => "UNKNOWN_COLUMN",
            ErrorCode::UnknownDimension => "UNKNOWN_DIMENSION",
            ErrorCode::UnknownMeasure => "UNKNOWN_MEASURE",
            ErrorCode::UnknownField => "UNKNOWN_FIELD",
            ErrorCode::UnknownJoinTarget => "UNKNOWN_JOIN_TARGET",
            ErrorCode::UnknownJoinColumn => "UNKNOWN_JOIN_COLUMN",
            ErrorCode::UnknownPathName => "UNKNOWN_PATH_NAME",
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::NonUniqueColumn => "NON_UNIQUE_COLUMN",
            ErrorCode::CyclicJoin => "CYCLIC_JOIN",
            ErrorCode::MultipathJoin => "MULTIPATH_JOIN",
            ErrorCode::JoinColumnCountMismatch => "JOIN_COLUMN_COUNT_MISMATCH",
            ErrorCode::SecondaryMissingPathname => "SECONDARY_MISSING_PATHNAME",
            ErrorCode::DuplicateSecondaryPath => "DUPLICATE_SECONDARY_PATH",
            ErrorCode::UnresolvedMeasureRef => "UNRESOLVED_MEASURE_REF",
            ErrorCode::UnresolvedDimensionRef => "UNRESOLVED_DIMENSION_REF",
            ErrorCode::MetricCycle => "METRIC_CYCLE",
            ErrorCode::UnknownFilterOperator => "UNKNOWN_FILTER_OPERATOR",
            ErrorCode::InvalidFilterValue => "INVALID_FILTER_VALUE",
            ErrorCode::InvalidGrain => "INVALID_GRAIN",
            ErrorCode::AmbiguousJoin => "AMBIGUOUS_JOIN",
            ErrorCode::Fanout => "FANOUT",
            ErrorCode::UnsupportedDialect => "UNSUPPORTED_DIALECT",
            ErrorCode::UnsupportedFeature => "UNSUPPORTED_FEATURE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points at an exact location in YAML source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A single structured problem: code + message + optional source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub code: ErrorCode,
    pub message: String,
    /// Dotted path into the model document, e.g. `dataObjects.Orders.joins[0]`.
    pub path: Option<String>,
    pub span: Option<SourceSpan>,
    /// Identifier the issue relates to, when one exists.
    pub related: Option<String>,
}

impl Issue {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            span: None,
            related: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related = Some(related.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (at {})", path)?;
        }
        if let Some(span) = &self.span {
            write!(f, " ({})", span)?;
        }
        Ok(())
    }
}

fn join_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The top-level error type for the compilation pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// Malformed YAML or expression text.
    #[error("parse error: {0}")]
    Parse(Issue),

    /// Model validation produced one or more issues.
    #[error("model validation failed: {}", join_issues(.0))]
    Validation(Vec<Issue>),

    /// Query resolution produced one or more issues.
    #[error("query resolution failed: {}", join_issues(.0))]
    Resolution(Vec<Issue>),

    /// A join path would multiply rows for a measure without `allowFanOut`.
    #[error("fanout detected: {0}")]
    Fanout(String),

    /// A target is reachable by more than one non-canonical join path.
    #[error("ambiguous join: {0}")]
    AmbiguousJoin(String),

    /// The requested dialect is not registered.
    #[error("unsupported dialect '{name}'; available: {}", available.join(", "))]
    UnsupportedDialect { name: String, available: Vec<String> },

    /// A model/query combination the compiler deliberately refuses.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
}

impl CompileError {
    /// The primary error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Parse(issue) => issue.code,
            CompileError::Validation(issues) | CompileError::Resolution(issues) => {
                issues.first().map(|i| i.code).unwrap_or(ErrorCode::ParseError)
            }
            CompileError::Fanout(_) => ErrorCode::Fanout,
            CompileError::AmbiguousJoin(_) => ErrorCode::AmbiguousJoin,
            CompileError::UnsupportedDialect { .. } => ErrorCode::UnsupportedDialect,
            CompileError::UnsupportedFeature(_) => ErrorCode::UnsupportedFeature,
        }
    }

    /// All issues carried by this error (single-issue errors yield one).
    pub fn issues(&self) -> Vec<Issue> {
        match self {
            CompileError::Parse(issue) => vec![issue.clone()],
            CompileError::Validation(issues) | CompileError::Resolution(issues) => issues.clone(),
            other => vec![Issue::new(other.code(), other.to_string())],
        }
    }
}
