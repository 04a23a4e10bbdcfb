//! YAML loading with source-position retention.
//!
//! `serde_yaml` gives us the typed model; positions come from a separate
//! indentation scan of the raw text, keyed by dotted key paths
//! (`dataObjects.Orders.columns.Price`). Validation issues look their paths
//! up here so every error can carry a (line, column) span.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{CompileError, CompileResult, ErrorCode, Issue, SourceSpan};
use crate::model::SemanticModel;

/// Maps dotted YAML key paths to their source positions.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    positions: BTreeMap<String, SourceSpan>,
}

impl SourceMap {
    /// Scan block-style YAML text and record the position of every mapping
    /// key, keyed by its dotted path from the document root.
    ///
    /// Flow-style collections and multi-line scalars are not descended into;
    /// their top key still gets a position, which is all error reporting
    /// needs.
    pub fn scan(text: &str, file: &str) -> Self {
        let mut positions = BTreeMap::new();
        // Stack of (indent, key) frames describing the current path.
        let mut stack: Vec<(usize, String)> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('-') {
                continue;
            }
            let Some(key) = mapping_key(trimmed) else {
                continue;
            };
            let indent = line.len() - trimmed.len();

            while let Some((frame_indent, _)) = stack.last() {
                if *frame_indent >= indent {
                    stack.pop();
                } else {
                    break;
                }
            }
            stack.push((indent, key.to_string()));

            let path = stack
                .iter()
                .map(|(_, k)| k.as_str())
                .collect::<Vec<_>>()
                .join(".");
            positions.entry(path).or_insert(SourceSpan {
                file: file.to_string(),
                line: idx as u32 + 1,
                column: indent as u32 + 1,
            });
        }

        Self { positions }
    }

    pub fn get(&self, path: &str) -> Option<&SourceSpan> {
        self.positions.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(|s| s.as_str())
    }
}

/// Extract the mapping key from a trimmed YAML line, if it is one.
fn mapping_key(trimmed: &str) -> Option<&str> {
    let colon = trimmed.find(':')?;
    let key = trimmed[..colon].trim();
    if key.is_empty() || key.starts_with('\'') && !key.ends_with('\'') {
        return None;
    }
    // A colon inside a scalar value ("http://...") is not a mapping key.
    let rest = &trimmed[colon + 1..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some(key.trim_matches(|c| c == '"' || c == '\''))
}

/// A parsed model bundled with its source positions.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: SemanticModel,
    pub source_map: SourceMap,
}

/// Load a semantic model from a YAML string.
pub fn from_yaml_str(content: &str, filename: &str) -> CompileResult<LoadedModel> {
    let model: SemanticModel = serde_yaml::from_str(content).map_err(|err| {
        let mut issue = Issue::new(ErrorCode::ParseError, format!("Invalid model YAML: {}", err));
        if let Some(loc) = err.location() {
            issue = issue.with_span(SourceSpan {
                file: filename.to_string(),
                line: loc.line() as u32,
                column: loc.column() as u32,
            });
        }
        CompileError::Parse(issue)
    })?;

    let source_map = SourceMap::scan(content, filename);
    Ok(LoadedModel { model, source_map })
}

/// Load a semantic model from a YAML file on disk.
pub fn from_yaml_file(path: &Path) -> CompileResult<LoadedModel> {
    let content = fs::read_to_string(path).map_err(|err| {
        CompileError::Parse(Issue::new(
            ErrorCode::ParseError,
            format!("Failed to read model file {}: {}", path.display(), err),
        ))
    })?;
    from_yaml_str(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
version: 1.0
dataObjects:
  Orders:
    label: Orders
    code: ORDERS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Price:
        label: Price
        code: PRICE
        abstractType: float
dimensions:
  Country:
    label: Country
    dataObject: Orders
    column: Price
    resultType: string
"#;

    #[test]
    fn test_load_and_positions() {
        let loaded = from_yaml_str(MODEL, "model.yaml").unwrap();
        assert_eq!(loaded.model.data_objects.len(), 1);

        let span = loaded
            .source_map
            .get("dataObjects.Orders.columns.Price")
            .expect("column path tracked");
        assert_eq!(span.line, 10);
        assert_eq!(span.file, "model.yaml");

        assert!(loaded.source_map.get("dimensions.Country").is_some());
        assert!(loaded.source_map.get("dimensions.Elsewhere").is_none());
    }

    #[test]
    fn test_parse_error_carries_span() {
        let err = from_yaml_str("dataObjects: [not-a-map", "bad.yaml").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseError);
    }

    #[test]
    fn test_mapping_key_rejects_scalar_colons() {
        assert_eq!(mapping_key("url: http://example.com"), Some("url"));
        assert_eq!(mapping_key("http://example.com"), None);
        assert_eq!(mapping_key("label: Orders"), Some("label"));
    }
}
