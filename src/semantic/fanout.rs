//! Fanout detection: refuses join paths that multiply measure rows.
//!
//! Runs after resolution and before planning so the caller gets a single
//! clear error instead of silently inflated aggregates. A step fans out when
//! it is many-to-many, or many-to-one traversed from the "one" side into the
//! "many" side; the multiplied rows belong to the traversal origin.

use std::collections::BTreeSet;

use crate::error::{CompileError, CompileResult};
use crate::model::SemanticModel;
use crate::semantic::expr_parser;
use crate::semantic::resolved::ResolvedQuery;

/// Check every selected measure (and metric component) against the resolved
/// join steps. Measures with `allowFanOut` are exempt.
pub fn detect_fanout(resolved: &ResolvedQuery, model: &SemanticModel) -> CompileResult<()> {
    if resolved.join_steps.is_empty() {
        return Ok(());
    }

    let mut names: Vec<&str> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for measure in &resolved.measures {
        if measure.is_metric() {
            for component in &measure.component_measures {
                if seen.insert(component.as_str()) {
                    names.push(component.as_str());
                }
            }
        } else if seen.insert(measure.name.as_str()) {
            names.push(measure.name.as_str());
        }
    }

    let mut errors: Vec<String> = Vec::new();

    for name in names {
        let Some(measure) = model.measures.get(name) else {
            continue;
        };
        if measure.allow_fan_out {
            continue;
        }

        let mut source_objects: BTreeSet<String> = BTreeSet::new();
        if let Some(target) = &measure.column {
            source_objects.insert(target.data_object.clone());
        }
        if let Some(formula) = &measure.expression {
            for (object, _) in expr_parser::column_placeholders(formula) {
                source_objects.insert(object);
            }
        }
        if source_objects.is_empty() {
            continue;
        }

        for step in &resolved.join_steps {
            if step.cardinality.causes_fanout(step.reversed)
                && source_objects.contains(&step.from_object)
            {
                errors.push(format!(
                    "Measure '{}' has fanout: join from '{}' to '{}' ({}{}) causes row multiplication",
                    name,
                    step.from_object,
                    step.to_object,
                    step.cardinality,
                    if step.reversed { ", reversed" } else { "" },
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CompileError::Fanout(errors.join("; ")))
    }
}
