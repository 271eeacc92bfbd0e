//! Client-side filtering of list responses
//!
//! List endpoints return `{"entities": [...], ...}`. Filters narrow the
//! entities before decoding, for attributes the server cannot filter on.

use crate::error::{Error, Result, PHASE_DECODE_RESPONSE};
use serde_json::Value;

/// Keep entities whose `name` attribute equals one of `values`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalFilter {
    /// Dotted attribute path, relative to each base search path
    pub name: String,
    pub values: Vec<String>,
}

impl AdditionalFilter {
    pub fn new(name: &str, values: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    fn matches(&self, entity: &Value, base_search_paths: &[&str]) -> bool {
        let candidates: Vec<String> = if base_search_paths.is_empty() {
            vec![self.name.clone()]
        } else {
            base_search_paths
                .iter()
                .map(|base| format!("{}.{}", base, self.name))
                .collect()
        };

        candidates
            .iter()
            .filter_map(|path| lookup(entity, path))
            .filter_map(render)
            .any(|found| self.values.iter().any(|v| *v == found))
    }
}

/// Walk a dotted path through nested objects
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(value, |current, part| current.get(part))
}

/// Scalars compare by their plain text form
fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Filter the `entities` array of a JSON list body.
///
/// An entity is kept only if every filter matches. Bodies without an
/// `entities` array are returned unchanged.
pub fn filter_entities(
    body: &[u8],
    filters: &[AdditionalFilter],
    base_search_paths: &[&str],
) -> Result<Vec<u8>> {
    let mut doc: Value =
        serde_json::from_slice(body).map_err(|e| Error::serialization(PHASE_DECODE_RESPONSE, e))?;

    let Some(Value::Array(entities)) = doc.get_mut("entities") else {
        return Ok(body.to_vec());
    };

    let before = entities.len();
    entities.retain(|entity| filters.iter().all(|f| f.matches(entity, base_search_paths)));
    tracing::debug!("Filtered entities: {} -> {}", before, entities.len());

    serde_json::to_vec(&doc).map_err(|e| Error::serialization(PHASE_DECODE_RESPONSE, e))
}
