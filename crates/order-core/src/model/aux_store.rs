use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{OrderError, Result};

/// How [`AuxStore::merge`] treats a key present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Incoming values replace existing ones
    #[default]
    Overwrite,
    /// Existing values win
    KeepExisting,
}

/// Auxiliary data attached to an object
///
/// A tree of JSON values: nested mappings are JSON objects and keep their
/// insertion order. Paths are slices of keys, one per nesting level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuxStore {
    data: Map<String, Value>,
}

impl AuxStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self { data: Map::new() }
    }

    /// Get the value at a nested path
    ///
    /// # Errors
    ///
    /// Returns `AuxiliaryKeyError` if any segment of the path is absent.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<&Value> {
        self.find(path).ok_or_else(|| OrderError::AuxiliaryKeyError {
            path: join_path(path),
        })
    }

    /// Get the value at a nested path, or `default` when absent
    pub fn get_or<'a, S: AsRef<str>>(&'a self, path: &[S], default: &'a Value) -> &'a Value {
        self.find(path).unwrap_or(default)
    }

    /// Get the value at a nested path, if present
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.data;
        for segment in parents {
            match current.get(segment.as_ref()) {
                Some(Value::Object(map)) => current = map,
                _ => return None,
            }
        }
        current.get(last.as_ref())
    }

    pub fn contains<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.find(path).is_some()
    }

    /// Set the value at a nested path, creating intermediate mappings
    ///
    /// # Errors
    ///
    /// Returns `AuxiliaryKeyError` for an empty path and
    /// `AuxiliaryPathConflict` when an intermediate segment holds a
    /// non-mapping value. The store is unchanged on error.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: Value) -> Result<()> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| OrderError::AuxiliaryKeyError {
                path: String::new(),
            })?;

        // Reject conflicts before touching anything
        let mut current = &self.data;
        for (depth, segment) in parents.iter().enumerate() {
            match current.get(segment.as_ref()) {
                None => break,
                Some(Value::Object(map)) => current = map,
                Some(_) => {
                    return Err(OrderError::AuxiliaryPathConflict {
                        path: join_path(path),
                        segment: join_path(&path[..=depth]),
                    })
                }
            }
        }

        let mut current = &mut self.data;
        for segment in parents {
            let entry = current
                .entry(segment.as_ref())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(OrderError::Internal {
                        message: "auxiliary conflict check out of sync".to_string(),
                    })
                }
            };
        }
        current.insert(last.as_ref().to_string(), value);
        Ok(())
    }

    /// Remove the value at a nested path, returning it
    pub fn remove<S: AsRef<str>>(&mut self, path: &[S]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &mut self.data;
        for segment in parents {
            match current.get_mut(segment.as_ref()) {
                Some(Value::Object(map)) => current = map,
                _ => return None,
            }
        }
        current.shift_remove(last.as_ref())
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Top-level keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Recursively merge `other` into this store
    pub fn merge(&mut self, other: &AuxStore, policy: MergePolicy) {
        merge_values(&mut self.data, &other.data, policy);
    }

    /// Keep only the listed top-level keys
    pub fn retain_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.data
            .retain(|key, _| keys.iter().any(|allowed| allowed.as_ref() == key));
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl FromIterator<(String, Value)> for AuxStore {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl From<Map<String, Value>> for AuxStore {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

impl From<AuxStore> for Map<String, Value> {
    fn from(store: AuxStore) -> Self {
        store.data
    }
}

/// Recursive union of `source` into `target`
///
/// Where both sides hold a mapping at the same key the merge recurses.
/// Otherwise the incoming value replaces the existing one under
/// [`MergePolicy::Overwrite`] and is dropped under
/// [`MergePolicy::KeepExisting`]. Keys only present in `source` are always
/// added.
pub fn merge_values(target: &mut Map<String, Value>, source: &Map<String, Value>, policy: MergePolicy) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_values(existing, nested, policy);
            }
            (Some(existing), _) => {
                if policy == MergePolicy::Overwrite {
                    *existing = incoming.clone();
                }
            }
            (None, _) => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut aux = AuxStore::new();
        aux.set(&["plot", "color"], json!("red")).unwrap();

        assert_eq!(aux.get(&["plot", "color"]).unwrap(), &json!("red"));
        assert_eq!(aux.get(&["plot"]).unwrap(), &json!({"color": "red"}));
    }

    #[test]
    fn test_get_missing_path_fails() {
        let aux = AuxStore::new();
        let result = aux.get(&["plot", "color"]);
        assert!(matches!(
            result,
            Err(OrderError::AuxiliaryKeyError { ref path }) if path == "plot.color"
        ));
    }

    #[test]
    fn test_get_or_returns_default() {
        let aux = AuxStore::new();
        let default = json!(42);
        assert_eq!(aux.get_or(&["missing"], &default), &json!(42));
    }

    #[test]
    fn test_set_through_scalar_is_rejected_without_mutation() {
        let mut aux = AuxStore::new();
        aux.set(&["lumi"], json!(35.9)).unwrap();
        let before = aux.clone();

        let result = aux.set(&["lumi", "unit"], json!("fb"));

        assert!(matches!(
            result,
            Err(OrderError::AuxiliaryPathConflict { ref segment, .. }) if segment == "lumi"
        ));
        assert_eq!(aux, before);
    }

    #[test]
    fn test_remove_nested() {
        let mut aux = AuxStore::new();
        aux.set(&["a", "b"], json!(1)).unwrap();
        aux.set(&["a", "c"], json!(2)).unwrap();

        assert_eq!(aux.remove(&["a", "b"]), Some(json!(1)));
        assert!(!aux.contains(&["a", "b"]));
        assert!(aux.contains(&["a", "c"]));
        assert_eq!(aux.remove(&["x", "y"]), None);
    }

    #[test]
    fn test_merge_values_overwrite_recurses() {
        let mut target = map(json!({"a": {"x": 1, "y": 2}, "b": 1}));
        let source = map(json!({"a": {"y": 20, "z": 30}, "b": {"nested": true}}));

        merge_values(&mut target, &source, MergePolicy::Overwrite);

        assert_eq!(
            Value::Object(target),
            json!({"a": {"x": 1, "y": 20, "z": 30}, "b": {"nested": true}})
        );
    }

    #[test]
    fn test_merge_values_keep_existing() {
        let mut target = map(json!({"a": {"x": 1}, "b": 1}));
        let source = map(json!({"a": {"x": 10, "w": 5}, "b": 2, "c": 3}));

        merge_values(&mut target, &source, MergePolicy::KeepExisting);

        assert_eq!(
            Value::Object(target),
            json!({"a": {"x": 1, "w": 5}, "b": 1, "c": 3})
        );
    }

    #[test]
    fn test_retain_keys() {
        let mut aux: AuxStore = vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
            ("c".to_string(), json!(3)),
        ]
        .into_iter()
        .collect();

        aux.retain_keys(&["a", "c"]);

        assert_eq!(aux.keys().cloned().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
