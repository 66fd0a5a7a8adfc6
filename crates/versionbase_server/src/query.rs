//! Structured `find` filters and projections.
//!
//! Requests cannot ship code, so `find` takes a field-equality object as its
//! filter and a list of field names as its projection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use versionbase_core::{Item, ItemFilter, ItemProjection};

/// Matches items whose fields equal every listed value.
///
/// `{"lang": "rust", "stars": 5}` matches items with both fields set to
/// exactly those values. An empty object matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMatch(pub Map<String, Value>);

impl ItemFilter for FieldMatch {
    fn matches(&self, item: &Item) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| item.get(field).as_ref() == Some(expected))
    }
}

/// Projects items onto the listed fields. Missing fields come out as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSelect(pub Vec<String>);

impl ItemProjection for FieldSelect {
    fn project(&self, item: &Item) -> Value {
        let object = self
            .0
            .iter()
            .map(|field| (field.clone(), item.get(field).unwrap_or(Value::Null)))
            .collect();
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use versionbase_core::{ItemId, VersionId};

    fn item() -> Item {
        let fields = json!({"lang": "rust", "stars": 5}).as_object().cloned().unwrap();
        Item::new(ItemId::from("i1"), VersionId::from("B"), fields)
    }

    #[test]
    fn field_match() {
        let filter: FieldMatch = serde_json::from_value(json!({"lang": "rust"})).unwrap();
        assert!(filter.matches(&item()));

        let filter: FieldMatch = serde_json::from_value(json!({"lang": "rust", "stars": 4})).unwrap();
        assert!(!filter.matches(&item()));

        assert!(FieldMatch::default().matches(&item()));
        let by_version: FieldMatch = serde_json::from_value(json!({"version": "B"})).unwrap();
        assert!(by_version.matches(&item()));
    }

    #[test]
    fn field_select() {
        let select: FieldSelect = serde_json::from_value(json!(["id", "stars", "missing"])).unwrap();
        assert_eq!(
            select.project(&item()),
            json!({"id": "i1", "stars": 5, "missing": null})
        );
    }
}
