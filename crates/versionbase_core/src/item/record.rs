//! Item record.

use crate::types::{ItemId, VersionId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored record.
///
/// Items are value-like: an update replaces the whole record for its key.
/// The `id` and `version` stamps are applied by the engine; everything else
/// is caller-supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    version: VersionId,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Item {
    /// Creates an item, stamping `id` and `version` over any caller-supplied
    /// keys of the same name.
    #[must_use]
    pub fn new(id: ItemId, version: VersionId, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        fields.remove("version");
        Self {
            id,
            version,
            fields,
        }
    }

    /// Returns the item id.
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Returns the version the record was written in.
    #[must_use]
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    /// Returns the caller-supplied fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a single field. `id` and `version` resolve to the stamps.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.to_string())),
            "version" => Some(Value::String(self.version.to_string())),
            _ => self.fields.get(field).cloned(),
        }
    }

    /// Returns the full record as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 2);
        object.insert("id".into(), Value::String(self.id.to_string()));
        object.insert("version".into(), Value::String(self.version.to_string()));
        object.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(object)
    }
}
