//! Typed records for the normalized in-memory dataset.
//!
//! The source files are loosely typed tab-delimited tables; these records
//! pin the shape down to explicit fields plus an order-preserving
//! feature-name → raw-string map, so downstream filtering never trips over
//! runtime type coercion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Built-in user feature that always exists, starting at 0.
pub const USER_HISTORY_LENGTH: &str = "user_history_length";

/// Feature name under which the serialized history string is exposed.
pub const INTERACTION_HISTORY_STR: &str = "interaction_history_str";

/// All non-timestamp fields of one interaction row.
///
/// Serializes as the flat field map itself, so a rendered history reads as
/// a list of plain objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionEvent {
    /// Field name → raw value, in header order
    pub fields: IndexMap<String, String>,
}

impl InteractionEvent {
    pub fn new(fields: IndexMap<String, String>) -> Self {
        Self { fields }
    }

    /// Raw value of a field, if the row carried it.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Copy of this event without the given field. Used when appending to a
    /// user's history, which drops the redundant `user_id` column.
    pub fn without(&self, field: &str) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != field)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { fields }
    }
}

/// One user of the dataset.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Unique user id token (first column of the user files)
    pub id: String,
    /// Feature name → raw value
    pub features: IndexMap<String, String>,
    /// Count of interactions referencing this user
    pub history_length: u64,
    /// Interaction events referencing this user, in file order
    pub interaction_history: Vec<InteractionEvent>,
    /// Serialized form of the history, filled once ingestion completes
    pub history_str: Option<String>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            features: IndexMap::new(),
            history_length: 0,
            interaction_history: Vec::new(),
            history_str: None,
        }
    }

    pub fn feature(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(String::as_str)
    }
}

/// One item of the dataset.
#[derive(Debug, Clone)]
pub struct ItemRecord {
    /// Unique item id token (first column of the item files)
    pub id: String,
    /// Feature name → raw value
    pub features: IndexMap<String, String>,
}

impl ItemRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            features: IndexMap::new(),
        }
    }

    pub fn feature(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_without_drops_field() {
        let mut fields = IndexMap::new();
        fields.insert("user_id".to_string(), "1".to_string());
        fields.insert("item_id".to_string(), "a".to_string());
        let event = InteractionEvent::new(fields);

        let trimmed = event.without("user_id");
        assert_eq!(trimmed.get("user_id"), None);
        assert_eq!(trimmed.get("item_id"), Some("a"));
        // The original is untouched
        assert_eq!(event.get("user_id"), Some("1"));
    }
}
