//! Client model.
//!
//! A client requests tasks and carries a priority level used by the
//! downstream allocator. Field names serialize as the upload column names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    #[serde(rename = "ClientID")]
    pub id: String,
    /// Display name.
    #[serde(rename = "ClientName")]
    pub name: String,
    /// Priority level, valid in 1..=5 by default.
    #[serde(rename = "PriorityLevel")]
    pub priority_level: i64,
    /// Requested task IDs, in request order.
    #[serde(rename = "RequestedTaskIDs")]
    pub requested_task_ids: Vec<String>,
    /// Free-form grouping label.
    #[serde(rename = "GroupTag")]
    pub group_tag: String,
    /// Arbitrary key-value metadata.
    #[serde(rename = "AttributesJSON")]
    pub attributes: Attributes,
}

/// Client metadata as received.
///
/// Uploads may deliver the column as an already-decoded object or as a
/// string that still needs decoding. A string that fails to decode is kept
/// verbatim so it can be reported; it reads as an empty mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attributes {
    /// Decoded key-value mapping.
    Object(Map<String, Value>),
    /// Raw text that has not (or could not) be decoded.
    Unparsed(String),
}

impl Default for Attributes {
    fn default() -> Self {
        Self::Object(Map::new())
    }
}

impl Attributes {
    /// Decodes raw text, keeping it verbatim on failure.
    ///
    /// Text that decodes to something other than an object is also kept
    /// raw, since the column is defined as a mapping.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Self::Object(map),
            _ => Self::Unparsed(text.to_string()),
        }
    }

    /// The decoded mapping, or an empty one when undecodable.
    pub fn as_map(&self) -> Map<String, Value> {
        match self {
            Self::Object(map) => map.clone(),
            Self::Unparsed(_) => Map::new(),
        }
    }

    /// Looks up a decoded attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(map) => map.get(key),
            Self::Unparsed(_) => None,
        }
    }

    /// The raw text if the column is still string-typed.
    pub fn unparsed(&self) -> Option<&str> {
        match self {
            Self::Object(_) => None,
            Self::Unparsed(text) => Some(text),
        }
    }
}

impl Client {
    /// Creates a client with priority 1 and no requests.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            priority_level: 1,
            requested_task_ids: Vec::new(),
            group_tag: String::new(),
            attributes: Attributes::default(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the priority level.
    pub fn with_priority(mut self, level: i64) -> Self {
        self.priority_level = level;
        self
    }

    /// Appends a requested task.
    pub fn with_request(mut self, task_id: impl Into<String>) -> Self {
        self.requested_task_ids.push(task_id.into());
        self
    }

    /// Sets the group tag.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_tag = group.into();
        self
    }

    /// Sets the attributes column.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_builder() {
        let c = Client::new("C1")
            .with_name("Acme Corp")
            .with_priority(3)
            .with_request("T1")
            .with_request("T2")
            .with_group("GroupA");

        assert_eq!(c.id, "C1");
        assert_eq!(c.priority_level, 3);
        assert_eq!(c.requested_task_ids, vec!["T1", "T2"]);
        assert_eq!(c.group_tag, "GroupA");
        assert!(c.attributes.as_map().is_empty());
    }

    #[test]
    fn test_attributes_from_text() {
        let ok = Attributes::from_text(r#"{"location": "NYC", "budget": 100000}"#);
        assert_eq!(ok.get("location"), Some(&json!("NYC")));
        assert!(ok.unparsed().is_none());

        let broken = Attributes::from_text("{location: NYC");
        assert_eq!(broken.unparsed(), Some("{location: NYC"));
        assert!(broken.as_map().is_empty());

        let not_object = Attributes::from_text("[1, 2]");
        assert!(not_object.unparsed().is_some());
    }

    #[test]
    fn test_client_serializes_with_column_names() {
        let c = Client::new("C1").with_request("T1");
        let json = serde_json::to_value(&c).unwrap();

        assert_eq!(json["ClientID"], "C1");
        assert_eq!(json["PriorityLevel"], 1);
        assert_eq!(json["RequestedTaskIDs"], json!(["T1"]));
        assert_eq!(json["AttributesJSON"], json!({}));
    }

    #[test]
    fn test_attributes_untagged_roundtrip() {
        let raw: Attributes = serde_json::from_value(json!("not json")).unwrap();
        assert_eq!(raw, Attributes::Unparsed("not json".into()));

        let obj: Attributes = serde_json::from_value(json!({"a": 1})).unwrap();
        assert_eq!(obj.get("a"), Some(&json!(1)));
    }
}
