use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Text,
    Number,
    Bool,
    Choice,
    Media,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub goal: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_format: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
}

/// A collected answer. Serialized untagged so stored slots read as plain JSON values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Flag(bool),
    Number(i64),
    Text(String),
    List(Vec<String>),
}

impl SlotValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(true) => f.write_str("yes"),
            Self::Flag(false) => f.write_str("no"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::List(values) => f.write_str(&values.join(", ")),
        }
    }
}

/// Answered slots keyed by parameter id. JSON `null` entries are dropped on read,
/// so "absent" is the only representation of an unanswered slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Option<SlotValue>>")]
pub struct CollectedSlots(BTreeMap<String, SlotValue>);

impl From<BTreeMap<String, Option<SlotValue>>> for CollectedSlots {
    fn from(raw: BTreeMap<String, Option<SlotValue>>) -> Self {
        Self(raw.into_iter().filter_map(|(id, value)| value.map(|value| (id, value))).collect())
    }
}

impl CollectedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_answered(&self, parameter_id: &str) -> bool {
        self.0.contains_key(parameter_id)
    }

    pub fn get(&self, parameter_id: &str) -> Option<&SlotValue> {
        self.0.get(parameter_id)
    }

    pub fn set(&mut self, parameter_id: impl Into<String>, value: SlotValue) {
        self.0.insert(parameter_id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SlotValue)> {
        self.0.iter()
    }
}
