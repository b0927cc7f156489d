use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::fields::SectionField;

/// Heterogeneous value extracted for one CV section.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Scalar(String),
    Sequence(Vec<FieldValue>),
    /// Attribute order is preserved as received.
    Record(Vec<(String, FieldValue)>),
}

static EMPTY: FieldValue = FieldValue::Empty;

impl FieldValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        FieldValue::Scalar(text.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Sequence(items.into_iter().map(|s| FieldValue::Scalar(s.into())).collect())
    }

    pub fn record<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        FieldValue::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), FieldValue::Scalar(v.into())))
                .collect(),
        )
    }

    /// True when the value carries no text at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Scalar(s) => s.trim().is_empty(),
            FieldValue::Sequence(items) => items.iter().all(FieldValue::is_empty),
            FieldValue::Record(fields) => fields.iter().all(|(_, v)| v.is_empty()),
        }
    }

    /// Looks up a record attribute by exact key.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Record(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Scalar leaves in order, skipping blanks.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldValue::Empty => {}
            FieldValue::Scalar(s) => {
                if !s.trim().is_empty() {
                    out.push(s.as_str());
                }
            }
            FieldValue::Sequence(items) => items.iter().for_each(|v| v.collect_leaves(out)),
            FieldValue::Record(fields) => fields.iter().for_each(|(_, v)| v.collect_leaves(out)),
        }
    }

    /// Deterministic text form used for narrative comparison.
    pub fn flatten_text(&self) -> String {
        self.leaves().join("\n")
    }

    /// Number of items shown in the section table.
    pub fn item_count(&self) -> usize {
        match self {
            FieldValue::Empty => 0,
            FieldValue::Scalar(s) => s.chars().count(),
            FieldValue::Sequence(items) => items.len(),
            FieldValue::Record(fields) => fields.len(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Empty,
            Value::Bool(b) => FieldValue::Scalar(b.to_string()),
            Value::Number(n) => FieldValue::Scalar(n.to_string()),
            Value::String(s) => FieldValue::Scalar(s),
            Value::Array(items) => {
                FieldValue::Sequence(items.into_iter().map(FieldValue::from).collect())
            }
            Value::Object(map) => FieldValue::Record(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(value.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("profile must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// One candidate's structured data keyed by section name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    entries: BTreeMap<String, FieldValue>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ProfileError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, ProfileError> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            }),
            Value::Null => Err(ProfileError::NotAnObject("null")),
            Value::Bool(_) => Err(ProfileError::NotAnObject("boolean")),
            Value::Number(_) => Err(ProfileError::NotAnObject("number")),
            Value::String(_) => Err(ProfileError::NotAnObject("string")),
            Value::Array(_) => Err(ProfileError::NotAnObject("array")),
        }
    }

    /// Resolves a raw key, trying it verbatim, lower-cased, with `_` as space,
    /// and lower-cased with `_` as space.
    pub fn lookup(&self, key: &str) -> Option<&FieldValue> {
        let lower = key.to_lowercase();
        let candidates = [
            key.to_string(),
            lower.clone(),
            key.replace('_', " "),
            lower.replace('_', " "),
        ];
        candidates.iter().find_map(|k| self.entries.get(k))
    }

    /// Section value by localized or English key; `Empty` when absent.
    pub fn field(&self, field: SectionField) -> &FieldValue {
        field
            .keys()
            .find_map(|key| self.lookup(key))
            .unwrap_or(&EMPTY)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Profile::from_json(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_onto_tagged_union() {
        let value = FieldValue::from(json!([
            "Python",
            {"dil": "İngilizce", "seviyesi": "B2"},
            42,
            null
        ]));

        let FieldValue::Sequence(items) = value else {
            panic!("expected a sequence");
        };
        assert_eq!(items[0], FieldValue::scalar("Python"));
        assert_eq!(items[1].get("dil"), Some(&FieldValue::scalar("İngilizce")));
        assert_eq!(items[2], FieldValue::scalar("42"));
        assert_eq!(items[3], FieldValue::Empty);
    }

    #[test]
    fn lookup_tolerates_case_and_separator_variance() {
        let profile = Profile::new()
            .with("technical skills", FieldValue::list(["Rust"]))
            .with("skills", FieldValue::list(["Excel"]));

        assert_eq!(
            profile.field(SectionField::TechnicalSkills),
            &FieldValue::list(["Rust"])
        );
        assert_eq!(profile.field(SectionField::Skills), &FieldValue::list(["Excel"]));
        assert_eq!(profile.field(SectionField::Courses), &FieldValue::Empty);
    }

    #[test]
    fn localized_key_wins_over_english() {
        let profile = Profile::new()
            .with("YETENEKLER", FieldValue::list(["Excel"]))
            .with("SKILLS", FieldValue::list(["Word"]));

        assert_eq!(profile.field(SectionField::Skills), &FieldValue::list(["Excel"]));
    }

    #[test]
    fn top_level_must_be_an_object() {
        let err = Profile::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, ProfileError::NotAnObject("array")));
        assert!(Profile::from_json_str("{not json").is_err());
    }

    #[test]
    fn flatten_text_uses_leaves_in_order() {
        let value = FieldValue::from(json!([
            {"Raw_Entry": "Backend Developer", "Kurum": "Acme"},
            "Freelance"
        ]));
        // serde_json sorts object keys
        assert_eq!(value.flatten_text(), "Acme\nBackend Developer\nFreelance");
    }

    #[test]
    fn item_counts_follow_value_shape() {
        assert_eq!(FieldValue::scalar("abc").item_count(), 3);
        assert_eq!(FieldValue::list(["a", "b"]).item_count(), 2);
        assert_eq!(FieldValue::record([("dil", "x")]).item_count(), 1);
        assert_eq!(FieldValue::Empty.item_count(), 0);
    }
}
