//! Declarative mapping from untyped JSON trees to domain entities.
//!
//! A [`Rule`] names a source path (a list of keys, not a single dotted
//! string, so that a provider's JSON key containing a literal `.` is still
//! representable), a target field name, whether the rule is required, and
//! an optional [`Transform`]. An [`ExtractorSet`] groups the rules that
//! describe one entity shape (search result, manga, chapter, chapter list)
//! and extracts them into a `serde_json::Map` keyed by target field name,
//! ready for a provider to assemble into a typed [`crate::types::Manga`] /
//! [`crate::types::ChapterInfo`] etc.
//!
//! This generalizes the dotted-path walker in [`crate::net::json`] into a
//! reusable rule table, so providers describe "where the data is" once
//! instead of hand-writing path-walking code per field.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Extracts a value from nested JSON by walking a dot-separated path.
pub fn extract_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    Some(current.clone())
}

/// Extracts and deserializes a value at a dotted path.
pub fn extract_as<T>(json: &Value, path: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    extract_path(json, path)
        .ok_or_else(|| Error::parse(format!("Path not found: {path}")))
        .and_then(|v| serde_json::from_value(v).map_err(Into::into))
}

/// Extracts an array at a dotted path; empty if absent or not an array.
pub fn extract_array(json: &Value, path: &str) -> Vec<Value> {
    extract_path(json, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// A post-extraction transform applied to a raw value before it is placed
/// in the output map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// No transform; value is used as extracted.
    None,
    /// Treats the value as a locale → string map and picks `en`, falling
    /// back to the first non-empty value in the map's insertion order.
    PreferLocale,
}

/// One field mapping within an [`ExtractorSet`].
#[derive(Debug, Clone)]
pub struct Rule {
    /// Path segments walked in order from the extraction root.
    pub path: Vec<String>,
    /// Name this value is stored under in the extracted map.
    pub target: String,
    pub required: bool,
    pub transform: Transform,
}

impl Rule {
    pub fn new(path: &[&str], target: impl Into<String>) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
            target: target.into(),
            required: false,
            transform: Transform::None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    fn walk<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for key in &self.path {
            current = match current {
                Value::Object(_) => current.get(key)?,
                Value::Array(_) => current.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// A group of [`Rule`]s describing one entity shape.
#[derive(Debug, Clone, Default)]
pub struct ExtractorSet {
    pub rules: Vec<Rule>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Applies every rule to `root`, producing a map of target field name →
    /// extracted value. Missing non-required paths are simply absent from
    /// the map. A missing required path fails the whole extraction with
    /// category `parse` and context `{path, rule}`.
    pub fn extract(&self, root: &Value) -> Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for rule in &self.rules {
            match rule.walk(root) {
                Some(value) => {
                    let value = apply_transform(value, rule.transform);
                    out.insert(rule.target.clone(), value);
                }
                None if rule.required => {
                    return Err(Error::parse(format!(
                        "required path not found: {} (rule: {})",
                        rule.path_string(),
                        rule.target
                    )));
                }
                None => {}
            }
        }
        Ok(out)
    }

    /// Applies this set to every element of the array at `list_path`
    /// (dotted, relative to `root`). Elements whose required rules fail are
    /// omitted (logged, not propagated) rather than failing the whole list.
    pub fn extract_list(
        &self,
        root: &Value,
        list_path: &str,
    ) -> Vec<BTreeMap<String, Value>> {
        extract_array(root, list_path)
            .into_iter()
            .filter_map(|item| match self.extract(&item) {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping element that failed required extraction");
                    None
                }
            })
            .collect()
    }
}

fn apply_transform(value: &Value, transform: Transform) -> Value {
    match transform {
        Transform::None => value.clone(),
        Transform::PreferLocale => prefer_locale(value),
    }
}

/// Picks `en` from a locale → string object, falling back to the first
/// non-empty value in the object's insertion order. Non-object inputs pass
/// through unchanged.
fn prefer_locale(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    if let Some(en) = map.get("en") {
        if en.as_str().is_some_and(|s| !s.is_empty()) {
            return en.clone();
        }
    }
    for (_, v) in map.iter() {
        if v.as_str().is_some_and(|s| !s.is_empty()) {
            return v.clone();
        }
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_rule_missing_fails_with_parse_category() {
        let set = ExtractorSet::new().with_rule(Rule::new(&["title"], "title").required());
        let err = set.extract(&json!({})).unwrap_err();
        assert_eq!(err.category(), crate::error::Category::Parse);
    }

    #[test]
    fn optional_rule_missing_is_absent_not_error() {
        let set = ExtractorSet::new().with_rule(Rule::new(&["subtitle"], "subtitle"));
        let map = set.extract(&json!({"title": "One Piece"})).unwrap();
        assert!(!map.contains_key("subtitle"));
    }

    #[test]
    fn prefer_locale_picks_english_first() {
        let set = ExtractorSet::new().with_rule(
            Rule::new(&["title"], "title").with_transform(Transform::PreferLocale),
        );
        let map = set
            .extract(&json!({"title": {"ja": "ワンピース", "en": "One Piece"}}))
            .unwrap();
        assert_eq!(map["title"], json!("One Piece"));
    }

    #[test]
    fn prefer_locale_falls_back_to_first_non_empty() {
        let set = ExtractorSet::new().with_rule(
            Rule::new(&["title"], "title").with_transform(Transform::PreferLocale),
        );
        let map = set
            .extract(&json!({"title": {"ja": "", "fr": "One Piece"}}))
            .unwrap();
        assert_eq!(map["title"], json!("One Piece"));
    }

    #[test]
    fn extract_list_omits_elements_failing_required_rules() {
        let set = ExtractorSet::new().with_rule(Rule::new(&["id"], "id").required());
        let root = json!({"items": [{"id": "1"}, {"notId": "x"}, {"id": "3"}]});
        let results = set.extract_list(&root, "items");
        assert_eq!(results.len(), 2);
    }
}
