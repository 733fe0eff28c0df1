//! Variants, variant tables, and variant reference resolution.
//!
//! A [`Variant`] is a snapshot of target property values plus two metadata
//! keys: `transition` (timing override) and `at` (absolute start offset in
//! seconds). Metadata is split off at parse time and filtered again on every
//! read, so it can never reach the primitive as an animatable property.
//!
//! A [`VariantRef`] is what hosts put in `initial`, `animate`, `whileHover`,
//! etc.: a name into the owning node's [`VariantTable`], an inline object, or
//! nothing. Resolution never fails; an unknown name yields an empty variant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::options::{Transition, TransitionConfig};
use crate::value::{PropertyValue, StyleMap};

/// Keys that carry metadata rather than animatable values.
pub const METADATA_KEYS: [&str; 2] = ["transition", "at"];

/// Whether a property key is metadata.
pub fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}

/// Target property values plus optional timing metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Timing override used when animating to this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    /// Absolute start offset in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<f64>,
    /// Animatable properties.
    #[serde(flatten)]
    pub properties: StyleMap,
}

impl Variant {
    /// Create an empty variant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat a property map as a variant.
    pub fn from_properties(properties: StyleMap) -> Self {
        Self {
            transition: None,
            at: None,
            properties,
        }
    }

    /// Set a property value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the embedded transition.
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Animatable properties with metadata stripped.
    pub fn style_properties(&self) -> StyleMap {
        self.properties
            .iter()
            .filter(|(key, _)| !is_metadata_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Whether the variant has no animatable properties.
    pub fn is_empty(&self) -> bool {
        self.properties.keys().all(|key| is_metadata_key(key))
    }

    /// Whether any animatable property is a keyframe array.
    pub fn has_keyframes(&self) -> bool {
        self.properties
            .iter()
            .any(|(key, value)| !is_metadata_key(key) && value.is_keyframes())
    }

    /// The embedded transition when it is a uniform config.
    pub fn uniform_transition(&self) -> Option<&TransitionConfig> {
        self.transition.as_ref().and_then(Transition::uniform)
    }

    /// The embedded transition when it is keyed by property.
    pub fn per_property_transition(&self) -> Option<&BTreeMap<String, TransitionConfig>> {
        self.transition.as_ref().and_then(Transition::per_property)
    }
}

/// Named variants owned by one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantTable {
    variants: BTreeMap<String, Variant>,
}

impl VariantTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named variant.
    pub fn insert(&mut self, name: impl Into<String>, variant: Variant) {
        self.variants.insert(name.into(), variant);
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, variant: Variant) -> Self {
        self.insert(name, variant);
        self
    }

    /// Look up a variant by name.
    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.variants.get(name)
    }

    /// Number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Reference to a variant as written in host configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum VariantRef {
    /// Nothing configured.
    #[default]
    Unset,
    /// Name in the owning node's table.
    Named(String),
    /// Inline variant object.
    Inline(Variant),
}

impl VariantRef {
    /// Reference a named variant.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Interpret a JSON value by shape.
    ///
    /// Strings are names, objects are inline variants, `null`/`false` are
    /// unset. Anything else, or an object that is not a valid variant, is
    /// logged and treated as unset.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(name) => Self::Named(name.clone()),
            serde_json::Value::Object(_) => match serde_json::from_value(value.clone()) {
                Ok(variant) => Self::Inline(variant),
                Err(error) => {
                    tracing::warn!(%error, "malformed inline variant, treating as empty");
                    Self::Unset
                }
            },
            serde_json::Value::Null | serde_json::Value::Bool(false) => Self::Unset,
            other => {
                tracing::warn!(value = %other, "unsupported variant reference shape");
                Self::Unset
            }
        }
    }

    /// Whether anything is configured.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// The referenced name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Resolve against the owning node's table.
    ///
    /// Inline variants are returned unchanged; unknown names and `Unset`
    /// resolve to an empty variant.
    pub fn resolve<'a>(&'a self, table: &'a VariantTable) -> Cow<'a, Variant> {
        match self {
            Self::Inline(variant) => Cow::Borrowed(variant),
            Self::Named(name) => match table.get(name) {
                Some(variant) => Cow::Borrowed(variant),
                None => {
                    tracing::debug!(variant = %name, "unknown variant name, resolving to empty");
                    Cow::Owned(Variant::default())
                }
            },
            Self::Unset => Cow::Owned(Variant::default()),
        }
    }
}

impl From<&str> for VariantRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Variant> for VariantRef {
    fn from(variant: Variant) -> Self {
        Self::Inline(variant)
    }
}

impl Serialize for VariantRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::Named(name) => serializer.serialize_str(name),
            Self::Inline(variant) => variant.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for VariantRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> VariantTable {
        VariantTable::new()
            .with("hidden", Variant::new().with("opacity", 0.0).with("y", 20.0))
            .with("visible", Variant::new().with("opacity", 1.0).with("y", 0.0))
    }

    #[test]
    fn test_named_resolution_is_idempotent() {
        let table = table();
        let reference = VariantRef::named("visible");
        let first = reference.resolve(&table).style_properties();
        let second = reference.resolve(&table).style_properties();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first["opacity"], PropertyValue::Number(1.0));
    }

    #[test]
    fn test_unknown_name_resolves_to_empty() {
        let resolved = VariantRef::named("missing").resolve(&table()).into_owned();
        assert_eq!(resolved, Variant::default());
        assert!(resolved.style_properties().is_empty());
        assert!(VariantRef::Unset.resolve(&table()).is_empty());
    }

    #[test]
    fn test_inline_variant_returned_unchanged() {
        let inline = Variant::new().with("scale", 1.2);
        let reference = VariantRef::from(inline.clone());
        assert_eq!(reference.resolve(&VariantTable::new()).as_ref(), &inline);
    }

    #[test]
    fn test_metadata_split_at_parse() {
        let variant: Variant = serde_json::from_value(json!({
            "opacity": 1,
            "x": [0, 100],
            "transition": { "duration": 0.4 },
            "at": 0.2
        }))
        .unwrap();

        assert_eq!(variant.at, Some(0.2));
        assert_eq!(variant.uniform_transition().and_then(|t| t.duration), Some(0.4));
        let style = variant.style_properties();
        assert_eq!(style.len(), 2);
        assert!(!style.contains_key("transition"));
        assert!(!style.contains_key("at"));
        assert!(variant.has_keyframes());
    }

    #[test]
    fn test_style_extraction_round_trip() {
        let mut properties = StyleMap::new();
        properties.insert("opacity".into(), 0.5.into());
        properties.insert("at".into(), 1.0.into());
        properties.insert("transition".into(), "all 1s".into());
        let variant = Variant::from_properties(properties);

        let once = variant.style_properties();
        let twice = Variant::from_properties(once.clone()).style_properties();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 1);
        assert!(variant.properties.len() == 3 && !variant.is_empty());
    }

    #[test]
    fn test_reference_shapes() {
        assert_eq!(VariantRef::from_json(&json!("hover")), VariantRef::named("hover"));
        assert_eq!(VariantRef::from_json(&json!(null)), VariantRef::Unset);
        assert_eq!(VariantRef::from_json(&json!(false)), VariantRef::Unset);
        assert_eq!(VariantRef::from_json(&json!(42)), VariantRef::Unset);
        assert_eq!(
            VariantRef::from_json(&json!({ "opacity": { "nested": true } })),
            VariantRef::Unset
        );
        assert!(matches!(
            VariantRef::from_json(&json!({ "opacity": 0 })),
            VariantRef::Inline(_)
        ));
    }
}
