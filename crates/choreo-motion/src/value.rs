//! Core value types and identifiers.
//!
//! - `PropertyValue`: a number, CSS-like string, or keyframe array
//! - `StyleMap`: property name → value, the unit handed to the primitive
//! - `NodeId`, `ElementRef`, `ObserverId`: opaque identifiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Property name → value map, ordered by property name.
pub type StyleMap = BTreeMap<String, PropertyValue>;

/// Process-unique identifier for an element node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Host-side handle to a rendered element.
///
/// The engine never dereferences it; it is only passed back to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub u64);

/// Identifier of a visibility observer created by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

/// An animatable property value.
///
/// Arrays are keyframe sequences and are handed to the primitive untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Plain number (opacity, pixels, degrees, scale factor).
    Number(f64),
    /// CSS-like string (`"10px"`, `"#ff0000"`, `"rotate(5deg)"`).
    Text(String),
    /// Keyframe sequence.
    Keyframes(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// String value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this value is a keyframe array.
    pub fn is_keyframes(&self) -> bool {
        matches!(self, Self::Keyframes(_))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        Self::Keyframes(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Keyframes(frames) => {
                f.write_str("[")?;
                for (i, frame) in frames.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{frame}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn property_values_deserialize_by_shape() {
        let value: PropertyValue = serde_json::from_str("0.5").unwrap();
        assert_eq!(value, PropertyValue::Number(0.5));

        let value: PropertyValue = serde_json::from_str("\"10px\"").unwrap();
        assert_eq!(value.as_str(), Some("10px"));

        let value: PropertyValue = serde_json::from_str("[0, \"50%\", 1]").unwrap();
        assert!(value.is_keyframes());
        assert_eq!(value.to_string(), "[0, 50%, 1]");
    }
}
