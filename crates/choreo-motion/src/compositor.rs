//! Style/transform composition.
//!
//! Turns a variant's style properties into the map handed to the primitive:
//! - scalar transform-axis keys (`x`, `y`, `rotate`, `scale`, `scaleX`,
//!   `scaleY`) collapse into one `transform: matrix(...)` value
//! - keyframe arrays pass through under their own key
//! - named colors on color keys map to hex
//! - everything else passes through unchanged
//!
//! Axis contributions accumulate per group (translate, rotate, scale) in the
//! order they are pushed; groups combine as translate · rotate · scale.

use crate::transform::Transform2D;
use crate::value::{PropertyValue, StyleMap};
use crate::variant::is_metadata_key;

/// Output key for the composed matrix.
pub const TRANSFORM_KEY: &str = "transform";

const COLOR_KEYS: [&str; 3] = ["backgroundColor", "color", "borderColor"];

const NAMED_COLORS: [(&str, &str); 9] = [
    ("aqua", "#00ffff"),
    ("red", "#ff0000"),
    ("blue", "#0000ff"),
    ("green", "#008000"),
    ("yellow", "#ffff00"),
    ("purple", "#800080"),
    ("orange", "#ffa500"),
    ("black", "#000000"),
    ("white", "#ffffff"),
];

/// How a property key is treated by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyClass {
    /// Contributes to the composed matrix.
    Axis(Axis),
    /// Named colors are normalized to hex.
    Color,
    /// A raw `transform` string, kept alongside the composed matrix.
    RawTransform,
    /// Passed through untouched.
    Generic,
}

/// Transform-axis keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Rotate,
    Scale,
    ScaleX,
    ScaleY,
}

/// Classify a property key.
pub fn classify(key: &str) -> PropertyClass {
    match key {
        "x" => PropertyClass::Axis(Axis::X),
        "y" => PropertyClass::Axis(Axis::Y),
        "rotate" => PropertyClass::Axis(Axis::Rotate),
        "scale" => PropertyClass::Axis(Axis::Scale),
        "scaleX" => PropertyClass::Axis(Axis::ScaleX),
        "scaleY" => PropertyClass::Axis(Axis::ScaleY),
        TRANSFORM_KEY => PropertyClass::RawTransform,
        key if COLOR_KEYS.contains(&key) => PropertyClass::Color,
        _ => PropertyClass::Generic,
    }
}

/// Accumulates axis contributions into translate/rotate/scale groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformAccumulator {
    translate: Transform2D,
    rotate: Transform2D,
    scale: Transform2D,
    touched: bool,
}

impl TransformAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiply one axis contribution onto its group.
    pub fn push(&mut self, axis: Axis, value: f64) {
        let (group, step) = match axis {
            Axis::X => (&mut self.translate, Transform2D::translate(value, 0.0)),
            Axis::Y => (&mut self.translate, Transform2D::translate(0.0, value)),
            Axis::Rotate => (&mut self.rotate, Transform2D::rotate_deg(value)),
            Axis::Scale => (&mut self.scale, Transform2D::scale(value, value)),
            Axis::ScaleX => (&mut self.scale, Transform2D::scale(value, 1.0)),
            Axis::ScaleY => (&mut self.scale, Transform2D::scale(1.0, value)),
        };
        *group = group.then(&step);
        self.touched = true;
    }

    /// Whether any contribution was pushed.
    pub fn is_empty(&self) -> bool {
        !self.touched
    }

    /// Combined matrix, translate · rotate · scale.
    pub fn matrix(&self) -> Transform2D {
        self.translate.then(&self.rotate).then(&self.scale)
    }
}

/// Compose style properties into the map handed to the primitive.
pub fn compose(properties: &StyleMap) -> StyleMap {
    let mut output = StyleMap::new();
    let mut accumulator = TransformAccumulator::new();
    let mut raw_transform: Option<PropertyValue> = None;

    for (key, value) in properties {
        if is_metadata_key(key) {
            continue;
        }

        match (classify(key), value) {
            (_, PropertyValue::Keyframes(_)) => {
                output.insert(key.clone(), value.clone());
            }
            (PropertyClass::Axis(axis), _) => match parse_scalar(value) {
                Some(scalar) => accumulator.push(axis, scalar),
                None => {
                    tracing::debug!(
                        property = %key,
                        %value,
                        "non-numeric transform value passed through"
                    );
                    output.insert(key.clone(), value.clone());
                }
            },
            (PropertyClass::Color, PropertyValue::Text(text)) => {
                output.insert(key.clone(), PropertyValue::Text(normalize_color(text)));
            }
            (PropertyClass::RawTransform, _) => {
                raw_transform = Some(value.clone());
            }
            _ => {
                output.insert(key.clone(), value.clone());
            }
        }
    }

    let matrix = (!accumulator.is_empty()).then(|| accumulator.matrix().to_css());
    let transform = match (raw_transform, matrix) {
        (Some(PropertyValue::Text(raw)), Some(matrix)) => {
            Some(PropertyValue::Text(format!("{raw} {matrix}")))
        }
        (Some(raw), None) => Some(raw),
        (Some(raw), Some(matrix)) => {
            tracing::debug!(%raw, "non-text transform dropped in favour of composed matrix");
            Some(PropertyValue::Text(matrix))
        }
        (None, Some(matrix)) => Some(PropertyValue::Text(matrix)),
        (None, None) => None,
    };
    if let Some(transform) = transform {
        output.insert(TRANSFORM_KEY.to_string(), transform);
    }

    output
}

/// Map a named color to hex; anything else passes through.
pub fn normalize_color(value: &str) -> String {
    let lowered = value.trim().to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, hex)| (*hex).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Numbers, or strings like `"10px"` / `"45deg"`.
fn parse_scalar(value: &PropertyValue) -> Option<f64> {
    match value {
        PropertyValue::Number(number) => Some(*number),
        PropertyValue::Text(text) => {
            let text = text.trim();
            let number = text
                .strip_suffix("px")
                .or_else(|| text.strip_suffix("deg"))
                .unwrap_or(text);
            number.trim().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        PropertyValue::Keyframes(_) => None,
    }
}
