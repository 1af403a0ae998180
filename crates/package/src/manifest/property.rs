use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A dynamically typed property value.
///
/// Raw text is decoded by trying, in order, boolean, integer, floating point
/// and finally string. The order matters: `"1"` is an integer, never a float
/// or a string, and decoding can't fail because string accepts anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl PropertyValue {
    /// Decode raw text by ordered trial.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallhub_package::manifest::PropertyValue;
    ///
    /// assert_eq!(PropertyValue::decode("true"), PropertyValue::Bool(true));
    /// assert_eq!(PropertyValue::decode("42"), PropertyValue::Int(42));
    /// assert_eq!(PropertyValue::decode("3.14"), PropertyValue::Float(3.14));
    /// assert_eq!(PropertyValue::decode("hello"), PropertyValue::String("hello".into()));
    /// ```
    pub fn decode(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<bool>() {
            return Self::Bool(value);
        }
        if let Ok(value) = raw.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = raw.parse::<f64>()
            && value.is_finite()
        {
            return Self::Float(value);
        }
        Self::String(raw.to_string())
    }

    /// Decode an already parsed JSON value.
    ///
    /// Booleans and numbers keep their JSON type, strings go through
    /// [`decode`](Self::decode) and anything else is kept as its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Int(i),
                (None, Some(f)) => Self::Float(f),
                (None, None) => Self::String(n.to_string()),
            },
            Value::String(s) => Self::decode(s),
            other => Self::String(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::from_json(&value))
    }
}

/// One entry of a combo-box style property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboOption {
    #[serde(default)]
    pub label: String,
    pub value: PropertyValue,
}

/// A user-configurable package property from `general.properties`.
///
/// Manifests are hand-edited, so every field other than `value` is decoded
/// leniently: `"min": "0"` is read as `0.0`, and a field of the wrong shape is
/// dropped instead of failing the whole property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Property {
    /// Control type, e.g. `slider`, `color`, `bool`, `combo`, `textinput`.
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    /// Label (often a localisation key such as `ui_browse_properties_scheme_color`).
    #[serde(deserialize_with = "lenient_text")]
    pub text: Option<String>,
    pub value: Option<PropertyValue>,
    #[serde(deserialize_with = "lenient_f64")]
    pub min: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub step: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub precision: Option<u32>,
    #[serde(deserialize_with = "lenient_bool")]
    pub fraction: Option<bool>,
    #[serde(deserialize_with = "lenient_i64")]
    pub index: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub order: Option<i64>,
    #[serde(deserialize_with = "lenient_options")]
    pub options: Vec<ComboOption>,
}

fn lenient_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PropertyValue>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.is_null()).map(|value| PropertyValue::from_json(&value)))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_value(deserializer)?.and_then(|value| value.as_f64()))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(lenient_value(deserializer)?.and_then(|value| value.as_i64()))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient_i64(deserializer)?.and_then(|value| u32::try_from(value).ok()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(lenient_value(deserializer)?.and_then(|value| value.as_bool()))
}

fn lenient_options<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ComboOption>, D::Error> {
    let Some(Value::Array(items)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(|item| serde_json::from_value(item).ok()).collect())
}

impl Property {
    /// Whether the user can change this property.
    ///
    /// Properties without a control type are plain labels or group headers.
    pub fn is_configurable(&self) -> bool {
        self.kind.as_deref().is_some_and(|kind| !matches!(kind, "" | "group" | "label"))
    }
}
