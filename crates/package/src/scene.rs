//! Scene description (`scene.json`) model.
//!
//! Only the parts used for browsing are decoded: the object list, the
//! orthogonal projection size and the camera. Scene files come from many
//! editor versions, so every field is optional and vectors are accepted both
//! as `"x y z"` strings and as arrays.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    #[serde(rename = "orthogonalprojection")]
    pub orthogonal_projection: Option<Projection>,
    pub camera: Option<Camera>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneObject {
    pub name: Option<String>,
    pub image: Option<String>,
    pub material: Option<String>,
    #[serde(deserialize_with = "lenient_vector")]
    pub origin: Option<Vector3>,
    #[serde(deserialize_with = "lenient_vector")]
    pub scale: Option<Vector3>,
    #[serde(deserialize_with = "lenient_vector")]
    pub angles: Option<Vector3>,
    /// Either a plain boolean or a user-bindable `{"user": ..., "value": bool}`.
    pub visible: Option<Value>,
    pub effects: Vec<Effect>,
}

impl SceneObject {
    /// Objects are visible unless explicitly hidden.
    pub fn is_visible(&self) -> bool {
        match &self.visible {
            Some(Value::Bool(visible)) => *visible,
            Some(Value::Object(map)) => map.get("value").and_then(Value::as_bool).unwrap_or(true),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    #[serde(default)]
    pub file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Projection {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    #[serde(deserialize_with = "lenient_vector")]
    pub center: Option<Vector3>,
    #[serde(deserialize_with = "lenient_vector")]
    pub eye: Option<Vector3>,
    #[serde(deserialize_with = "lenient_vector")]
    pub up: Option<Vector3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3(pub f64, pub f64, pub f64);

impl Vector3 {
    fn from_value(value: &Value) -> Option<Self> {
        let components: Vec<f64> = match value {
            Value::String(text) => text.split_whitespace().map(str::parse).collect::<std::result::Result<_, _>>().ok()?,
            Value::Array(items) => items.iter().map(Value::as_f64).collect::<Option<_>>()?,
            _ => return None,
        };
        match components.as_slice() {
            [x, y, z] => Some(Self(*x, *y, *z)),
            _ => None,
        }
    }
}

// Anything that isn't a three-component vector decodes as absent.
fn lenient_vector<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Vector3>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Vector3::from_value))
}

impl Scene {
    /// Decode a scene description, skipping a leading byte-order mark.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
        serde_json::from_slice(bytes).or_raise(|| ErrorKind::malformed("scene is not a valid JSON object"))
    }

    /// Projection width and height, when both are present and non-zero.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        let projection = self.orthogonal_projection?;
        match (projection.width?, projection.height?) {
            (0, _) | (_, 0) => None,
            (width, height) => Some((width, height)),
        }
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| object.is_visible())
    }
}
