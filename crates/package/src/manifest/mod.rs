//! Project manifest model.
//!
//! The manifest (`project.json`) names a package, its type and preview, and
//! carries a map of user-configurable properties whose values are
//! dynamically typed. Unknown keys are ignored so newer manifests still load.

mod property;

pub use property::{ComboOption, Property, PropertyValue};

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::instrument;

/// Property key holding the scene's projection size as `"WIDTH HEIGHT"`.
pub const PROJECTION_PROPERTY: &str = "orthogonalprojection";

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A decoded project manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub title: String,
    /// Free-form type tag such as `scene`, `video` or `web`.
    pub kind: Option<String>,
    pub description: Option<String>,
    /// Main file of the package (scene description, video or HTML page).
    pub file: Option<String>,
    pub preview_file: Option<String>,
    pub tags: Vec<String>,
    pub workshop_id: Option<String>,
    pub workshop_url: Option<String>,
    pub version: Option<String>,
    pub content_rating: Option<String>,
    pub properties: BTreeMap<String, Property>,
    pub supports_audio_processing: Option<bool>,
    pub supports_video: Option<bool>,
}

#[derive(Deserialize)]
struct RawManifest {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    file: Option<String>,
    preview: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    workshopid: Option<Value>,
    workshopurl: Option<String>,
    version: Option<Value>,
    contentrating: Option<String>,
    #[serde(default)]
    general: RawGeneral,
}

#[derive(Deserialize, Default)]
struct RawGeneral {
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    supportsaudioprocessing: Option<bool>,
    supportsvideo: Option<bool>,
}

impl Manifest {
    /// Load and decode a manifest file.
    ///
    /// # Errors
    ///
    /// [`NotFound`](ErrorKind::NotFound) when the file doesn't exist and
    /// [`Malformed`](ErrorKind::Malformed) when it isn't a JSON object with a
    /// string `title`.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ErrorKind::from_io(&e, path))?;
        Self::from_slice(&bytes)
    }

    /// Decode a manifest from raw bytes, skipping a leading byte-order mark.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallhub_package::manifest::Manifest;
    ///
    /// let manifest = Manifest::from_slice(br#"{"title":"Demo","type":"Scene"}"#).unwrap();
    /// assert_eq!(manifest.title, "Demo");
    /// assert_eq!(manifest.kind.as_deref(), Some("Scene"));
    /// ```
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
        let raw: RawManifest =
            serde_json::from_slice(bytes).or_raise(|| ErrorKind::malformed("manifest is not a valid JSON object"))?;
        let Some(title) = raw.title else {
            exn::bail!(ErrorKind::malformed("manifest has no `title`"));
        };

        let properties = raw
            .general
            .properties
            .into_iter()
            .map(|(key, value)| {
                let property = decode_property(&key, value);
                (key, property)
            })
            .collect();

        Ok(Self {
            title,
            kind: raw.kind,
            description: raw.description,
            file: raw.file,
            preview_file: raw.preview,
            tags: raw.tags,
            workshop_id: raw.workshopid.as_ref().and_then(scalar_text),
            workshop_url: raw.workshopurl,
            version: raw.version.as_ref().and_then(scalar_text),
            content_rating: raw.contentrating,
            properties,
            supports_audio_processing: raw.general.supportsaudioprocessing,
            supports_video: raw.general.supportsvideo,
        })
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn property_value(&self, key: &str) -> Option<&PropertyValue> {
        self.property(key).and_then(|property| property.value.as_ref())
    }

    /// Width and height from the projection-size property.
    ///
    /// The value must be text of at least two whitespace separated tokens,
    /// the first and last of which are unsigned integers. Anything else means
    /// the size is unknown.
    pub fn projection_size(&self) -> Option<(u32, u32)> {
        let text = self.property_value(PROJECTION_PROPERTY)?.as_str()?;
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 2 {
            return None;
        }
        let width = tokens.first()?.parse().ok()?;
        let height = tokens.last()?.parse().ok()?;
        Some((width, height))
    }
}

/// Properties are normally objects with a `value`, but a bare value is
/// accepted as a property with only a value.
fn decode_property(key: &str, value: Value) -> Property {
    let Value::Object(object) = value else {
        return Property { value: Some(PropertyValue::from_json(&value)), ..Default::default() };
    };
    let raw_value = object.get("value").filter(|value| !value.is_null()).map(PropertyValue::from_json);
    match serde_json::from_value::<Property>(Value::Object(object)) {
        Ok(property) => property,
        Err(err) => {
            tracing::debug!(key, error = %err, "property object didn't decode, keeping only its value");
            Property { value: raw_value, ..Default::default() }
        },
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn manifest(value: Value) -> Result<Manifest> {
        Manifest::from_slice(value.to_string().as_bytes())
    }

    #[test]
    fn minimal_manifest() {
        let m = manifest(json!({"title": "Demo", "type": "Scene"})).unwrap();
        assert_eq!(m.title, "Demo");
        assert_eq!(m.kind.as_deref(), Some("Scene"));
        assert!(m.preview_file.is_none());
        assert!(m.tags.is_empty());
        assert!(m.properties.is_empty());
        assert_eq!(m.projection_size(), None);
    }

    #[test]
    fn full_manifest() {
        let m = manifest(json!({
            "title": "Ocean",
            "type": "scene",
            "description": "Waves",
            "file": "scene.json",
            "preview": "preview.gif",
            "tags": ["Nature", "Water"],
            "workshopid": 1234567890u64,
            "workshopurl": "steam://url/CommunityFilePage/1234567890",
            "version": 3,
            "contentrating": "Everyone",
            "approved": true,
            "general": {
                "supportsaudioprocessing": true,
                "properties": {
                    "schemecolor": {"type": "color", "text": "ui_browse_properties_scheme_color", "value": "0.1 0.2 0.3", "order": 0},
                    "speed": {"type": "slider", "value": 1.5, "min": 0, "max": 5},
                    "orthogonalprojection": {"value": "1920 1080"}
                }
            }
        }))
        .unwrap();
        assert_eq!(m.preview_file.as_deref(), Some("preview.gif"));
        assert_eq!(m.tags, vec!["Nature", "Water"]);
        assert_eq!(m.workshop_id.as_deref(), Some("1234567890"));
        assert_eq!(m.version.as_deref(), Some("3"));
        assert_eq!(m.supports_audio_processing, Some(true));
        assert_eq!(m.supports_video, None);
        assert_eq!(m.property_value("speed"), Some(&PropertyValue::Float(1.5)));
        assert_eq!(m.property_value("schemecolor").and_then(PropertyValue::as_str), Some("0.1 0.2 0.3"));
        assert_eq!(m.projection_size(), Some((1920, 1080)));
    }

    #[test]
    fn missing_title_is_malformed() {
        let err = manifest(json!({"type": "Scene"})).unwrap_err();
        assert!(matches!(*err, ErrorKind::Malformed(_)));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"not json")]
    #[case(b"[1, 2, 3]")]
    #[case(br#"{"title": 5}"#)]
    fn invalid_documents_are_malformed(#[case] bytes: &[u8]) {
        let err = Manifest::from_slice(bytes).unwrap_err();
        assert!(matches!(*err, ErrorKind::Malformed(_)));
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let mut bytes = BOM.to_vec();
        bytes.extend_from_slice(br#"{"title":"BOM"}"#);
        assert_eq!(Manifest::from_slice(&bytes).unwrap().title, "BOM");
    }

    #[test]
    fn bare_property_values_are_accepted() {
        let m = manifest(json!({"title": "T", "general": {"properties": {"fps": "30", "list": [1]}}})).unwrap();
        assert_eq!(m.property_value("fps"), Some(&PropertyValue::Int(30)));
        assert_eq!(m.property_value("list"), Some(&PropertyValue::String("[1]".into())));
    }

    #[rstest]
    #[case(json!("1920 1080"), Some((1920, 1080)))]
    #[case(json!("2560\t0\t1440"), Some((2560, 1440)))]
    #[case(json!("1920"), None)]
    #[case(json!(""), None)]
    #[case(json!("wide 1080"), None)]
    #[case(json!("-1 1080"), None)]
    #[case(json!(1920), None)]
    fn projection_size(#[case] value: Value, #[case] expected: Option<(u32, u32)>) {
        let m = manifest(json!({"title": "T", "general": {"properties": {"orthogonalprojection": {"value": value}}}}))
            .unwrap();
        assert_eq!(m.projection_size(), expected);
    }

    #[test]
    fn mistyped_property_fields_keep_projection() {
        let m = manifest(json!({
            "title": "T",
            "general": {"properties": {
                "orthogonalprojection": {"type": "text", "value": "1920 1080", "order": "1"}
            }}
        }))
        .unwrap();
        assert_eq!(m.property_value(PROJECTION_PROPERTY), Some(&PropertyValue::String("1920 1080".into())));
        assert_eq!(m.property(PROJECTION_PROPERTY).and_then(|p| p.order), Some(1));
        assert_eq!(m.projection_size(), Some((1920, 1080)));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let err = Manifest::load(&path).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(path));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(&path, r#"{"title":"On disk","tags":["a"]}"#).unwrap();
        let m = Manifest::load(&path).unwrap();
        assert_eq!(m.title, "On disk");
        assert_eq!(m.tags, vec!["a"]);
    }
}
