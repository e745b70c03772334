//! Media artifacts passed between nodes.
//!
//! A [`MediaFile`] is a reference to stored media plus the metadata plugins
//! need to route and transform it. Files are never mutated in place: a plugin
//! that transforms a file emits a new one whose id carries the parent's id and
//! a lineage suffix (see [`MediaFile::derive`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// The kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Audio,
}

impl MediaType {
    /// Infers the media type from a MIME type, defaulting to image.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Image
        }
    }

    /// Parses the lowercase wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed media artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    /// Identity, including lineage suffixes for derived files.
    pub id: String,
    /// Where the bytes live.
    pub url: String,
    /// Display file name.
    pub name: String,
    /// Media kind.
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Container format, e.g. `png` or `mp4`.
    #[serde(default)]
    pub format: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Duration in seconds for video and audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, JsonValue>>,
}

impl MediaFile {
    /// Creates a file with the required fields; optional fields are empty.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        name: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: name.into(),
            media_type,
            format: String::new(),
            size: 0,
            width: None,
            height: None,
            duration: None,
            metadata: None,
        }
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the size in bytes.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Sets pixel dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Returns true if the file is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }

    /// Starts a derived file: a copy whose id is `<id>_<suffix>`.
    ///
    /// Callers overwrite the url, name and format of the copy; the parent is
    /// left untouched.
    #[must_use]
    pub fn derive(&self, suffix: &str) -> Self {
        let mut derived = self.clone();
        derived.id = format!("{}_{suffix}", self.id);
        derived
    }

    /// Returns the metadata merged with `entries`, later keys winning.
    #[must_use]
    pub fn metadata_with(
        &self,
        entries: impl IntoIterator<Item = (&'static str, JsonValue)>,
    ) -> Map<String, JsonValue> {
        let mut merged = self.metadata.clone().unwrap_or_default();
        for (key, value) in entries {
            merged.insert(key.to_string(), value);
        }
        merged
    }
}

/// Normalizes a format string: one leading dot stripped, lowercased.
#[must_use]
pub fn normalize_format(format: &str) -> String {
    format.strip_prefix('.').unwrap_or(format).to_lowercase()
}

/// Replaces a trailing `.<ext>` in `name` with `replacement`.
///
/// Names without a non-empty, dot-free extension are returned unchanged.
#[must_use]
pub fn replace_extension(name: &str, replacement: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => format!("{}{replacement}", &name[..dot]),
        _ => name.to_string(),
    }
}

/// Coerces a loosely-typed JSON value into a [`MediaFile`].
///
/// Requires string `url` and `name`; anything else is rejected with `None`.
/// Missing fields get the same defaults the authoring tools assume: `id`
/// falls back to the url, `type` to the `metadata.mimeType` family.
#[must_use]
pub fn coerce_media_file(value: &JsonValue) -> Option<MediaFile> {
    let record = value.as_object()?;
    let url = record.get("url")?.as_str()?;
    let name = record.get("name")?.as_str()?;

    let id = record.get("id").and_then(JsonValue::as_str).unwrap_or(url);
    let metadata = record.get("metadata").and_then(JsonValue::as_object).cloned();
    let mime = metadata
        .as_ref()
        .and_then(|m| m.get("mimeType"))
        .and_then(JsonValue::as_str)
        .unwrap_or("");
    let media_type = record
        .get("type")
        .and_then(JsonValue::as_str)
        .and_then(MediaType::from_name)
        .unwrap_or_else(|| MediaType::from_mime(mime));

    let dimension = |key: &str| {
        record
            .get(key)
            .and_then(JsonValue::as_f64)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u32)
    };

    Some(MediaFile {
        id: id.to_string(),
        url: url.to_string(),
        name: name.to_string(),
        media_type,
        format: record
            .get("format")
            .and_then(JsonValue::as_str)
            .unwrap_or("")
            .to_string(),
        size: record
            .get("size")
            .and_then(JsonValue::as_f64)
            .filter(|v| *v >= 0.0)
            .map_or(0, |v| v as u64),
        width: dimension("width"),
        height: dimension("height"),
        duration: record.get("duration").and_then(JsonValue::as_f64),
        metadata,
    })
}
