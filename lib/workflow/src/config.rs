//! Plugin configuration schemas and validation.
//!
//! Each built-in plugin has a typed config struct. Validation parses the raw
//! authoring JSON, fills declared defaults for omitted fields and enforces
//! numeric bounds. Unknown keys are kept in `extra` so newer editors can
//! attach fields older engines do not understand.

use crate::error::ConfigValidationError;
use crate::plugin::Plugin;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Identifies which schema a plugin's config is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSchema {
    MediaInput,
    MediaOutput,
    BackgroundRemoval,
    ImageUpscale,
    ImageReframe,
    PaletteExtraction,
    ImageResize,
    FormatConversion,
    PythonScript,
    MannequinTransfer,
    /// Any JSON object, unvalidated.
    Passthrough,
}

impl ConfigSchema {
    /// Parses `raw` into the matching [`PluginConfig`] variant.
    ///
    /// A non-object `raw` is treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] on wrong types or out-of-range values.
    pub fn parse(self, plugin_id: &str, raw: &JsonValue) -> Result<PluginConfig, ConfigValidationError> {
        let raw = match raw {
            JsonValue::Object(_) => raw.clone(),
            _ => JsonValue::Object(Map::new()),
        };

        let config = match self {
            Self::MediaInput => PluginConfig::MediaInput(decode(plugin_id, raw)?),
            Self::MediaOutput => PluginConfig::MediaOutput(decode(plugin_id, raw)?),
            Self::BackgroundRemoval => PluginConfig::BackgroundRemoval(decode(plugin_id, raw)?),
            Self::ImageUpscale => PluginConfig::ImageUpscale(decode(plugin_id, raw)?),
            Self::ImageReframe => PluginConfig::ImageReframe(decode(plugin_id, raw)?),
            Self::PaletteExtraction => PluginConfig::PaletteExtraction(decode(plugin_id, raw)?),
            Self::ImageResize => PluginConfig::ImageResize(decode(plugin_id, raw)?),
            Self::FormatConversion => PluginConfig::FormatConversion(decode(plugin_id, raw)?),
            Self::PythonScript => PluginConfig::PythonScript(decode(plugin_id, raw)?),
            Self::MannequinTransfer => PluginConfig::MannequinTransfer(decode(plugin_id, raw)?),
            Self::Passthrough => match raw {
                JsonValue::Object(map) => PluginConfig::Passthrough(map),
                _ => PluginConfig::Passthrough(Map::new()),
            },
        };

        config.check_bounds(plugin_id)?;
        Ok(config)
    }
}

/// Validates a node's raw config against `plugin`'s schema.
///
/// # Errors
///
/// Returns [`ConfigValidationError`] if the config does not satisfy the schema.
pub fn validate(plugin: &dyn Plugin, raw: &JsonValue) -> Result<PluginConfig, ConfigValidationError> {
    plugin.config_schema().parse(plugin.id(), raw)
}

fn decode<T: DeserializeOwned>(plugin_id: &str, raw: JsonValue) -> Result<T, ConfigValidationError> {
    serde_json::from_value(raw).map_err(|e| ConfigValidationError::shape(plugin_id, e.to_string()))
}

fn check_range<T>(plugin_id: &str, field: &str, value: T, min: T, max: T) -> Result<(), ConfigValidationError>
where
    T: PartialOrd + Display + Copy,
{
    if value < min || value > max {
        return Err(ConfigValidationError::field(
            plugin_id,
            field,
            format!("{value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}

/// Largest width or height a config may request.
pub const MAX_DIMENSION: u32 = 16_384;

fn check_dimension(plugin_id: &str, field: &str, value: u32) -> Result<(), ConfigValidationError> {
    if value == 0 {
        return Err(ConfigValidationError::field(plugin_id, field, "must be positive"));
    }
    if value > MAX_DIMENSION {
        return Err(ConfigValidationError::field(
            plugin_id,
            field,
            format!("{value} exceeds {MAX_DIMENSION}"),
        ));
    }
    Ok(())
}

/// Integer fields accept JSON floats without a fractional part, so `100.0`
/// reads as `100`.
mod whole {
    use serde::Deserialize;
    use serde::de::{Deserializer, Error};
    use serde_json::Number;

    fn to_integer<T: TryFrom<u64>, E: Error>(number: &Number) -> Result<T, E> {
        let value = number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        });
        value
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| E::custom(format!("expected a non-negative integer in range, got {number}")))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        to_integer(&Number::deserialize(deserializer)?)
    }

    pub mod option {
        use super::{Deserialize, Deserializer, Number};

        pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            D: Deserializer<'de>,
            T: TryFrom<u64>,
        {
            Option::<Number>::deserialize(deserializer)?
                .map(|number| super::to_integer(&number))
                .transpose()
        }
    }
}

/// A validated node config, one variant per schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginConfig {
    MediaInput(MediaInputConfig),
    MediaOutput(MediaOutputConfig),
    BackgroundRemoval(BackgroundRemovalConfig),
    ImageUpscale(ImageUpscaleConfig),
    ImageReframe(ImageReframeConfig),
    PaletteExtraction(PaletteExtractionConfig),
    ImageResize(ImageResizeConfig),
    FormatConversion(FormatConversionConfig),
    PythonScript(PythonScriptConfig),
    MannequinTransfer(MannequinTransferConfig),
    Passthrough(Map<String, JsonValue>),
}

impl PluginConfig {
    /// Returns the schema this config was validated against.
    #[must_use]
    pub fn schema(&self) -> ConfigSchema {
        match self {
            Self::MediaInput(_) => ConfigSchema::MediaInput,
            Self::MediaOutput(_) => ConfigSchema::MediaOutput,
            Self::BackgroundRemoval(_) => ConfigSchema::BackgroundRemoval,
            Self::ImageUpscale(_) => ConfigSchema::ImageUpscale,
            Self::ImageReframe(_) => ConfigSchema::ImageReframe,
            Self::PaletteExtraction(_) => ConfigSchema::PaletteExtraction,
            Self::ImageResize(_) => ConfigSchema::ImageResize,
            Self::FormatConversion(_) => ConfigSchema::FormatConversion,
            Self::PythonScript(_) => ConfigSchema::PythonScript,
            Self::MannequinTransfer(_) => ConfigSchema::MannequinTransfer,
            Self::Passthrough(_) => ConfigSchema::Passthrough,
        }
    }

    /// Returns the normalized config as JSON, defaults included.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    fn check_bounds(&self, plugin_id: &str) -> Result<(), ConfigValidationError> {
        match self {
            Self::MediaInput(c) => {
                check_range(plugin_id, "maxFiles", c.max_files, 1, 100)?;
                check_range(plugin_id, "maxSizePerFileMb", c.max_size_per_file_mb, 1, 500)
            }
            Self::ImageUpscale(c) => {
                check_range(plugin_id, "scale", c.scale, 1.0, 4.0)?;
                check_range(plugin_id, "maxDimension", c.max_dimension, 512, 4096)
            }
            Self::ImageReframe(c) => {
                check_dimension(plugin_id, "targetWidth", c.target_width)?;
                check_dimension(plugin_id, "targetHeight", c.target_height)
            }
            Self::PaletteExtraction(c) => check_range(plugin_id, "colors", c.colors, 3, 12),
            Self::ImageResize(c) => {
                if let Some(width) = c.width {
                    check_dimension(plugin_id, "width", width)?;
                }
                if let Some(height) = c.height {
                    check_dimension(plugin_id, "height", height)?;
                }
                check_range(plugin_id, "quality", c.quality, 1, 100)
            }
            Self::FormatConversion(c) => {
                check_range(plugin_id, "quality", c.quality, 1, 100)?;
                if parse_hex_color(&c.background).is_none() {
                    return Err(ConfigValidationError::field(
                        plugin_id,
                        "background",
                        "must be a #RRGGBB color",
                    ));
                }
                Ok(())
            }
            Self::PythonScript(c) => {
                if c.script_ref.is_empty() {
                    return Err(ConfigValidationError::field(
                        plugin_id,
                        "scriptRef",
                        "must not be empty",
                    ));
                }
                Ok(())
            }
            Self::MannequinTransfer(c) => check_range(plugin_id, "maxAttempts", c.max_attempts, 1, 20),
            Self::MediaOutput(_) | Self::BackgroundRemoval(_) | Self::Passthrough(_) => Ok(()),
        }
    }
}

/// Parses a `#RRGGBB` color.
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Config for `media-input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInputConfig {
    #[serde(default = "default_max_files", deserialize_with = "whole::deserialize")]
    pub max_files: u32,
    #[serde(default = "default_max_size_per_file_mb", deserialize_with = "whole::deserialize")]
    pub max_size_per_file_mb: u32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_max_files() -> u32 {
    10
}

fn default_max_size_per_file_mb() -> u32 {
    50
}

impl MediaInputConfig {
    /// Per-file size limit in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        u64::from(self.max_size_per_file_mb) * 1024 * 1024
    }
}

/// Config for `media-output`; carries only forward-compatible extras.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaOutputConfig {
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Background-removal provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalProvider {
    /// Try the dedicated matting model, fall back to the generative model.
    #[default]
    Auto,
    Fal,
    Gemini,
}

impl RemovalProvider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Fal => "fal",
            Self::Gemini => "gemini",
        }
    }
}

/// Config for `background-removal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRemovalConfig {
    #[serde(default)]
    pub provider: RemovalProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Config for `image-upscale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpscaleConfig {
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_max_dimension", deserialize_with = "whole::deserialize")]
    pub max_dimension: u32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_scale() -> f64 {
    2.0
}

fn default_max_dimension() -> u32 {
    2048
}

/// How `image-reframe` fills the target frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReframeStrategy {
    #[default]
    Cover,
    Contain,
    /// Crop around the most salient region.
    Attention,
}

impl ReframeStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Contain => "contain",
            Self::Attention => "attention",
        }
    }
}

/// Config for `image-reframe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReframeConfig {
    #[serde(default = "default_frame_edge", deserialize_with = "whole::deserialize")]
    pub target_width: u32,
    #[serde(default = "default_frame_edge", deserialize_with = "whole::deserialize")]
    pub target_height: u32,
    #[serde(default)]
    pub strategy: ReframeStrategy,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_frame_edge() -> u32 {
    1080
}

/// Config for `palette-extraction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteExtractionConfig {
    #[serde(default = "default_colors", deserialize_with = "whole::deserialize")]
    pub colors: u32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_colors() -> u32 {
    6
}

/// How `image-resize` fits the source into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Fit inside the box, pad the remainder.
    #[default]
    Contain,
    /// Fill the box, crop the overflow.
    Cover,
    /// Ignore the aspect ratio.
    Stretch,
    /// Like contain without padding, never enlarging.
    ScaleDown,
}

/// Encoded image formats the built-in codecs write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Parses a normalized format name; `jpg` maps to jpeg.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// The format's file extension and wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Output format for `image-resize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeOutputFormat {
    /// Keep the input file's format.
    #[default]
    Original,
    Png,
    Jpeg,
    Webp,
}

impl ResizeOutputFormat {
    /// Returns the explicit format, or `None` for `original`.
    #[must_use]
    pub fn explicit(&self) -> Option<ImageFormat> {
        match self {
            Self::Original => None,
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Webp => Some(ImageFormat::Webp),
        }
    }
}

/// Config for `image-resize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResizeConfig {
    #[serde(
        default,
        deserialize_with = "whole::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub width: Option<u32>,
    #[serde(
        default,
        deserialize_with = "whole::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub height: Option<u32>,
    #[serde(default)]
    pub fit_mode: FitMode,
    #[serde(default)]
    pub output_format: ResizeOutputFormat,
    #[serde(default = "default_quality", deserialize_with = "whole::deserialize")]
    pub quality: u8,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_quality() -> u8 {
    90
}

/// Config for `format-conversion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConversionConfig {
    #[serde(default = "default_target_format")]
    pub target_format: ImageFormat,
    #[serde(default = "default_quality", deserialize_with = "whole::deserialize")]
    pub quality: u8,
    /// Flatten color for formats without alpha.
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_target_format() -> ImageFormat {
    ImageFormat::Png
}

fn default_background() -> String {
    "#ffffff".to_string()
}

impl FormatConversionConfig {
    /// The background as RGB; white if unparseable.
    #[must_use]
    pub fn background_rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.background).unwrap_or([255, 255, 255])
    }
}

/// Config for `python-script`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonScriptConfig {
    pub script_ref: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Config for `mannequin-transfer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MannequinTransferConfig {
    #[serde(default = "default_max_attempts", deserialize_with = "whole::deserialize")]
    pub max_attempts: u32,
    /// Replaces the built-in base prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_max_attempts() -> u32 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(schema: ConfigSchema, raw: JsonValue) -> Result<PluginConfig, ConfigValidationError> {
        schema.parse("test-plugin", &raw)
    }

    #[test]
    fn resize_fills_defaults() {
        let config = parse(ConfigSchema::ImageResize, json!({"width": 100})).unwrap();
        let PluginConfig::ImageResize(resize) = config else {
            panic!("expected resize config");
        };
        assert_eq!(resize.width, Some(100));
        assert_eq!(resize.height, None);
        assert_eq!(resize.fit_mode, FitMode::Contain);
        assert_eq!(resize.output_format, ResizeOutputFormat::Original);
        assert_eq!(resize.quality, 90);
    }

    #[test]
    fn resize_rejects_negative_and_zero_width() {
        assert!(parse(ConfigSchema::ImageResize, json!({"width": -5})).is_err());
        let err = parse(ConfigSchema::ImageResize, json!({"width": 0})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("width"));
    }

    #[test]
    fn resize_rejects_unknown_fit_mode() {
        assert!(parse(ConfigSchema::ImageResize, json!({"fitMode": "squash"})).is_err());
        let ok = parse(ConfigSchema::ImageResize, json!({"fitMode": "scale-down"})).unwrap();
        assert_eq!(ok.to_json()["fitMode"], "scale-down");
    }

    #[test]
    fn whole_floats_are_integers() {
        let PluginConfig::ImageResize(resize) =
            parse(ConfigSchema::ImageResize, json!({"width": 100.0, "quality": 80.0})).unwrap()
        else {
            panic!("expected resize config");
        };
        assert_eq!(resize.width, Some(100));
        assert_eq!(resize.quality, 80);

        let PluginConfig::FormatConversion(conversion) =
            parse(ConfigSchema::FormatConversion, json!({"quality": 75.0})).unwrap()
        else {
            panic!("expected format conversion config");
        };
        assert_eq!(conversion.quality, 75);

        assert!(parse(ConfigSchema::ImageResize, json!({"width": 100.5})).is_err());
        assert!(parse(ConfigSchema::ImageResize, json!({"quality": 300})).is_err());
    }

    #[test]
    fn dimensions_are_capped() {
        let err = parse(ConfigSchema::ImageResize, json!({"width": 4_294_967_295u32})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("width"));
        assert!(parse(ConfigSchema::ImageResize, json!({"height": MAX_DIMENSION})).is_ok());

        let err = parse(ConfigSchema::ImageReframe, json!({"targetHeight": MAX_DIMENSION + 1})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("targetHeight"));
    }

    #[test]
    fn upscale_bounds() {
        let err = parse(ConfigSchema::ImageUpscale, json!({"scale": 5})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("scale"));
        assert!(parse(ConfigSchema::ImageUpscale, json!({"scale": 4})).is_ok());
        assert!(parse(ConfigSchema::ImageUpscale, json!({"maxDimension": 100})).is_err());

        let PluginConfig::ImageUpscale(defaults) = parse(ConfigSchema::ImageUpscale, json!({})).unwrap()
        else {
            panic!("expected upscale config");
        };
        assert_eq!(defaults.scale, 2.0);
        assert_eq!(defaults.max_dimension, 2048);
    }

    #[test]
    fn media_input_defaults_and_bounds() {
        let PluginConfig::MediaInput(config) = parse(ConfigSchema::MediaInput, json!(null)).unwrap()
        else {
            panic!("expected media input config");
        };
        assert_eq!(config.max_files, 10);
        assert_eq!(config.max_bytes(), 50 * 1024 * 1024);
        assert!(parse(ConfigSchema::MediaInput, json!({"maxFiles": 101})).is_err());
        assert!(parse(ConfigSchema::MediaInput, json!({"maxSizePerFileMb": 0})).is_err());
    }

    #[test]
    fn format_conversion_validates_background() {
        assert!(parse(ConfigSchema::FormatConversion, json!({"background": "white"})).is_err());
        let PluginConfig::FormatConversion(config) =
            parse(ConfigSchema::FormatConversion, json!({"targetFormat": "jpeg", "background": "#0A0b0C"}))
                .unwrap()
        else {
            panic!("expected format conversion config");
        };
        assert_eq!(config.target_format, ImageFormat::Jpeg);
        assert_eq!(config.background_rgb(), [10, 11, 12]);
    }

    #[test]
    fn python_script_requires_script_ref() {
        assert!(parse(ConfigSchema::PythonScript, json!({})).is_err());
        assert!(parse(ConfigSchema::PythonScript, json!({"scriptRef": ""})).is_err());
        let PluginConfig::PythonScript(config) =
            parse(ConfigSchema::PythonScript, json!({"scriptRef": "scripts/py/clean_processor.py"}))
                .unwrap()
        else {
            panic!("expected python config");
        };
        assert!(config.args.is_empty());
        assert!(config.env.is_empty());
    }

    #[test]
    fn extra_fields_pass_through() {
        let config = parse(
            ConfigSchema::PaletteExtraction,
            json!({"colors": 4, "swatchShape": "circle"}),
        )
        .unwrap();
        let json = config.to_json();
        assert_eq!(json["colors"], 4);
        assert_eq!(json["swatchShape"], "circle");
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = parse(ConfigSchema::PaletteExtraction, json!({"colors": "six"})).unwrap_err();
        assert!(err.field.is_none());
        assert!(err.to_string().contains("test-plugin"));
    }

    #[test]
    fn passthrough_keeps_everything() {
        let config = parse(ConfigSchema::Passthrough, json!({"anything": [1, 2]})).unwrap();
        assert_eq!(config.schema(), ConfigSchema::Passthrough);
        assert_eq!(config.to_json(), json!({"anything": [1, 2]}));
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!(parse_hex_color("#ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#fffff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
    }
}
