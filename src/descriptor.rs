//! Typed model of a fetched shader descriptor.
//!
//! Mirrors the platform's JSON wire shape (`{ info, ver, renderpass: [...] }`)
//! directly via serde. A descriptor is immutable once fetched and is replaced
//! wholesale on reload; only derived rewritten sources and bindings persist.

use std::collections::HashMap;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Deserializer};

use crate::error::LoadError;

/// Channels (and buffer targets) per pass. Indices are 0–3.
pub const CHANNEL_COUNT: usize = 4;

#[derive(Debug, Deserialize, Clone)]
pub struct ShaderDescriptor {
    #[serde(default)]
    pub info: ShaderInfo,
    #[serde(rename = "ver", default)]
    pub version: String,
    #[serde(rename = "renderpass")]
    pub passes: Vec<RenderPass>,
}

impl ShaderDescriptor {
    /// Deserialization failures belong to the fetch stage of the taxonomy:
    /// the descriptor never existed as a structured record.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, LoadError> {
        serde_json::from_value(value)
            .context("shader descriptor does not match the expected wire shape")
            .map_err(LoadError::Fetch)
    }

    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .context("shader descriptor is not valid JSON")
            .map_err(LoadError::Fetch)?;
        Self::from_api_response(value)
    }

    /// The platform's API nests the descriptor under a top-level `Shader`
    /// key; bare descriptors are accepted as-is.
    pub fn from_api_response(value: serde_json::Value) -> Result<Self, LoadError> {
        let inner = match value {
            serde_json::Value::Object(mut map) if map.contains_key("Shader") => map
                .remove("Shader")
                .ok_or_else(|| LoadError::Fetch(anyhow!("empty Shader envelope")))?,
            other => other,
        };
        Self::from_json_value(inner)
    }
}

/// Free-form metadata. Common fields are surfaced; anything else the
/// platform sends rides along in `extra`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShaderInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderPass {
    #[serde(rename = "type")]
    pub role: PassRole,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "code")]
    pub source: String,
    #[serde(default)]
    pub inputs: Vec<InputChannel>,
}

/// Pass roles this pipeline renders. The platform also ships roles we do not
/// handle (e.g. sound); those deserialize to `Other` and are skipped with a
/// diagnostic rather than failing the whole descriptor.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PassRole {
    Image,
    Buffer,
    Common,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputChannel {
    #[serde(rename = "channel")]
    pub index: u32,
    #[serde(default)]
    pub ctype: String,
    #[serde(rename = "src", default)]
    pub source: String,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

impl InputChannel {
    /// Unrecognized content types behave as flat 2D textures.
    pub fn content_type(&self) -> ContentType {
        ContentType::from_ctype(&self.ctype).unwrap_or(ContentType::Texture2D)
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct SamplerConfig {
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub internal: String,
    #[serde(default, deserialize_with = "bool_from_literal")]
    pub srgb: bool,
    #[serde(default, deserialize_with = "bool_from_literal")]
    pub vflip: bool,
    #[serde(default)]
    pub wrap: String,
}

/// The platform transmits booleans as the literal strings `"true"`/`"false"`.
/// Anything other than `"true"` is false; generic truthiness is not applied.
fn bool_from_literal<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s == "true")
}

/// Closed enumeration of channel content types, with a total mapping to the
/// binding form (cube vs 2D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Texture2D,
    Cubemap,
    Buffer,
    Video,
    Audio,
    Keyboard,
    Webcam,
}

impl ContentType {
    /// `None` for ctype strings the platform may add in the future; callers
    /// default those to [`ContentType::Texture2D`] and record a diagnostic.
    pub fn from_ctype(ctype: &str) -> Option<ContentType> {
        Some(match ctype {
            "texture" | "2d" => ContentType::Texture2D,
            "cubemap" => ContentType::Cubemap,
            "buffer" => ContentType::Buffer,
            "video" => ContentType::Video,
            "music" | "musicstream" | "mic" => ContentType::Audio,
            "keyboard" => ContentType::Keyboard,
            "webcam" => ContentType::Webcam,
            _ => return None,
        })
    }

    /// Cubemaps bind through the cube selector; every other content type
    /// (including future unknowns) uses the 2D form.
    pub fn uses_cubemap_binding(self) -> bool {
        matches!(self, ContentType::Cubemap)
    }

    /// Gates the consumer's audio-decoding stage.
    pub fn is_audio_reactive(self) -> bool {
        matches!(self, ContentType::Audio)
    }
}
