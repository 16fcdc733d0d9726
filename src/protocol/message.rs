use crate::{
    codec::command::DecodedResult,
    foundation::error::{TextRenderError, TextRenderResult},
    model::text_data::TextData,
};

/// Wire names of every envelope type this protocol understands.
pub const KNOWN_TYPES: [&str; 9] = [
    "textData",
    "ok",
    "err",
    "preload",
    "loadedFont",
    "requestCache",
    "fontCache",
    "loaded",
    "loadErr",
];

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
/// Message exchanged between the dispatcher and the worker.
///
/// On the wire this is `{"type": ..., "content": {...}}`. Types this crate does
/// not know decode to [`Envelope::Unrecognized`] so handlers can log and drop
/// them without breaking the channel.
pub enum Envelope {
    /// Controller -> worker: run a layout job.
    TextData(JobContent),
    /// Worker -> controller: a job's decoded output.
    #[serde(rename = "ok")]
    RenderOk(RenderOk),
    /// Worker -> controller: a job failed.
    #[serde(rename = "err")]
    RenderErr(RenderErr),
    /// Controller -> worker: load a font ahead of any job.
    Preload(FontFamily),
    /// Worker -> controller: a preload finished.
    LoadedFont(LoadedFont),
    /// Worker -> controller: send me the bytes for this family.
    RequestCache(FontFamily),
    /// Controller -> worker: answer to `requestCache`.
    FontCache(FontCache),
    /// Worker -> controller: initialization finished, jobs are accepted.
    Loaded,
    /// Worker -> controller: initialization failed. Terminal.
    LoadErr(LoadErr),
    /// Any type outside [`KNOWN_TYPES`]. Never sent, only produced by [`Envelope::from_json`].
    #[serde(skip)]
    Unrecognized {
        /// The `type` field as received.
        kind: String,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContent {
    pub job_id: u64,
    pub text_data: TextData,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOk {
    pub job_id: u64,
    #[serde(flatten)]
    pub result: DecodedResult,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderErr {
    pub job_id: u64,
    /// Stringified cause.
    pub message: String,
    /// The job as received, serialized, for replay and diagnosis.
    pub text_data: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFamily {
    pub font_family: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedFont {
    pub font_family: String,
    /// Set when the preload failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Resolver answer for one family: either the serialized font or why it is missing.
pub struct FontCache {
    pub font_family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FontCache {
    pub fn fulfilled(font_family: impl Into<String>, cache: Vec<u8>) -> Self {
        Self {
            font_family: font_family.into(),
            cache: Some(cache),
            error: None,
        }
    }

    pub fn failed(font_family: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            cache: None,
            error: Some(error.into()),
        }
    }

    /// The payload, or the reason there is none.
    pub fn into_result(self) -> Result<Vec<u8>, String> {
        match (self.cache, self.error) {
            (Some(cache), None) => Ok(cache),
            (_, Some(error)) => Err(error),
            (None, None) => Err(format!(
                "font cache for {:?} carried neither bytes nor error",
                self.font_family
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadErr {
    pub message: String,
}

impl Envelope {
    /// Wire name of this envelope's type.
    pub fn kind(&self) -> &str {
        match self {
            Self::TextData(_) => "textData",
            Self::RenderOk(_) => "ok",
            Self::RenderErr(_) => "err",
            Self::Preload(_) => "preload",
            Self::LoadedFont(_) => "loadedFont",
            Self::RequestCache(_) => "requestCache",
            Self::FontCache(_) => "fontCache",
            Self::Loaded => "loaded",
            Self::LoadErr(_) => "loadErr",
            Self::Unrecognized { kind } => kind.as_str(),
        }
    }

    /// Decode a wire message.
    ///
    /// Unknown `type`s yield [`Envelope::Unrecognized`]; a known type whose
    /// `content` does not match its schema is a serialization error.
    pub fn from_json(s: &str) -> TextRenderResult<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| TextRenderError::serde("envelope has no string `type` field"))?;
        if !KNOWN_TYPES.contains(&kind) {
            return Ok(Self::Unrecognized {
                kind: kind.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> TextRenderResult<String> {
        if let Self::Unrecognized { kind } = self {
            return Err(TextRenderError::serde(format!(
                "refusing to send unrecognized envelope type {kind:?}"
            )));
        }
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/message.rs"]
mod tests;
