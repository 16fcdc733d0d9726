use std::collections::HashSet;

use crate::foundation::error::{TextRenderError, TextRenderResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One text-layout job: a paragraph laid out inside a `width` x `height` frame.
pub struct TextData {
    pub width: f32,
    pub height: f32,
    pub paragraph: Paragraph,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub text_align: TextAlign,
    pub resizing: Resizing,
    pub align: VerticalAlign,
    pub paragraph_spacing: f32,
    #[serde(default)]
    pub writing_mode: WritingMode,
    /// Paragraph-wide shadow. Always cleared before the engine sees the job.
    #[serde(default)]
    pub shadow: Option<Shadow>,
    /// Caller-supplied decoration layers. Kept opaque and cleared before dispatch.
    #[serde(default)]
    pub advanced_data: AdvancedData,
    pub contents: Vec<Content>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resizing {
    GrowHorizontally,
    #[default]
    GrowVertically,
    Fixed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shadow {
    pub blur: f32,
    pub offset: [f32; 2],
    pub color: String,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdvancedData {
    #[serde(default)]
    pub repeat: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// A run of blocks sharing line metrics.
pub struct Content {
    pub line_height: f32,
    pub paragraph_indentation: f32,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Uniformly styled text span.
pub struct Block {
    pub text: String,
    /// Key the font resolver understands; must be loaded before the job runs.
    pub font_family: String,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub fill: String,
    pub italic: bool,
    pub stroke: String,
    pub stroke_width: f32,
    #[serde(default)]
    pub decoration: Decoration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decoration {
    #[default]
    #[serde(rename = "")]
    None,
    Underline,
    Overline,
    LineThrough,
}

impl TextData {
    pub fn from_json_str(s: &str) -> TextRenderResult<Self> {
        let data: Self = serde_json::from_str(s)?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> TextRenderResult<()> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(TextRenderError::validation(
                "text data width/height must be finite",
            ));
        }
        if !self.paragraph.paragraph_spacing.is_finite() {
            return Err(TextRenderError::validation(
                "paragraphSpacing must be finite",
            ));
        }
        for (ci, content) in self.paragraph.contents.iter().enumerate() {
            for (bi, block) in content.blocks.iter().enumerate() {
                if block.font_family.is_empty() {
                    return Err(TextRenderError::validation(format!(
                        "contents[{ci}].blocks[{bi}].fontFamily must be non-empty"
                    )));
                }
                if !block.font_size.is_finite() || block.font_size < 0.0 {
                    return Err(TextRenderError::validation(format!(
                        "contents[{ci}].blocks[{bi}].fontSize must be finite and >= 0"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.paragraph.contents.iter().flat_map(|c| c.blocks.iter())
    }

    /// Distinct font families referenced by any block, in first-seen order.
    pub fn font_families(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.blocks()
            .filter(|b| seen.insert(b.font_family.as_str()))
            .map(|b| b.font_family.clone())
            .collect()
    }

    /// Copy with the fields the engine must never see from callers reset to safe defaults.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.paragraph.advanced_data = AdvancedData::default();
        out.paragraph.shadow = None;
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/text_data.rs"]
mod tests;
