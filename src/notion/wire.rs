//! Serde shapes of the Notion API responses we consume.
//!
//! Only the fields the page needs are modelled; everything else in the
//! payloads is ignored. Block and property types we don't render fall into
//! the `Unsupported` / `Other` catch-all variants.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RichTextRun {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub rich_text: Vec<RichTextRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeBody {
    pub rich_text: Vec<RichTextRun>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    External { external: FileRef },
    File { file: FileRef },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageBody {
    #[serde(flatten)]
    pub source: ImageSource,
    #[serde(default)]
    pub caption: Vec<RichTextRun>,
}

/// One child block. The `type` field selects the variant and names the key
/// holding its payload (`{"type": "code", "code": {...}}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum BlockObject {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: TextBody },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: TextBody },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: TextBody },
    #[serde(rename = "image")]
    Image { image: ImageBody },
    #[serde(rename = "code")]
    Code { code: CodeBody },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title { title: Vec<RichTextRun> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageObject {
    pub created_time: String,
    pub properties: HashMap<String, PropertyValue>,
}

/// Paginated list envelope. Results stay raw so a single bad block can be
/// reported by position.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockList {
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}
