use super::rich_text::{plain_text, to_segments, RichTextSegment};
use super::ShapeError;
use crate::notion::wire::{BlockObject, ImageSource, RichTextRun};

/// Renderable page content. Closed: anything else Notion sends is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading2 { segments: Vec<RichTextSegment> },
    Heading3 { segments: Vec<RichTextSegment> },
    Paragraph { segments: Vec<RichTextSegment> },
    Image { url: String, alt: String },
    Code { code: String, language: String },
}

/// Map raw child blocks in order. The first malformed block aborts the whole
/// mapping; well-formed blocks of unsupported types are skipped.
pub fn map_blocks(raw: &[serde_json::Value]) -> Result<Vec<Block>, ShapeError> {
    let mut blocks = Vec::with_capacity(raw.len());

    for (index, value) in raw.iter().enumerate() {
        let object: BlockObject = serde_json::from_value(value.clone())
            .map_err(|source| ShapeError::Block { index, source })?;

        if let Some(block) = map_block(object) {
            blocks.push(block);
        }
    }

    Ok(blocks)
}

fn map_block(object: BlockObject) -> Option<Block> {
    match object {
        BlockObject::Paragraph { paragraph } => {
            non_empty(&paragraph.rich_text).map(|segments| Block::Paragraph { segments })
        }
        // Notion's heading_1 sits under the page title, so it renders one tier down.
        BlockObject::Heading1 { heading_1 } => {
            non_empty(&heading_1.rich_text).map(|segments| Block::Heading2 { segments })
        }
        BlockObject::Heading2 { heading_2 } => {
            non_empty(&heading_2.rich_text).map(|segments| Block::Heading3 { segments })
        }
        BlockObject::Image { image } => {
            let url = match image.source {
                ImageSource::External { external } => external.url,
                ImageSource::File { file } => file.url,
                ImageSource::Unsupported => return None,
            };
            Some(Block::Image {
                url,
                alt: plain_text(&image.caption),
            })
        }
        BlockObject::Code { code } => {
            let text = plain_text(&code.rich_text);
            if text.is_empty() {
                return None;
            }
            Some(Block::Code {
                code: text,
                language: code.language,
            })
        }
        BlockObject::Unsupported => None,
    }
}

fn non_empty(runs: &[RichTextRun]) -> Option<Vec<RichTextSegment>> {
    if runs.is_empty() {
        None
    } else {
        Some(to_segments(runs))
    }
}
