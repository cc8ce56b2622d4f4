pub mod blocks;
pub mod rich_text;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::notion::wire::{PageObject, PropertyValue};
use crate::notion::NotionSource;
use blocks::Block;

/// Everything the blog page shows, rebuilt from scratch on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub title: String,
    pub created_time: String,
    pub blocks: Vec<Block>,
}

impl Page {
    /// Stable fallback when Notion answers with something we can't read.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("page metadata has an unrecognized shape: {0}")]
    Metadata(#[source] serde_json::Error),
    #[error("page has no title property")]
    MissingTitle,
    #[error("block {index} has an unrecognized shape: {source}")]
    Block {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetch metadata and child blocks concurrently and assemble the page.
///
/// Transport failures propagate. A response we can't interpret degrades to
/// [`Page::empty`] so the page still renders.
pub async fn fetch_page(source: &dyn NotionSource, page_id: &str) -> Result<Page> {
    let (meta, children) = tokio::try_join!(
        source.retrieve_page(page_id),
        source.list_block_children(page_id),
    )?;

    match assemble(meta, &children) {
        Ok(page) => {
            info!("Fetched page {:?} with {} blocks", page.title, page.blocks.len());
            Ok(page)
        }
        Err(e) => {
            warn!("Falling back to empty page for {}: {}", page_id, e);
            Ok(Page::empty())
        }
    }
}

/// Build a page from the raw `pages.retrieve` and `blocks.children.list` results.
pub fn assemble(meta: serde_json::Value, children: &[serde_json::Value]) -> Result<Page, ShapeError> {
    let meta: PageObject = serde_json::from_value(meta).map_err(ShapeError::Metadata)?;

    let title = match meta.properties.get("title") {
        Some(PropertyValue::Title { title }) => rich_text::plain_text(title),
        _ => return Err(ShapeError::MissingTitle),
    };

    let blocks = blocks::map_blocks(children)?;

    Ok(Page {
        title,
        created_time: meta.created_time,
        blocks,
    })
}
