use crate::notion::wire::RichTextRun;

/// One run of text with uniform formatting and an optional link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextSegment {
    pub text: String,
    pub href: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

/// Map Notion runs to segments, one for one. Adjacent runs are never merged
/// and text is left unescaped.
pub fn to_segments(runs: &[RichTextRun]) -> Vec<RichTextSegment> {
    runs.iter()
        .map(|run| RichTextSegment {
            text: run.plain_text.clone(),
            href: run.href.clone(),
            bold: run.annotations.bold,
            italic: run.annotations.italic,
            strikethrough: run.annotations.strikethrough,
            underline: run.annotations.underline,
            code: run.annotations.code,
        })
        .collect()
}

/// Concatenated plain text of all runs (captions, code bodies, titles).
pub fn plain_text(runs: &[RichTextRun]) -> String {
    runs.iter().map(|run| run.plain_text.as_str()).collect()
}
