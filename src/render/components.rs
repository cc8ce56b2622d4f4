//! Inline components embedded in code blocks.
//!
//! A code block whose first line is `// component` holds one tag per line,
//! either `<Name>text</Name>` or `<Name />`. Tags resolve through a fixed
//! table; anything else makes the whole block fall back to highlighted code.

use std::sync::LazyLock;

use regex::Regex;

use super::escape_html;

pub const COMPONENT_MARKER: &str = "// component";

static PAIRED_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([A-Z]\w*)>(.*)</([A-Z]\w*)>$").unwrap());
static SELF_CLOSING_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([A-Z]\w*)\s*/>$").unwrap());

type Constructor = fn(Option<&str>) -> String;

const COMPONENTS: &[(&str, Constructor)] = &[("Button", button)];

fn button(children: Option<&str>) -> String {
    format!(
        "<button type=\"button\" class=\"button\">{}</button>",
        escape_html(children.unwrap_or(""))
    )
}

fn lookup(name: &str) -> Option<Constructor> {
    COMPONENTS
        .iter()
        .find(|(tag, _)| *tag == name)
        .map(|(_, ctor)| *ctor)
}

/// Render the component markup in `code`, or `None` when the block is not a
/// component block or any line fails to resolve.
pub fn render_components(code: &str) -> Option<Vec<String>> {
    let trimmed = code.trim();
    let mut lines = trimmed.lines();
    // The marker must be the whole first line; `// component <Button />` stays code.
    if lines.next()?.trim() != COMPONENT_MARKER {
        return None;
    }

    let markup: Vec<&str> = lines.map(str::trim).filter(|l| !l.is_empty()).collect();
    if markup.is_empty() {
        return None;
    }

    markup.into_iter().map(render_line).collect()
}

fn render_line(line: &str) -> Option<String> {
    if let Some(caps) = PAIRED_TAG_RE.captures(line) {
        if caps[1] != caps[3] {
            return None;
        }
        let ctor = lookup(&caps[1])?;
        return Some(ctor(Some(&caps[2])));
    }

    let caps = SELF_CLOSING_TAG_RE.captures(line)?;
    let ctor = lookup(&caps[1])?;
    Some(ctor(None))
}
