pub mod components;
pub mod highlight;

use chrono::DateTime;

use crate::page::blocks::Block;
use crate::page::rich_text::RichTextSegment;
use crate::page::Page;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline rendering of a segment list. Formatting nests innermost to
/// outermost as code, underline, strikethrough, italic, bold, then link.
pub fn render_segments(segments: &[RichTextSegment]) -> String {
    segments.iter().map(render_segment).collect()
}

fn render_segment(segment: &RichTextSegment) -> String {
    let mut html = escape_html(&segment.text);
    if segment.code {
        html = format!("<code>{}</code>", html);
    }
    if segment.underline {
        html = format!("<u>{}</u>", html);
    }
    if segment.strikethrough {
        html = format!("<s>{}</s>", html);
    }
    if segment.italic {
        html = format!("<em>{}</em>", html);
    }
    if segment.bold {
        html = format!("<strong>{}</strong>", html);
    }
    if let Some(href) = &segment.href {
        html = format!(
            "<a href=\"{}\" rel=\"noreferrer\" target=\"_blank\">{}</a>",
            escape_html(href),
            html
        );
    }
    html
}

pub fn render_block(block: &Block) -> String {
    match block {
        Block::Heading2 { segments } => {
            format!("<h2 class=\"heading-2\">{}</h2>", render_segments(segments))
        }
        Block::Heading3 { segments } => {
            format!("<h3 class=\"heading-3\">{}</h3>", render_segments(segments))
        }
        Block::Paragraph { segments } => {
            format!("<p class=\"paragraph\">{}</p>", render_segments(segments))
        }
        // Image hosts vary (Notion's S3 bucket, arbitrary external links), so plain <img>.
        Block::Image { url, alt } => format!(
            "<img class=\"image\" alt=\"{}\" src=\"{}\" loading=\"lazy\">",
            escape_html(alt),
            escape_html(url)
        ),
        Block::Code { code, language } => render_code(code, language),
    }
}

fn render_code(code: &str, language: &str) -> String {
    if let Some(elements) = components::render_components(code) {
        return format!(
            "<div class=\"components\">{}</div>",
            elements.concat()
        );
    }

    format!(
        "<pre class=\"code-block\"><code aria-label=\"{}\">{}</code></pre>",
        escape_html(language),
        highlight::highlight(code, language)
    )
}

/// `2025-03-14T09:26:00.000Z` -> `March 14, 2025`. Unparseable input is
/// returned as is.
pub fn format_created(created_time: &str) -> String {
    DateTime::parse_from_rfc3339(created_time)
        .map(|dt| dt.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| created_time.to_string())
}

/// Full HTML document for the page, including the cache refresh form.
pub fn render_page(page: &Page) -> String {
    let title = escape_html(&page.title);
    let mut body = String::new();

    if !page.title.is_empty() {
        body.push_str(&format!("<h1 class=\"title\">{}</h1>\n", title));
    }
    if !page.created_time.is_empty() {
        body.push_str(&format!(
            "<time class=\"created\" datetime=\"{}\">{}</time>\n",
            escape_html(&page.created_time),
            escape_html(&format_created(&page.created_time))
        ));
    }
    for block in &page.blocks {
        body.push_str(&render_block(block));
        body.push('\n');
    }
    body.push_str(
        "<form class=\"revalidate\" method=\"post\" action=\"/revalidate\">\
         <button type=\"submit\" class=\"button\">Refresh Notion content cache</button>\
         </form>\n",
    );

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        title, body
    )
}
