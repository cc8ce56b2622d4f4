//! Small lexer-based syntax highlighter.
//!
//! Tokens become `<span class="sh__token--{kind}">` with a CSS variable for
//! the colour, and every source line is wrapped in `<span class="sh__line">`.
//! The lexer is language-agnostic apart from `#` line comments, which are
//! only recognised for languages that use them.

use super::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    String,
    Class,
    Property,
    Sign,
    Comment,
    Number,
    Space,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::String => "string",
            TokenKind::Class => "class",
            TokenKind::Property => "property",
            TokenKind::Sign => "sign",
            TokenKind::Comment => "comment",
            TokenKind::Number => "number",
            TokenKind::Space => "space",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

const KEYWORDS: &[&str] = &[
    // JavaScript / TypeScript
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "from",
    "function", "if", "implements", "import", "in", "instanceof", "interface", "let", "new",
    "null", "of", "private", "protected", "public", "readonly", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "type", "typeof", "undefined", "var", "void",
    "while", "with", "yield",
    // Rust
    "crate", "dyn", "extern", "fn", "impl", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "self", "Self", "struct", "trait", "unsafe", "use", "where",
    // Python
    "and", "def", "elif", "False", "is", "lambda", "None", "not", "or", "pass", "True",
];

const HASH_COMMENT_LANGUAGES: &[&str] = &[
    "python", "shell", "bash", "ruby", "yaml", "toml", "r", "perl", "makefile", "docker",
];

/// Highlight `code` into HTML. Output is already escaped.
pub fn highlight(code: &str, language: &str) -> String {
    let hash_comments = HASH_COMMENT_LANGUAGES.contains(&language.to_ascii_lowercase().as_str());
    let tokens = tokenize(code, hash_comments);

    let mut lines: Vec<String> = vec![String::new()];
    for token in tokens {
        for (i, piece) in token.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            if piece.is_empty() {
                continue;
            }
            if let Some(line) = lines.last_mut() {
                push_token(line, token.kind, piece);
            }
        }
    }

    lines
        .iter()
        .map(|line| format!("<span class=\"sh__line\">{}</span>", line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_token(out: &mut String, kind: TokenKind, text: &str) {
    if kind == TokenKind::Space {
        out.push_str(&escape_html(text));
        return;
    }
    let name = kind.as_str();
    out.push_str(&format!(
        "<span class=\"sh__token--{}\" style=\"color: var(--sh-{})\">{}</span>",
        name,
        name,
        escape_html(text)
    ));
}

/// Split source into tokens. Concatenating the token texts yields `code`.
pub fn tokenize(code: &str, hash_comments: bool) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut pos = 0;

    while let Some(c) = code[pos..].chars().next() {
        let rest = &code[pos..];

        let (kind, len) = if rest.starts_with("//") || (hash_comments && c == '#') {
            (TokenKind::Comment, rest.find('\n').unwrap_or(rest.len()))
        } else if rest.starts_with("/*") {
            let len = rest[2..].find("*/").map(|end| end + 4).unwrap_or(rest.len());
            (TokenKind::Comment, len)
        } else if c == '"' || c == '`' || c == '\'' {
            match string_len(rest, c) {
                Some(len) => (TokenKind::String, len),
                None => (TokenKind::Sign, c.len_utf8()),
            }
        } else if c.is_whitespace() {
            (TokenKind::Space, span_len(rest, char::is_whitespace))
        } else if c.is_ascii_digit() {
            (TokenKind::Number, span_len(rest, |ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
        } else if is_ident_char(c) {
            let len = span_len(rest, is_ident_char);
            (classify_word(&rest[..len], last_meaningful(&tokens)), len)
        } else {
            (TokenKind::Sign, c.len_utf8())
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
        });
        pos += len;
    }

    tokens
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn span_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|&(_, ch)| !pred(ch))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Length of a quoted string starting at `s[0] == quote`, including both
/// quotes. Single and double quotes must close on the same line; backticks
/// may span lines.
fn string_len(s: &str, quote: char) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '\n' if quote != '`' => return None,
            ch if ch == quote => return Some(i + ch.len_utf8()),
            _ => {}
        }
    }
    None
}

fn last_meaningful<'a>(tokens: &[Token<'a>]) -> Option<Token<'a>> {
    tokens.iter().rev().find(|t| t.kind != TokenKind::Space).copied()
}

fn classify_word(word: &str, previous: Option<Token<'_>>) -> TokenKind {
    if matches!(previous, Some(Token { kind: TokenKind::Sign, text: "." })) {
        return TokenKind::Property;
    }
    if KEYWORDS.contains(&word) {
        return TokenKind::Keyword;
    }
    if word.chars().next().is_some_and(|c| c.is_uppercase()) {
        return TokenKind::Class;
    }
    TokenKind::Identifier
}
