//! Restricted markdown rendering for chat messages.
//!
//! Agent answers arrive as untrusted formatted text. This module converts
//! them into a whitelisted block/inline tree and renders that tree to
//! ratatui lines. Supported constructs: paragraphs, unordered and ordered
//! lists, inline code, fenced code blocks, emphasis/strong, block quotes,
//! and hyperlinks. Anything else (embedded HTML, script tags, unknown
//! syntax) falls through as inert literal text.
//!
//! Hyperlinks are display-only: the label is styled and the target URL is
//! shown as dim text next to it. The client never opens, follows, or
//! executes a link target, and non-http(s) schemes are not even recognized
//! as links. Control characters (including escape sequences, the terminal
//! equivalent of script injection) are stripped before parsing.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use std::sync::OnceLock;

/// One inline run within a rendered line
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(String),
    Strong(String),
    /// Display-only hyperlink: rendered, never followed
    Link { label: String, href: String },
}

/// One whitelisted block. Paragraph, quote, and list-item content keeps its
/// source line breaks exactly (one source line per rendered line).
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Vec<Inline>>),
    List {
        ordered: bool,
        items: Vec<Vec<Inline>>,
    },
    CodeBlock(Vec<String>),
    Quote(Vec<Vec<Inline>>),
}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    // Label then target; target must be http(s) to count as a link at all
    LINK.get_or_init(|| Regex::new(r"^\[([^\]]+)\]\((https?://[^)\s]+)\)").unwrap())
}

fn ordered_item_regex() -> &'static Regex {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    ITEM.get_or_init(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").unwrap())
}

fn unordered_item_regex() -> &'static Regex {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    ITEM.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(.*)$").unwrap())
}

/// Strip control characters from untrusted text before parsing.
///
/// Removing ESC and the other C0 controls defuses terminal escape
/// sequences: the sequence body is left behind as plain visible text.
/// Carriage returns vanish, tabs become spaces, newlines survive.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            '\r' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Parse sanitized text into whitelisted blocks
pub fn parse(raw: &str) -> Vec<Block> {
    let text = sanitize(raw);
    let lines: Vec<&str> = text.lines().collect();

    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        // Fenced code block: verbatim until the closing fence (or the end)
        if line.trim_start().starts_with("```") {
            let mut code: Vec<String> = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                code.push(lines[i].to_string());
                i += 1;
            }
            if i < lines.len() {
                i += 1; // closing fence
            }
            blocks.push(Block::CodeBlock(code));
            continue;
        }

        // Block quote: consecutive `>` lines
        if line.trim_start().starts_with('>') {
            let mut quoted: Vec<Vec<Inline>> = Vec::new();
            while i < lines.len() && lines[i].trim_start().starts_with('>') {
                let body = lines[i].trim_start().trim_start_matches('>');
                let body = body.strip_prefix(' ').unwrap_or(body);
                quoted.push(parse_inlines(body));
                i += 1;
            }
            blocks.push(Block::Quote(quoted));
            continue;
        }

        // List: consecutive item lines of the same flavor, one item per line
        if let Some(ordered) = list_flavor(line) {
            let mut items: Vec<Vec<Inline>> = Vec::new();
            while i < lines.len() && list_flavor(lines[i]) == Some(ordered) {
                let regex = if ordered {
                    ordered_item_regex()
                } else {
                    unordered_item_regex()
                };
                let content = regex
                    .captures(lines[i])
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                    .unwrap_or(lines[i]);
                items.push(parse_inlines(content));
                i += 1;
            }
            blocks.push(Block::List { ordered, items });
            continue;
        }

        // Paragraph: consecutive non-blank, non-structural lines.
        // Each source line stays its own rendered line (no re-wrapping).
        let mut paragraph: Vec<Vec<Inline>> = Vec::new();
        while i < lines.len()
            && !lines[i].trim().is_empty()
            && !lines[i].trim_start().starts_with("```")
            && !lines[i].trim_start().starts_with('>')
            && list_flavor(lines[i]).is_none()
        {
            paragraph.push(parse_inlines(lines[i]));
            i += 1;
        }
        blocks.push(Block::Paragraph(paragraph));
    }

    blocks
}

fn list_flavor(line: &str) -> Option<bool> {
    if ordered_item_regex().is_match(line) {
        Some(true)
    } else if unordered_item_regex().is_match(line) {
        Some(false)
    } else {
        None
    }
}

/// Scan one line into inline runs. Unterminated or malformed markers are
/// kept as literal text rather than guessed at.
pub fn parse_inlines(line: &str) -> Vec<Inline> {
    let mut inlines: Vec<Inline> = Vec::new();
    let mut text = String::new();
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(body) = rest.strip_prefix("**") {
            if let Some(end) = body.find("**") {
                if end > 0 {
                    flush_text(&mut inlines, &mut text);
                    inlines.push(Inline::Strong(body[..end].to_string()));
                    rest = &body[end + 2..];
                    continue;
                }
            }
        } else if let Some(body) = rest.strip_prefix('*') {
            if let Some(end) = body.find('*') {
                if end > 0 {
                    flush_text(&mut inlines, &mut text);
                    inlines.push(Inline::Emphasis(body[..end].to_string()));
                    rest = &body[end + 1..];
                    continue;
                }
            }
        } else if let Some(body) = rest.strip_prefix('`') {
            if let Some(end) = body.find('`') {
                flush_text(&mut inlines, &mut text);
                inlines.push(Inline::Code(body[..end].to_string()));
                rest = &body[end + 1..];
                continue;
            }
        } else if rest.starts_with('[') {
            if let Some(captures) = link_regex().captures(rest) {
                let whole = captures.get(0).map(|m| m.len()).unwrap_or(0);
                flush_text(&mut inlines, &mut text);
                inlines.push(Inline::Link {
                    label: captures[1].to_string(),
                    href: captures[2].to_string(),
                });
                rest = &rest[whole..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            text.push(c);
        }
        rest = chars.as_str();
    }

    flush_text(&mut inlines, &mut text);
    inlines
}

fn flush_text(inlines: &mut Vec<Inline>, text: &mut String) {
    if !text.is_empty() {
        inlines.push(Inline::Text(std::mem::take(text)));
    }
}

/// Render untrusted message text straight to ratatui lines
pub fn render_lines(raw: &str, base_style: Style) -> Vec<Line<'static>> {
    let blocks = parse(raw);
    let mut out: Vec<Line<'static>> = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        if index > 0 {
            out.push(Line::default());
        }
        match block {
            Block::Paragraph(lines) => {
                for inlines in lines {
                    out.push(render_inline_line(inlines, base_style, None));
                }
            }
            Block::List { ordered, items } => {
                for (n, inlines) in items.iter().enumerate() {
                    let bullet = if *ordered {
                        format!("{}. ", n + 1)
                    } else {
                        "• ".to_string()
                    };
                    out.push(render_inline_line(inlines, base_style, Some(bullet)));
                }
            }
            Block::CodeBlock(lines) => {
                let style = base_style.fg(Color::Yellow);
                if lines.is_empty() {
                    out.push(Line::default());
                }
                for line in lines {
                    out.push(Line::from(Span::styled(format!("  {}", line), style)));
                }
            }
            Block::Quote(lines) => {
                for inlines in lines {
                    let mut spans = vec![Span::styled(
                        "│ ".to_string(),
                        base_style.fg(Color::DarkGray),
                    )];
                    spans.extend(render_inline_spans(inlines, base_style));
                    out.push(Line::from(spans));
                }
            }
        }
    }

    out
}

fn render_inline_line(
    inlines: &[Inline],
    base_style: Style,
    bullet: Option<String>,
) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    if let Some(bullet) = bullet {
        spans.push(Span::styled(bullet, base_style));
    }
    spans.extend(render_inline_spans(inlines, base_style));
    Line::from(spans)
}

fn render_inline_spans(inlines: &[Inline], base_style: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) => spans.push(Span::styled(s.clone(), base_style)),
            Inline::Code(s) => spans.push(Span::styled(s.clone(), base_style.fg(Color::Yellow))),
            Inline::Emphasis(s) => {
                spans.push(Span::styled(s.clone(), base_style.add_modifier(Modifier::ITALIC)))
            }
            Inline::Strong(s) => {
                spans.push(Span::styled(s.clone(), base_style.add_modifier(Modifier::BOLD)))
            }
            Inline::Link { label, href } => {
                spans.push(Span::styled(
                    label.clone(),
                    base_style
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                ));
                spans.push(Span::styled(
                    format!(" ({})", href),
                    base_style.fg(Color::DarkGray),
                ));
            }
        }
    }
    spans
}
