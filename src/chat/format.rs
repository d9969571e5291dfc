//! Assistant reply formatting
//!
//! Replies are loose Markdown. They are parsed into a small block model first
//! and only then rendered, so every piece of reply text goes through escaping
//! exactly once.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    /// `**bold**` run, shown as a title block
    Title(Vec<Inline>),
    /// One of the highlighted status emoji
    Emoji(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Line(Vec<Inline>),
    LineBreak,
    SectionBreak,
    BulletList(Vec<Vec<Inline>>),
    OrderedList(Vec<Vec<Inline>>),
}

pub struct ResponseFormatter {
    heading_re: Regex,
    bullet_re: Regex,
    ordered_re: Regex,
    title_re: Regex,
    emoji_re: Regex,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new()
    }
}

static FORMATTER: LazyLock<ResponseFormatter> = LazyLock::new(ResponseFormatter::new);

impl ResponseFormatter {
    pub fn new() -> Self {
        Self {
            heading_re: Regex::new(r"^#+\s*").expect("Failed to compile heading regex"),
            bullet_re: Regex::new(r"^[-•]\s").expect("Failed to compile bullet regex"),
            ordered_re: Regex::new(r"^\d+\.\s").expect("Failed to compile ordered list regex"),
            title_re: Regex::new(r"\*\*(.+?)\*\*").expect("Failed to compile title regex"),
            emoji_re: Regex::new(r"📊|📈|💡|⚠️|✅|❌").expect("Failed to compile emoji regex"),
        }
    }

    pub fn parse(&self, text: &str) -> Vec<Block> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                if self.heading_re.is_match(line) { "" } else { line }
            })
            .collect();

        let mut blocks = Vec::new();
        let mut pending_newlines = 0usize;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            let list_re = if self.bullet_re.is_match(line) {
                Some((&self.bullet_re, true))
            } else if self.ordered_re.is_match(line) {
                Some((&self.ordered_re, false))
            } else {
                None
            };

            if let Some((marker_re, bulleted)) = list_re {
                let mut items = Vec::new();
                while i < lines.len() && marker_re.is_match(lines[i]) {
                    let item = self.strip_marker(lines[i], bulleted);
                    if !item.is_empty() {
                        items.push(self.parse_inline(item));
                    }
                    i += 1;
                }
                push_breaks(&mut blocks, pending_newlines);
                blocks.push(if bulleted {
                    Block::BulletList(items)
                } else {
                    Block::OrderedList(items)
                });
                // the list swallows its trailing newline
                pending_newlines = 0;
                continue;
            }

            if !line.is_empty() {
                push_breaks(&mut blocks, pending_newlines);
                pending_newlines = 0;
                blocks.push(Block::Line(self.parse_inline(line)));
            }
            if i + 1 < lines.len() {
                pending_newlines += 1;
            }
            i += 1;
        }

        blocks
    }

    fn strip_marker<'a>(&self, line: &'a str, bulleted: bool) -> &'a str {
        let rest = if bulleted {
            line.trim_start_matches(['-', '•'])
        } else {
            line.trim_start_matches(|c: char| c.is_ascii_digit())
                .strip_prefix('.')
                .unwrap_or(line)
        };
        rest.trim()
    }

    fn parse_inline(&self, text: &str) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut last = 0;
        for caps in self.title_re.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            self.push_text(&mut out, &text[last..whole.start()]);
            let mut title = Vec::new();
            self.push_text(&mut title, inner.as_str());
            out.push(Inline::Title(title));
            last = whole.end();
        }
        self.push_text(&mut out, &text[last..]);
        out
    }

    fn push_text(&self, out: &mut Vec<Inline>, text: &str) {
        let mut last = 0;
        for m in self.emoji_re.find_iter(text) {
            if m.start() > last {
                out.push(Inline::Text(text[last..m.start()].to_string()));
            }
            out.push(Inline::Emoji(m.as_str().to_string()));
            last = m.end();
        }
        if last < text.len() {
            out.push(Inline::Text(text[last..].to_string()));
        }
    }
}

fn push_breaks(blocks: &mut Vec<Block>, newlines: usize) {
    if blocks.is_empty() {
        return;
    }
    match newlines {
        0 => {}
        1 => blocks.push(Block::LineBreak),
        _ => blocks.push(Block::SectionBreak),
    }
}

/// Parse an assistant reply into blocks
pub fn parse_response(text: &str) -> Vec<Block> {
    FORMATTER.parse(text)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

pub fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Line(inlines) => inline_html(&mut out, inlines),
            Block::LineBreak => out.push_str("<br>"),
            Block::SectionBreak => out.push_str(r#"<div class="section-break"></div>"#),
            Block::BulletList(items) => list_html(&mut out, "ul", items),
            Block::OrderedList(items) => list_html(&mut out, "ol", items),
        }
    }
    out
}

fn list_html(out: &mut String, tag: &str, items: &[Vec<Inline>]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("<{tag}>"));
    for item in items {
        out.push_str("<li>");
        inline_html(out, item);
        out.push_str("</li>");
    }
    out.push_str(&format!("</{tag}>"));
}

fn inline_html(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Title(inner) => {
                out.push_str(r#"<div class="doc-title-block">"#);
                inline_html(out, inner);
                out.push_str("</div>");
            }
            Inline::Emoji(emoji) => {
                out.push_str(r#"<span class="emoji-highlight">"#);
                out.push_str(emoji);
                out.push_str("</span>");
            }
        }
    }
}

/// Terminal rendering
pub fn render_plain(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Line(inlines) => inline_plain(&mut out, inlines),
            Block::LineBreak => out.push('\n'),
            Block::SectionBreak => out.push_str("\n\n"),
            Block::BulletList(items) | Block::OrderedList(items) => {
                let ordered = matches!(block, Block::OrderedList(_));
                for (idx, item) in items.iter().enumerate() {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    if ordered {
                        out.push_str(&format!("  {}. ", idx + 1));
                    } else {
                        out.push_str("  • ");
                    }
                    inline_plain(&mut out, item);
                }
                out.push('\n');
            }
        }
    }
    out.trim_end().to_string()
}

fn inline_plain(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Emoji(text) => out.push_str(text),
            Inline::Title(inner) => inline_plain(out, inner),
        }
    }
}
