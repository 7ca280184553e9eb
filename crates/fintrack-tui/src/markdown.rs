//! Markdown (CommonMark + GFM tables, strikethrough, task lists) to styled
//! terminal lines.
//!
//! Input is passed through [`sanitize::for_display`] first, so no control
//! sequence survives. Raw HTML is shown as dimmed literal text.

use std::mem;

use fintrack_core::sanitize;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const MIN_WIDTH: usize = 20;
const COLUMN_SEPARATOR: &str = " │ ";

pub fn render(text: &str, width: u16) -> Vec<Line<'static>> {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

    let clean = sanitize::for_display(text);
    let mut renderer = Renderer::new((width as usize).max(MIN_WIDTH));
    for event in Parser::new_ext(&clean, options) {
        renderer.event(event);
    }
    renderer.finish()
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn heading_style(level: HeadingLevel) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base.fg(Color::Cyan),
        _ => base,
    }
}

struct Table {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<String>>,
    header_rows: usize,
    row: Vec<String>,
    cell: String,
}

impl Table {
    fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            rows: Vec::new(),
            header_rows: 0,
            row: Vec::new(),
            cell: String::new(),
        }
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let cols = self
            .rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.alignments.len());

        let mut widths = vec![1; cols];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        // Shrink the widest column until the table fits
        let separators = COLUMN_SEPARATOR.width() * cols.saturating_sub(1);
        let budget = max_width.saturating_sub(separators).max(cols * 3);
        while widths.iter().sum::<usize>() > budget {
            let Some(widest) = widths.iter_mut().max() else { break };
            if *widest <= 3 {
                break;
            }
            *widest -= 1;
        }
        widths
    }

    fn render(&self, max_width: usize) -> Vec<Line<'static>> {
        let widths = self.column_widths(max_width);
        if widths.is_empty() {
            return Vec::new();
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        for (r, row) in self.rows.iter().enumerate() {
            let is_header = r < self.header_rows;
            let cell_style = if is_header {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let mut spans = Vec::with_capacity(widths.len() * 2);
            for (i, width) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(COLUMN_SEPARATOR, dim()));
                }
                let text = row.get(i).map(String::as_str).unwrap_or("");
                let align = self.alignments.get(i).copied().unwrap_or(Alignment::None);
                spans.push(Span::styled(fit(text, *width, align), cell_style));
            }
            lines.push(Line::from(spans));

            if is_header && r + 1 == self.header_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                lines.push(Line::styled(rule, dim()));
            }
        }
        lines
    }
}

/// Truncate or pad `text` to exactly `width` display columns
fn fit(text: &str, width: usize, align: Alignment) -> String {
    let mut shown = String::new();
    if text.width() > width {
        let mut used = 0;
        for c in text.chars() {
            let w = c.width().unwrap_or(0);
            if used + w + 1 > width {
                break;
            }
            shown.push(c);
            used += w;
        }
        shown.push('…');
    } else {
        shown.push_str(text);
    }

    let pad = width.saturating_sub(shown.width());
    match align {
        Alignment::Right => format!("{}{}", " ".repeat(pad), shown),
        Alignment::Center => {
            let left = pad / 2;
            format!("{}{}{}", " ".repeat(left), shown, " ".repeat(pad - left))
        }
        Alignment::Left | Alignment::None => format!("{}{}", shown, " ".repeat(pad)),
    }
}

struct Renderer {
    width: usize,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    links: Vec<String>,
    table: Option<Table>,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            spans: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            in_code_block: false,
            links: Vec::new(),
            table: None,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let style = f(self.style());
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return;
        }
        if !text.is_empty() {
            self.spans.push(Span::styled(text.to_string(), style));
        }
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled("│ ".repeat(self.quote_depth), dim()));
        }
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_text(&code, code_style()),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => {
                if self.table.is_some() {
                    self.push_text(" ", self.style());
                } else {
                    self.flush();
                }
            }
            Event::Rule => {
                self.flush();
                self.lines.push(Line::styled("─".repeat(self.width.min(40)), dim()));
                self.blank();
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.push_text(marker, Style::default().fg(Color::Cyan));
            }
            Event::FootnoteReference(name) => self.push_text(&format!("[^{}]", &*name), dim()),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block && self.table.is_none() {
            for line in text.lines() {
                self.spans.push(Span::styled(format!("  {line}"), code_style()));
                self.flush();
            }
            return;
        }
        self.push_text(text, self.style());
    }

    fn raw_html(&mut self, html: &str) {
        for (i, part) in html.trim_end_matches('\n').split('\n').enumerate() {
            if i > 0 && self.table.is_none() {
                self.flush();
            }
            self.push_text(part, dim());
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.push_style(|_| heading_style(level));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::styled(
                            format!("  {}", &*lang),
                            dim().add_modifier(Modifier::ITALIC),
                        ));
                    }
                }
            }
            Tag::HtmlBlock => self.flush(),
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.spans.push(Span::styled(marker, Style::default().fg(Color::Cyan)));
            }
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.push_style(|s| s.fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
            }
            Tag::Image { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.push_text("[image: ", dim());
                self.push_style(|_| dim());
            }
            Tag::Table(alignments) => {
                self.flush();
                self.table = Some(Table::new(alignments));
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.in_code_block = false;
                self.blank();
            }
            TagEnd::HtmlBlock => {
                self.flush();
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.links.pop() {
                    if !url.is_empty() && !self.ends_with(&url) {
                        self.push_text(&format!(" ({url})"), dim());
                    }
                }
            }
            TagEnd::Image => {
                self.pop_style();
                self.links.pop();
                self.push_text("]", dim());
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    let row = mem::take(&mut table.row);
                    table.rows.push(row);
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    let lines = table.render(self.width);
                    self.lines.extend(lines);
                    self.blank();
                }
            }
            _ => {}
        }
    }

    /// Autolinks already show their URL as the link text
    fn ends_with(&self, url: &str) -> bool {
        match self.table.as_ref() {
            Some(table) => table.cell.ends_with(url),
            None => self.spans.last().is_some_and(|span| span.content == url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let lines = render("Revenue grew 12%.\n\nNet income was flat.", 80);
        assert_eq!(plain(&lines), vec!["Revenue grew 12%.", "", "Net income was flat."]);
    }

    #[test]
    fn emphasis_is_styled() {
        let lines = render("Revenue **grew** by *12%*", 80);
        let bold = lines[0].spans.iter().find(|s| s.content == "grew").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let italic = lines[0].spans.iter().find(|s| s.content == "12%").unwrap();
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn lists_get_markers() {
        let lines = render("- liquidity\n- leverage\n  1. debt\n  2. equity\n", 80);
        assert_eq!(
            plain(&lines),
            vec!["• liquidity", "• leverage", "  1. debt", "  2. equity"]
        );
    }

    #[test]
    fn task_list_markers() {
        let lines = render("- [x] revenue\n- [ ] costs\n", 80);
        assert_eq!(plain(&lines), vec!["• [x] revenue", "• [ ] costs"]);
    }

    #[test]
    fn tables_are_aligned() {
        let md = "| Metric | 2023 |\n|:--|--:|\n| Revenue | 1,200 |\n| Net income | 300 |\n";
        let lines = plain(&render(md, 80));
        assert_eq!(lines[0], "Metric     │  2023");
        assert_eq!(lines[1], "───────────┼──────");
        assert_eq!(lines[2], "Revenue    │ 1,200");
        assert_eq!(lines[3], "Net income │   300");
    }

    #[test]
    fn wide_tables_are_truncated_to_fit() {
        let long = "x".repeat(60);
        let md = format!("| a | b |\n|---|---|\n| {long} | {long} |\n");
        let lines = render(&md, 40);
        assert!(lines.iter().all(|line| line.width() <= 40));
        assert!(plain(&lines)[2].contains('…'));
    }

    #[test]
    fn code_blocks_are_indented() {
        let lines = render("```sql\nSELECT revenue\nFROM report;\n```", 80);
        assert_eq!(plain(&lines), vec!["  sql", "  SELECT revenue", "  FROM report;"]);
    }

    #[test]
    fn links_show_their_target() {
        let lines = render("See [the filing](https://sec.gov/f).", 80);
        assert_eq!(plain(&lines), vec!["See the filing (https://sec.gov/f)."]);

        let lines = render("<https://sec.gov/f>", 80);
        assert_eq!(plain(&lines), vec!["https://sec.gov/f"]);
    }

    #[test]
    fn raw_html_is_shown_as_inert_text() {
        let lines = render("<script>alert(1)</script>\n\nafter", 80);
        let text = plain(&lines);
        assert_eq!(text[0], "<script>alert(1)</script>");
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::DarkGray));
        assert_eq!(text.last().map(String::as_str), Some("after"));
    }

    #[test]
    fn control_sequences_never_reach_the_terminal() {
        let lines = render("\u{1b}[2J\u{1b}]0;pwned\u{7}Revenue", 80);
        let text = plain(&lines).join("\n");
        assert!(!text.chars().any(|c| c.is_control() && c != '\n'));
        assert!(text.contains("Revenue"));
    }

    #[test]
    fn block_quotes_are_prefixed() {
        let lines = render("> guidance withdrawn", 80);
        assert_eq!(plain(&lines), vec!["│ guidance withdrawn"]);
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit("ab", 4, Alignment::Right), "  ab");
        assert_eq!(fit("ab", 4, Alignment::Center), " ab ");
        assert_eq!(fit("abcdef", 4, Alignment::Left), "abc…");
    }
}
