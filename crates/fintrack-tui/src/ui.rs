use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use fintrack_core::{sanitize, ChatRole, Level, EXAMPLE_PROMPTS};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::{App, FocusPane, InputMode};
use crate::markdown;

const SIDEBAR_WIDTH: u16 = 38;
const TOAST_WIDTH: u16 = 48;

fn border_color(focused: bool) -> Color {
    if focused { Color::Cyan } else { Color::DarkGray }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [sidebar_area, main_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    // Store areas for mouse hit-testing
    app.sidebar_area = Some(sidebar_area);

    render_sidebar(app, frame, sidebar_area);

    if app.is_ready() {
        render_chat_screen(app, frame, main_area);
    } else {
        app.chat_area = None;
        render_welcome(frame, main_area);
    }

    render_footer(app, frame, footer_area);

    if app.show_picker {
        render_picker(app, frame, area);
    }
    render_toasts(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let document = match app.controller.session.document() {
        Some(doc) => format!(" [{}]", doc.file_name),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" Fintrack ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(document, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    if app.show_picker {
        hints.extend(hint(" j/k ", " nav "));
        hints.extend(hint(" Enter ", " open/select "));
        hints.extend(hint(" h ", " up "));
        hints.extend(hint(" Esc ", " close "));
    } else if app.input_mode == InputMode::Editing {
        hints.extend(hint(" Enter ", " send "));
        hints.extend(hint(" Esc ", " stop typing "));
    } else {
        match app.focus {
            FocusPane::Sidebar => {
                hints.extend(hint(" o ", " choose PDF "));
                hints.extend(hint(" Enter ", " process "));
            }
            FocusPane::Chat if app.controller.session.messages().is_empty() => {
                hints.extend(hint(" j/k ", " prompt "));
                hints.extend(hint(" Enter/1-4 ", " ask "));
            }
            FocusPane::Chat => {
                hints.extend(hint(" j/k ", " select answer "));
                hints.extend(hint(" c ", " copy "));
                hints.extend(hint(" g/G ", " top/bottom "));
            }
            FocusPane::Input => {}
        }
        if app.is_ready() {
            hints.extend(hint(" i ", " ask "));
        }
        hints.extend(hint(" Tab ", " focus "));
        hints.extend(hint(" q ", " quit "));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Sidebar && !app.show_picker;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Upload PDF ");

    let muted = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled("Process a document to begin the chat.", muted)),
        Line::default(),
    ];

    match app.controller.upload.selected_name() {
        Some(name) if !app.is_processing() => {
            lines.push(Line::from(vec![
                Span::styled("▤ ", Style::default().fg(Color::Cyan)),
                Span::raw(sanitize::for_display(&name).into_owned()),
            ]));
        }
        Some(_) => {}
        None => lines.push(Line::from(Span::styled("No file selected", muted))),
    }
    lines.push(Line::default());

    let button = if app.is_processing() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        Line::from(Span::styled(
            format!(" Processing{dots} "),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ))
    } else if app.controller.upload.selected().is_some() {
        Line::from(Span::styled(
            " Process Document ",
            Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(" Process Document ", muted.add_modifier(Modifier::DIM)))
    };
    lines.push(button);
    lines.push(Line::default());

    if let Some(doc) = app.controller.session.document() {
        lines.push(Line::from(vec![
            Span::styled("Ready: ", Style::default().fg(Color::Green).bold()),
            Span::raw(doc.file_name.clone()),
        ]));
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled("Backend", muted.add_modifier(Modifier::BOLD))));
    lines.push(Line::from(Span::styled(app.backend_url.clone(), muted)));

    let sidebar = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(sidebar, area);
}

fn render_welcome(frame: &mut Frame, area: Rect) {
    let [card_area] = Layout::vertical([Constraint::Length(7)])
        .flex(Flex::Center)
        .areas(area);
    let [card_area] = Layout::horizontal([Constraint::Max(56)])
        .flex(Flex::Center)
        .areas(card_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(" ▤ Financial Reports Analyzer ").bold().centered());

    let text = Paragraph::new(vec![
        Line::default(),
        Line::from(
            "Please upload and process a financial report PDF in the sidebar to begin your analysis.",
        ),
    ])
    .block(block)
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::Gray))
    .wrap(Wrap { trim: true });

    frame.render_widget(text, card_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    if app.controller.session.messages().is_empty() && !app.is_thinking() {
        render_prompts(app, frame, chat_area);
    } else {
        render_messages(app, frame, chat_area);
    }
    render_input(app, frame, input_area);
}

fn render_prompts(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Chat ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [intro_area, list_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    let intro = Paragraph::new(
        "Start the analysis with a pre-made prompt or ask your own question below.",
    )
    .style(Style::default().fg(Color::DarkGray))
    .wrap(Wrap { trim: true });
    frame.render_widget(intro, intro_area);

    let items: Vec<ListItem> = EXAMPLE_PROMPTS
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Cyan).bold()),
                Span::raw(*prompt),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.prompt_state);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Chat ");

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    let width = app.chat_width;

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (i, msg) in app.controller.session.messages().iter().enumerate() {
        let mut header = match msg.role {
            ChatRole::User => vec![Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )],
            ChatRole::Assistant => vec![Span::styled(
                "Assistant:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )],
        };
        if app.selected_message == Some(i) {
            header.push(Span::styled(" ◀", Style::default().fg(Color::Cyan)));
        }
        if app.is_copied(i) {
            header.push(Span::styled(" ✓ copied", Style::default().fg(Color::Green)));
        }
        lines.push(Line::from(header));
        lines.extend(markdown::render(&msg.content, width));
        lines.push(Line::default());
    }

    if app.is_thinking() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Wrapped up front so the row count used for scrolling is exact
    let lines: Vec<Line<'static>> = lines
        .into_iter()
        .flat_map(|line| wrap_line(line, width as usize))
        .collect();
    app.chat_total_lines = lines.len().min(u16::MAX as usize) as u16;
    if app.follow_bottom {
        app.chat_scroll = app.max_scroll();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_scroll());
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Break a styled line at spaces so that no row is wider than `width`.
/// Words longer than a row are split.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    if line.width() <= width {
        return vec![line];
    }

    let Line { style, alignment, spans, .. } = line;
    let finish = |spans: Vec<Span<'static>>| {
        let mut row = Line::from(spans).style(style);
        row.alignment = alignment;
        row
    };

    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in spans {
        for token in split_spaces(&span.content) {
            let token_width = token.width();
            if used + token_width <= width {
                current.push(Span::styled(token.to_string(), span.style));
                used += token_width;
                continue;
            }

            // Spaces at a break are dropped
            let is_space = token.starts_with(' ');
            if used > 0 {
                while current.last().is_some_and(|s| s.content.starts_with(' ')) {
                    current.pop();
                }
                rows.push(finish(std::mem::take(&mut current)));
                used = 0;
            }
            if is_space {
                continue;
            }

            let mut piece = String::new();
            for c in token.chars() {
                let w = c.width().unwrap_or(0);
                if used + w > width && !piece.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut piece), span.style));
                    rows.push(finish(std::mem::take(&mut current)));
                    used = 0;
                }
                piece.push(c);
                used += w;
            }
            if !piece.is_empty() {
                current.push(Span::styled(piece, span.style));
            }
        }
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(finish(current));
    }
    rows
}

/// Split into alternating runs of spaces and non-spaces
fn split_spaces(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev_space = None;
    for (i, c) in text.char_indices() {
        let space = c == ' ';
        if prev_space.is_some_and(|prev| prev != space) {
            tokens.push(&text[start..i]);
            start = i;
        }
        prev_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Input;
    let disabled = app.is_thinking();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if disabled {
            Color::DarkGray
        } else if editing {
            Color::Yellow
        } else {
            border_color(app.focus == FocusPane::Input)
        }))
        .title(if disabled { " Waiting for answer " } else { " Ask " });

    let content = if app.input.is_empty() && !editing {
        Span::styled(
            "Ask a question about the document...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(app.input.as_str())
    };

    // Keep the cursor visible on long input by scrolling horizontally
    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let offset = app.cursor.saturating_sub(inner_width.saturating_sub(1));
    let input = Paragraph::new(Line::from(content))
        .block(block)
        .scroll((0, offset as u16));
    frame.render_widget(input, area);

    if editing && !disabled {
        let prefix: String = app.input.chars().take(app.cursor).collect();
        let prefix_width = Span::raw(prefix).width();
        let x = area.x + 1 + prefix_width.saturating_sub(offset) as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let [popup] = Layout::vertical([Constraint::Percentage(70)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(popup);

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", sanitize::for_display(&app.picker.dir.display().to_string())));

    if let Some(err) = &app.picker.error {
        let [list_area, error_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(block.inner(popup));
        frame.render_widget(block, popup);
        frame.render_widget(
            Paragraph::new(Span::styled(err.clone(), Style::default().fg(Color::Red))),
            error_area,
        );
        render_picker_list(app, frame, list_area, None);
    } else {
        render_picker_list(app, frame, popup, Some(block));
    }
}

fn render_picker_list(app: &mut App, frame: &mut Frame, area: Rect, block: Option<Block>) {
    let items: Vec<ListItem> = app
        .picker
        .entries
        .iter()
        .map(|entry| {
            if entry.is_dir {
                ListItem::new(Line::from(Span::styled(
                    format!(" {}/", sanitize::for_display(&entry.name)),
                    Style::default().fg(Color::Blue).bold(),
                )))
            } else {
                ListItem::new(format!(" {}", sanitize::for_display(&entry.name)))
            }
        })
        .collect();

    let mut list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    if let Some(block) = block {
        list = list.block(block);
    }

    frame.render_stateful_widget(list, area, &mut app.picker.state);
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    let width = TOAST_WIDTH.min(area.width);
    let mut y = area.y + 1;

    for note in app.controller.notifications.iter() {
        let color = match note.level {
            Level::Success => Color::Green,
            Level::Error => Color::Red,
        };
        let text_width = width.saturating_sub(2).max(1) as usize;
        let body_rows = note.description.chars().count().div_ceil(text_width).max(1) as u16;
        let height = body_rows + 2;
        if y + height > area.bottom() {
            break;
        }

        let toast_area = Rect::new(area.right().saturating_sub(width + 1), y, width, height);
        frame.render_widget(Clear, toast_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(format!(" {} ", note.title), Style::default().fg(color).bold()));
        let body = Paragraph::new(note.description.as_str())
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(body, toast_area);

        y += height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::{Config, DocumentInfo, UploadReceipt};
    use ratatui::{backend::TestBackend, Terminal};

    fn ready_app() -> App {
        let mut app = App::new(&Config::new(), None);
        app.config_path = None;
        app.controller.session.reset_for_document(DocumentInfo {
            file_name: "annual-report.pdf".to_string(),
        });
        app
    }

    fn with_answer(app: &mut App, answer: &str) {
        let session = &mut app.controller.session;
        let (ticket, _) = session.begin_exchange("Summarize the report.").unwrap();
        session.commit(ticket, answer).unwrap();
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn row_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn end_of_a_long_answer_is_visible() {
        let words: Vec<String> = (0..120).map(|i| format!("word{i:03}xx")).collect();
        let mut app = ready_app();
        with_answer(&mut app, &format!("{} ENDMARK", words.join(" ")));

        let screen = draw(&mut app, 65, 20);

        assert!(screen.contains("ENDMARK"));
        assert!(app.chat_scroll > 0);
        assert_eq!(app.chat_scroll, app.max_scroll());
    }

    #[test]
    fn wrap_breaks_at_spaces() {
        let rows = wrap_line(Line::from("alpha beta gamma"), 11);
        let texts: Vec<String> = rows.iter().map(row_text).collect();
        assert_eq!(texts, ["alpha beta", "gamma"]);
        assert!(rows.iter().all(|row| row.width() <= 11));
    }

    #[test]
    fn wrap_splits_words_wider_than_a_row() {
        let rows = wrap_line(Line::from("abcdefghij"), 4);
        let texts: Vec<String> = rows.iter().map(row_text).collect();
        assert_eq!(texts, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_keeps_span_styles_and_indent() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::raw("  "),
            Span::styled("Revenue", bold),
            Span::raw(" grew twelve percent"),
        ]);
        let rows = wrap_line(line, 16);

        assert_eq!(row_text(&rows[0]), "  Revenue grew");
        assert_eq!(rows[0].spans[1].style, bold);
        assert_eq!(row_text(&rows[1]), "twelve percent");
    }

    #[test]
    fn notification_text_reaches_the_screen_clean() {
        let mut app = App::new(&Config::new(), None);
        app.controller.notifications.error("Error", "bad\u{1b}[2Jthing");

        let screen = draw(&mut app, 80, 24);

        assert!(!screen.contains('\u{1b}'));
        assert!(screen.contains("bad[2Jthing"));
    }

    #[test]
    fn backend_file_name_reaches_the_screen_clean() {
        let mut app = App::new(&Config::new(), None);
        app.controller.session.reset_for_document(DocumentInfo::from(UploadReceipt {
            file_name: "annual\u{1b}[2J.pdf".to_string(),
            message: None,
        }));

        let screen = draw(&mut app, 100, 24);

        assert!(!screen.contains('\u{1b}'));
        assert!(screen.contains("annual[2J.pdf"));
    }
}
