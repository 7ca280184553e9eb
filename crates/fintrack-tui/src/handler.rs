use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_picker {
        handle_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.picker.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.picker.nav_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.picker_choose(),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => app.picker.parent(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1));
        }

        // Tab cycles: Sidebar -> Chat -> Input -> Sidebar
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Sidebar if app.is_ready() => FocusPane::Chat,
                FocusPane::Sidebar => FocusPane::Sidebar,
                FocusPane::Chat => FocusPane::Input,
                FocusPane::Input => FocusPane::Sidebar,
            };
            if app.focus == FocusPane::Input && !app.is_thinking() {
                app.input_mode = InputMode::Editing;
                app.cursor = app.input.chars().count();
            }
        }

        // Upload
        KeyCode::Char('o') => app.open_picker(),
        KeyCode::Char('u') => app.submit_upload(),
        KeyCode::Enter if app.focus == FocusPane::Sidebar => app.submit_upload(),

        // Start typing a question
        KeyCode::Char('i') | KeyCode::Char('/') if app.is_ready() && !app.is_thinking() => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.cursor = app.input.chars().count();
        }

        // Pre-made prompts (only offered while the conversation is empty)
        KeyCode::Char(c @ '1'..='4') if app.is_ready() => {
            app.send_example(c as usize - '1' as usize);
        }
        KeyCode::Enter if app.focus == FocusPane::Chat && app.controller.session.messages().is_empty() => {
            if let Some(i) = app.prompt_state.selected() {
                app.send_example(i);
            }
        }

        // Chat navigation
        KeyCode::Char('j') | KeyCode::Down if app.focus == FocusPane::Chat => {
            if app.controller.session.messages().is_empty() {
                app.prompt_nav_down();
            } else {
                app.select_next_message();
            }
        }
        KeyCode::Char('k') | KeyCode::Up if app.focus == FocusPane::Chat => {
            if app.controller.session.messages().is_empty() {
                app.prompt_nav_up();
            } else {
                app.select_prev_message();
            }
        }
        KeyCode::Char('c') if app.focus == FocusPane::Chat => app.copy_selected(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),

        KeyCode::Esc => {
            app.selected_message = None;
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    // Input is disabled while an answer is outstanding
    if app.is_thinking() {
        if key.code == KeyCode::Esc {
            app.input_mode = InputMode::Normal;
        }
        return;
    }

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Sidebar;
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let over_chat = app
        .chat_area
        .is_some_and(|area| point_in_rect(mouse.column, mouse.row, area));

    match mouse.kind {
        MouseEventKind::ScrollDown if over_chat => app.scroll_down(3),
        MouseEventKind::ScrollUp if over_chat => app.scroll_up(3),
        MouseEventKind::Down(_) => {
            if over_chat {
                app.focus = FocusPane::Chat;
                app.input_mode = InputMode::Normal;
            } else if app
                .sidebar_area
                .is_some_and(|area| point_in_rect(mouse.column, mouse.row, area))
            {
                app.focus = FocusPane::Sidebar;
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {}
    }
}
