use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::StateChanged => app.refresh(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
            }
        }

        // New session
        KeyCode::Char('n') => app.new_session(),

        // Welcome panel shortcuts
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(number) = c.to_digit(10) {
                app.send_welcome_shortcut(number as usize);
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Shortcuts => app.shortcut_nav_down(),
            _ => app.scroll_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Shortcuts => app.shortcut_nav_up(),
            _ => app.scroll_up(1),
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.transcript_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.transcript_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.transcript_height),
        KeyCode::PageUp => app.scroll_up(app.transcript_height),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_transcript_to_bottom(),

        KeyCode::Enter => match app.focus {
            FocusPane::Shortcuts => app.send_selected_shortcut(),
            FocusPane::Input => app.input_mode = InputMode::Editing,
            FocusPane::Transcript => {}
        },

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = app.focus.next();
        }
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            app.insert_char('\n');
        }
        KeyCode::Enter => app.submit(None),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sidebar = app.sidebar_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_transcript = app.transcript_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sidebar {
                app.shortcut_nav_down();
            } else if in_transcript {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sidebar {
                app.shortcut_nav_up();
            } else if in_transcript {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}
