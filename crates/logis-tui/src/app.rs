use logis_core::shortcuts::welcome_queries;
use logis_core::{ConversationState, LogisClient, SessionController, QUICK_QUERIES};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Shortcuts,
    Transcript,
    Input,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Shortcuts => FocusPane::Transcript,
            FocusPane::Transcript => FocusPane::Input,
            FocusPane::Input => FocusPane::Shortcuts,
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Session
    pub controller: SessionController<LogisClient>,
    pub conversation: ConversationState,
    pub api_url: String,

    // Input state (the draft itself lives in the controller)
    pub input_cursor: usize,

    // Sidebar
    pub shortcut_state: ListState,

    // Transcript state
    pub transcript_scroll: u16,
    pub transcript_height: u16, // Inner height, for scroll calculations
    pub transcript_width: u16,  // Inner width, for wrap calculations
    pub transcript_rows: u16,   // Wrapped rows at the last render
    pub follow_bottom: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub transcript_area: Option<Rect>,

    seen_turns: usize,
    seen_epoch: u64,
}

impl App {
    pub fn new(controller: SessionController<LogisClient>, api_url: String) -> Self {
        let conversation = controller.snapshot();

        let mut shortcut_state = ListState::default();
        shortcut_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            seen_turns: conversation.turns().len(),
            seen_epoch: conversation.epoch(),
            controller,
            conversation,
            api_url,

            input_cursor: 0,

            shortcut_state,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            transcript_rows: 0,
            follow_bottom: true,

            animation_frame: 0,

            sidebar_area: None,
            transcript_area: None,
        }
    }

    /// Pull the latest conversation state from the controller.
    pub fn refresh(&mut self) {
        self.conversation = self.controller.snapshot();

        let turns = self.conversation.turns().len();
        if self.conversation.epoch() != self.seen_epoch {
            self.seen_epoch = self.conversation.epoch();
            self.transcript_scroll = 0;
            self.follow_bottom = true;
        }
        if turns != self.seen_turns {
            // New turn: scroll it into view
            self.seen_turns = turns;
            self.follow_bottom = true;
        }
        if self.follow_bottom {
            self.scroll_transcript_to_bottom();
        }

        let draft_len = self.conversation.draft().chars().count();
        self.input_cursor = self.input_cursor.min(draft_len);
    }

    /// Hand a message to the controller without blocking the event loop.
    ///
    /// `None` sends the draft. The controller decides whether the send is
    /// accepted; this only skips spawning when it obviously won't be.
    pub fn submit(&mut self, text: Option<String>) {
        let worth_sending = match &text {
            Some(text) => !text.trim().is_empty() && !self.conversation.pending(),
            None => self.conversation.can_send_draft(),
        };
        if !worth_sending {
            return;
        }

        let controller = self.controller.clone();
        tokio::spawn(async move {
            let outcome = controller.send(text.as_deref()).await;
            tracing::debug!(?outcome, "send finished");
        });
        self.follow_bottom = true;
    }

    pub fn send_selected_shortcut(&mut self) {
        if let Some(query) = self.shortcut_state.selected().and_then(|i| QUICK_QUERIES.get(i)) {
            self.submit(Some(query.text.to_string()));
        }
    }

    /// Number keys on the welcome panel; `number` is 1-based.
    pub fn send_welcome_shortcut(&mut self, number: usize) {
        if !self.conversation.turns().is_empty() {
            return;
        }
        if let Some(query) = number.checked_sub(1).and_then(|i| welcome_queries().get(i)) {
            self.submit(Some(query.text.to_string()));
        }
    }

    pub fn new_session(&mut self) {
        self.controller.reset();
        self.refresh();
    }

    // Draft editing
    pub fn insert_char(&mut self, c: char) {
        let cursor = self.input_cursor;
        self.controller.edit_draft(|draft| {
            let byte_pos = char_to_byte_index(draft, cursor);
            draft.insert(byte_pos, c);
        });
        self.input_cursor += 1;
        self.refresh();
    }

    pub fn backspace(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let cursor = self.input_cursor;
        self.controller.edit_draft(|draft| {
            let byte_pos = char_to_byte_index(draft, cursor);
            if byte_pos < draft.len() {
                draft.remove(byte_pos);
            }
        });
        self.refresh();
    }

    pub fn delete(&mut self) {
        let cursor = self.input_cursor;
        self.controller.edit_draft(|draft| {
            let byte_pos = char_to_byte_index(draft, cursor);
            if byte_pos < draft.len() {
                draft.remove(byte_pos);
            }
        });
        self.refresh();
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.conversation.draft().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.conversation.draft().chars().count();
    }

    // Sidebar navigation
    pub fn shortcut_nav_down(&mut self) {
        let i = self.shortcut_state.selected().unwrap_or(0);
        self.shortcut_state
            .select(Some((i + 1).min(QUICK_QUERIES.len() - 1)));
    }

    pub fn shortcut_nav_up(&mut self) {
        let i = self.shortcut_state.selected().unwrap_or(0);
        self.shortcut_state.select(Some(i.saturating_sub(1)));
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_transcript_scroll();
        self.transcript_scroll = self.transcript_scroll.saturating_add(lines).min(max_scroll);
        self.follow_bottom = self.transcript_scroll >= max_scroll;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.transcript_scroll = 0;
    }

    pub fn scroll_transcript_to_bottom(&mut self) {
        self.transcript_scroll = self.max_transcript_scroll();
        self.follow_bottom = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
            if self.follow_bottom {
                self.scroll_transcript_to_bottom();
            }
        }
    }

    fn max_transcript_scroll(&self) -> u16 {
        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };
        self.transcript_rows.saturating_sub(visible_height)
    }
}

/// App wired to an address nothing listens on. Needs a tokio runtime.
#[cfg(test)]
pub(crate) fn offline_app() -> App {
    let url = "http://127.0.0.1:9";
    let (controller, _probe) = SessionController::start(LogisClient::new(url));
    App::new(controller, url.to_string())
}
