use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tui_textarea::TextArea;

/// Event emitted by TextInput widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Submit, // Enter pressed
    Cancel, // Esc pressed
}

/// Single-line text input widget wrapping tui-textarea
pub struct TextInput {
    textarea: TextArea<'static>,
}

impl TextInput {
    pub fn new(placeholder: &str) -> Self {
        let mut textarea = TextArea::default();
        // Single-line: no cursor line underline, no line numbers
        textarea.set_cursor_line_style(Style::default());
        textarea.set_placeholder_text(placeholder.to_string());
        textarea.set_placeholder_style(Style::default().fg(Color::DarkGray));

        let mut input = Self { textarea };
        input.set_focused(false);
        input
    }

    /// Current draft text
    pub fn value(&self) -> String {
        self.textarea.lines().join("")
    }

    pub fn is_empty(&self) -> bool {
        self.textarea.lines().iter().all(|line| line.is_empty())
    }

    pub fn clear(&mut self) {
        self.textarea.select_all();
        self.textarea.cut();
    }

    /// Focus is purely visual here: a focused input shows a reversed cursor
    pub fn set_focused(&mut self, focused: bool) {
        if focused {
            self.textarea
                .set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        } else {
            self.textarea.set_cursor_style(Style::default());
        }
    }

    /// Feed a key event into the input
    pub fn input(&mut self, key: &KeyEvent) -> TextInputEvent {
        match key.code {
            KeyCode::Enter => TextInputEvent::Submit,
            KeyCode::Esc => TextInputEvent::Cancel,
            _ => {
                self.textarea.input(*key);
                TextInputEvent::None
            }
        }
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        (&self.textarea).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_typing_and_clear() {
        let mut input = TextInput::new("Type your message...");
        for c in "hi".chars() {
            assert_eq!(input.input(&key(KeyCode::Char(c))), TextInputEvent::None);
        }
        assert_eq!(input.value(), "hi");
        assert!(!input.is_empty());

        input.clear();
        assert!(input.is_empty());
    }

    #[test]
    fn test_enter_submits_and_esc_cancels() {
        let mut input = TextInput::new("");
        assert_eq!(input.input(&key(KeyCode::Enter)), TextInputEvent::Submit);
        assert_eq!(input.input(&key(KeyCode::Esc)), TextInputEvent::Cancel);
        // Neither key leaks into the draft
        assert!(input.is_empty());
    }
}
