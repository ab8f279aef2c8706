use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, StatefulWidget, Widget},
};

use crate::chat::{ChatRole, ChatSession, EMPTY_LOG_HINT, PANEL_TITLE, TYPING_INDICATOR};
use crate::markdown;
use crate::widgets::text_input::TextInput;

/// Scroll state for the chat panel.
///
/// The panel keeps the newest message visible: whenever the session revision
/// changes (a message was appended or the typing indicator flipped), the
/// scroll offset snaps to the bottom during the next render. Between
/// changes the user may scroll back through the log freely.
#[derive(Default)]
pub struct ChatPanelState {
    scroll: u16,
    seen_revision: Option<u64>,
    max_scroll: u16,
}

impl ChatPanelState {
    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_add(1).min(self.max_scroll);
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }
}

/// Collapsible chat panel: message log, typing indicator, input box
pub struct ChatPanel<'a> {
    session: &'a ChatSession,
    input: &'a TextInput,
    focused: bool,
}

impl<'a> ChatPanel<'a> {
    pub fn new(session: &'a ChatSession, input: &'a TextInput, focused: bool) -> Self {
        Self {
            session,
            input,
            focused,
        }
    }

    fn message_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();

        if self.session.messages().is_empty() {
            lines.push(Line::from(Span::styled(
                EMPTY_LOG_HINT,
                Style::default().fg(Color::DarkGray),
            )));
        }

        for message in self.session.messages() {
            let (label, label_color) = match message.role {
                ChatRole::User => ("You", Color::Blue),
                ChatRole::Assistant => ("Agent", Color::Green),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default()
                    .fg(label_color)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.extend(markdown::render_lines(&message.content, Style::default()));
            lines.push(Line::default());
        }

        if self.session.is_awaiting() {
            lines.push(Line::from(Span::styled(
                TYPING_INDICATOR,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }
}

impl StatefulWidget for &ChatPanel<'_> {
    type State = ChatPanelState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(PANEL_TITLE);
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Fill(1), Constraint::Length(1)])
            .split(inner);
        let log_area = layout[0];
        let input_area = layout[1];

        let lines = self.message_lines();
        let total = lines.len() as u16;
        state.max_scroll = total.saturating_sub(log_area.height);

        // Scroll-to-bottom invariant: snap after every log/indicator change
        if state.seen_revision != Some(self.session.revision()) {
            state.scroll = state.max_scroll;
            state.seen_revision = Some(self.session.revision());
        } else {
            state.scroll = state.scroll.min(state.max_scroll);
        }

        Paragraph::new(lines)
            .scroll((state.scroll, 0))
            .render(log_area, buf);

        self.input.render(input_area, buf);
    }
}
