use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

const BINDINGS: [(&str, &str); 5] = [
    ("←/→", "Type"),
    ("↑/↓", "Rows"),
    ("c", "Chat"),
    ("o", "Open"),
    ("q", "Quit"),
];

/// Bottom key-binding bar
#[derive(Default)]
pub struct Controls {
    pub column_count: Option<usize>,
    pub dimmed: bool,
    pub chat_open: bool,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_count(mut self, column_count: Option<usize>) -> Self {
        self.column_count = column_count;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_chat_open(mut self, chat_open: bool) -> Self {
        self.chat_open = chat_open;
        self
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bar = Style::default().bg(Color::DarkGray);
        let base = if self.dimmed {
            bar.fg(Color::DarkGray)
        } else {
            bar
        };

        let mut spans: Vec<Span> = Vec::with_capacity(BINDINGS.len() * 2);
        for (key, action) in BINDINGS {
            spans.push(Span::styled(format!(" {} ", key), base.bold()));
            // Highlight "Chat" while the chat panel is open
            let action_style = if action == "Chat" && self.chat_open {
                base.fg(Color::Cyan)
            } else {
                base
            };
            spans.push(Span::styled(format!("{} ", action), action_style));
        }

        Paragraph::new(Line::from(spans))
            .style(base)
            .render(area, buf);

        if let Some(count) = self.column_count {
            let count_style = if self.dimmed {
                base
            } else {
                base.fg(Color::White)
            };
            Paragraph::new(format!("Columns: {} ", count))
                .style(count_style)
                .right_aligned()
                .render(area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn draw(controls: Controls) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 1)).unwrap();
        terminal
            .draw(|frame| frame.render_widget(&controls, frame.area()))
            .unwrap();
        format!("{:?}", terminal.backend().buffer())
    }

    #[test]
    fn test_bindings_and_column_count_render() {
        let content = draw(Controls::new().with_column_count(Some(12)));
        for (key, action) in BINDINGS {
            assert!(content.contains(key), "missing binding key {}", key);
            assert!(content.contains(action), "missing action {}", action);
        }
        assert!(content.contains("Columns: 12"));
    }

    #[test]
    fn test_column_count_omitted_without_snapshot() {
        let content = draw(Controls::new());
        assert!(!content.contains("Columns:"));
    }
}
