use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

/// Operational counters shown in the debug overlay (--debug)
#[derive(Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: u64,
    pub discarded_stale: u64,
    pub generation: u64,
}

impl DebugState {
    pub fn overlay_text(&self) -> String {
        format!(
            "events: {}  stale-discards: {}  generation: {}",
            self.num_events, self.discarded_stale, self.generation
        )
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.enabled {
            return;
        }
        Paragraph::new(self.overlay_text())
            .style(Style::default().fg(Color::Magenta))
            .right_aligned()
            .render(area, buf);
    }
}
