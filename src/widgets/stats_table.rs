use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, StatefulWidget, Table, TableState, Tabs, Widget},
};

use crate::partition::{format_stat, header_label, TypePartition};

/// Column-statistics table with a type-selector tab row.
///
/// The table schema is dynamic: headers come from the partition's first-seen
/// key union, so every visible column gets a cell for every key, with the
/// placeholder glyph standing in for values the analytics service did not
/// compute for that column.
pub struct StatsTable<'a> {
    partition: &'a TypePartition<'a>,
    placeholder: &'a str,
    dimmed: bool,
}

impl<'a> StatsTable<'a> {
    pub fn new(partition: &'a TypePartition<'a>, placeholder: &'a str) -> Self {
        Self {
            partition,
            placeholder,
            dimmed: false,
        }
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

impl StatefulWidget for &StatsTable<'_> {
    type State = TableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Column Statistics")
            .style(base_style);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.partition.available_types.is_empty() {
            Paragraph::new("No columns in this dataset.")
                .style(base_style.fg(Color::DarkGray))
                .render(inner, buf);
            return;
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(1)])
            .split(inner);

        let tabs = Tabs::new(self.partition.available_types.clone())
            .select(self.partition.selected_index())
            .style(base_style)
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        tabs.render(layout[0], buf);

        let header = std::iter::once("column".to_string())
            .chain(self.partition.header_keys.iter().map(|k| header_label(k)))
            .map(|label| Cell::from(label))
            .collect::<Row>()
            .style(base_style.add_modifier(Modifier::BOLD).fg(Color::Cyan));

        let rows: Vec<Row> = self
            .partition
            .visible_columns
            .iter()
            .map(|column| {
                std::iter::once(column.name.clone())
                    .chain(
                        self.partition
                            .header_keys
                            .iter()
                            .map(|key| format_stat(&column.stat(key), self.placeholder)),
                    )
                    .map(Cell::from)
                    .collect::<Row>()
                    .style(base_style)
            })
            .collect();

        let name_width = self
            .partition
            .visible_columns
            .iter()
            .map(|c| c.name.chars().count())
            .max()
            .unwrap_or(6)
            .clamp(6, 24) as u16;

        let mut widths = vec![Constraint::Length(name_width)];
        widths.extend(
            self.partition
                .header_keys
                .iter()
                .map(|_| Constraint::Min(8)),
        );

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(base_style.add_modifier(Modifier::REVERSED))
            .column_spacing(1);

        StatefulWidget::render(table, layout[1], buf, state);
    }
}
