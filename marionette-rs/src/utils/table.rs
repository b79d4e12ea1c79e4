//! Table output for clip listings and playback traces

use prettytable::format::{Alignment, FormatBuilder, LinePosition, LineSeparator};
use prettytable::{Cell, Row, Table};

/// Table with a bold title row and a rule under it
pub fn create_table(headers: &[&str]) -> Table {
    let format = FormatBuilder::new()
        .column_separator(' ')
        .borders(' ')
        .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
        .padding(1, 1)
        .build();

    let mut table = Table::new();
    table.set_format(format);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
    ));
    table
}

/// Append a row; numeric cells (ticks, frames, layers) are right-aligned
pub fn add_table_row<I, S>(table: &mut Table, cells: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row = cells
        .into_iter()
        .map(|s| {
            let text = s.as_ref();
            let align = if is_numeric(text) {
                Alignment::RIGHT
            } else {
                Alignment::LEFT
            };
            Cell::new_align(text, align)
        })
        .collect();
    table.add_row(Row::new(row));
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Format a millisecond duration
pub fn format_ms(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.2} s", ms as f64 / 1000.0)
    } else {
        format!("{ms} ms")
    }
}
