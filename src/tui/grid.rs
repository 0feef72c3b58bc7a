use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::mode::TuiState;
use crate::shared::{CellState, DisplayState};

const CELL_WIDTH: u16 = 2; // glyph + gap, keeps cells roughly square

// how many rows/cols of the grid fit inside `area` once the border is drawn
pub fn visible_cells(area: Rect) -> (usize, usize) {
    let rows = area.height.saturating_sub(2) as usize;
    let cols = (area.width.saturating_sub(2) / CELL_WIDTH) as usize;
    (rows, cols)
}

pub fn draw_cell_grid(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let (rows, cols) = visible_cells(area);
    let row_end = (ts.scroll_row + rows).min(state.size);
    let col_end = (ts.scroll_col + cols).min(state.size);

    let lines: Vec<Line> = (ts.scroll_row..row_end)
        .map(|row| {
            let spans: Vec<Span> = (ts.scroll_col..col_end)
                .map(|col| {
                    let (glyph, mut style) = cell_look(state.cells[row][col]);
                    if row == ts.cursor_row && col == ts.cursor_col {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(glyph, style)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let title = format!(
        " {}x{}  row {} col {} ",
        state.size, state.size, ts.cursor_row, ts.cursor_col
    );
    let grid = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(grid, area);
}

fn cell_look(cell: CellState) -> (&'static str, Style) {
    match cell {
        CellState::Off => ("· ", Style::default().fg(Color::DarkGray)),
        CellState::On => ("■ ", Style::default().fg(Color::Magenta)),
        CellState::Playing => ("■ ", Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD)),
        CellState::Playhead => ("│ ", Style::default().fg(Color::Cyan)),
    }
}
