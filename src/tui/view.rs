use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::grid;
use super::mode::TuiState;
use crate::shared::DisplayState;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &mut TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport + pitch
            Constraint::Length(3), // sound params
            Constraint::Min(6),    // the grid
            Constraint::Length(1), // help / status
        ])
        .split(area);

    draw_transport(frame, sections[0], state);
    draw_params(frame, sections[1], state);

    let (rows, cols) = grid::visible_cells(sections[2]);
    ts.follow_cursor(rows, cols);
    grid::draw_cell_grid(frame, sections[2], state, ts);

    draw_status(frame, sections[3], state);
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let icon = if state.playing { "▶" } else { "■" };
    let text = format!(
        "{icon} step {:>2}  {:>5.1} bpm  {}  |  {} oct {}  |  {} notes",
        state.current_step, state.bpm, state.pattern, state.scale, state.octave, state.active_notes
    );
    let p = Paragraph::new(Line::from(text)).block(Block::default().borders(Borders::ALL).title(" stepgrid "));
    frame.render_widget(p, area);
}

fn draw_params(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let p = &state.params;
    let text = format!(
        "{}  adsr {:.2}/{:.2}/{:.2}/{:.2}  cut {:.0}Hz q {:.1}dB  dly {:.2}s fb {:.2}  rev {:.2} {}  drv {:.2}",
        state.waveform.label(),
        p.attack,
        p.decay,
        p.sustain,
        p.release,
        p.filter_cutoff,
        p.filter_resonance,
        p.delay_time,
        p.delay_feedback,
        p.reverb_mix,
        state.impulse.name(),
        p.distortion,
    );
    let w = Paragraph::new(Line::from(text)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(w, area);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let line = match &state.status {
        Some(err) => Paragraph::new(format!("! {err}")).style(Style::default().fg(Color::Red)),
        None => Paragraph::new("space play  x toggle  o/d paint/erase  p preview  P pattern  s scale  w wave  i room  q quit")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(line, area);
}
