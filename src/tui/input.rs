use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::TuiState;
use crate::pipeline::params::ParamName;
use crate::shared::{BPM_STEP, InputEvent};

// poll for a key, move the cursor locally, and resolve everything else into
// semantic input events for the middle layer
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let (row, col) = (ts.cursor_row, ts.cursor_col);
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        // cursor, handled here and never sent on
        KeyCode::Up | KeyCode::Char('k') => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down | KeyCode::Char('j') => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left | KeyCode::Char('h') => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right | KeyCode::Char('l') => { ts.move_cursor(0, 1); vec![] }

        // grid edits
        KeyCode::Enter | KeyCode::Char('x') => vec![InputEvent::ToggleCell { row, col }],
        KeyCode::Char('o') => {
            ts.move_cursor(0, 1); // paint strokes run left to right
            vec![InputEvent::PaintCell { row, col }]
        }
        KeyCode::Char('d') => {
            ts.move_cursor(0, 1);
            vec![InputEvent::EraseCell { row, col }]
        }
        KeyCode::Char('p') => vec![InputEvent::PreviewCell { row, col }],
        KeyCode::Char('c') => vec![InputEvent::ClearGrid],

        // transport and pitch
        KeyCode::Char('P') => vec![InputEvent::NextPattern],
        KeyCode::Char('-') => vec![InputEvent::AdjustBpm(-BPM_STEP)],
        KeyCode::Char('=') => vec![InputEvent::AdjustBpm(BPM_STEP)],
        KeyCode::Char('s') => vec![InputEvent::NextScale],
        KeyCode::Char('<') => vec![InputEvent::OctaveDown],
        KeyCode::Char('>') => vec![InputEvent::OctaveUp],

        // sound
        KeyCode::Char('w') => vec![InputEvent::NextWaveform],
        KeyCode::Char('i') => vec![InputEvent::NextImpulse],
        KeyCode::Char(c) => match param_key(c) {
            Some((name, delta)) => vec![InputEvent::AdjustParam(name, delta)],
            None => vec![],
        },

        _ => vec![],
    }
}

// knob-style keys, one pair per chain parameter
fn param_key(c: char) -> Option<(ParamName, f32)> {
    let knob = match c {
        '[' => (ParamName::FilterCutoff, -100.0),
        ']' => (ParamName::FilterCutoff, 100.0),
        '{' => (ParamName::FilterResonance, -1.0),
        '}' => (ParamName::FilterResonance, 1.0),
        ',' => (ParamName::ReverbMix, -0.05),
        '.' => (ParamName::ReverbMix, 0.05),
        ';' => (ParamName::DelayTime, -0.05),
        '\'' => (ParamName::DelayTime, 0.05),
        ':' => (ParamName::DelayFeedback, -0.05),
        '"' => (ParamName::DelayFeedback, 0.05),
        '(' => (ParamName::Distortion, -0.05),
        ')' => (ParamName::Distortion, 0.05),
        _ => return None,
    };
    Some(knob)
}
