use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use stepgrid::Middle;
use stepgrid::pipeline::config;
use stepgrid::shared::InputEvent;
use stepgrid::tui;

const FRAME: Duration = Duration::from_millis(16); // ~60fps
const LOG_FILE: &str = "stepgrid.log";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(project_dir: &Path, verbose: bool) {
    use simplelog::*;

    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    // the terminal belongs to the ui, so logs go to a file
    let file = File::create(project_dir.join(LOG_FILE))
        .or_else(|_| File::create(std::env::temp_dir().join(LOG_FILE)));
    match file {
        Ok(file) => {
            if WriteLogger::init(level, Config::default(), file).is_err() {
                eprintln!("stepgrid: logger already initialized");
            }
        }
        Err(e) => eprintln!("stepgrid: no log file ({e}), logging disabled"),
    }
    log::info!("stepgrid starting (log level: {level:?})");
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    let project_dir: PathBuf = match args.iter().find(|a| !a.starts_with('-')) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("no working directory")?,
    };
    init_logging(&project_dir, verbose);

    let config = config::load_config(&project_dir)?;
    let mut middle = Middle::new(config).context("starting engine")?;
    middle.initialize().context("opening audio output")?;

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let mut tui_state = tui::mode::TuiState::new(middle.matrix_size());
    let mut status: Option<String> = None;

    loop {
        let mut ds = middle.display_state();
        tui_state.sync_size(ds.size);
        tui_state.playing = ds.playing;
        if ds.status.is_none() {
            ds.status = status.clone();
        }

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &mut tui_state);
        })?;

        // input gets a sliver of the frame; the rest goes to scheduler ticks
        let events = tui::input::poll_input(Duration::from_millis(1), &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                middle.cleanup();
                drop(term);
                return Ok(());
            }
            status = match middle.handle_input(event) {
                Ok(()) => None,
                Err(e) => {
                    log::warn!(target: "engine", "{e}");
                    Some(e.to_string())
                }
            };
        }

        middle.pump_for(FRAME);
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
