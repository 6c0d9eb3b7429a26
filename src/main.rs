use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfsnip::app::{App, run_with_event_source};
use pdfsnip::display::{CellGeometry, detect_protocol};
use pdfsnip::event_source::TerminalEventSource;
use pdfsnip::panic_handler;
use pdfsnip::recent::RecentFiles;

/// Crop a region of a PDF page and export it as SVG, from the terminal.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// PDF to open: a path, file:// URL or http(s):// URL,
    /// optionally with a #page=N fragment
    input: Option<String>,

    /// 1-indexed page to open at (overrides any #page= fragment)
    #[arg(short, long)]
    page: Option<usize>,

    /// Log file location
    #[arg(long, default_value = "pdfsnip.log")]
    log_file: PathBuf,

    /// Write debug-level logs
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(level, Config::default(), File::create(&args.log_file)?)?;

    info!("Starting pdfsnip");
    panic_handler::initialize_panic_handler();

    // Terminal initialization
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let protocol = detect_protocol();
    let cells = CellGeometry::probe();
    info!("display protocol: {protocol:?}, cell size: {cells:?}");

    let recent = RecentFiles::load_or_ephemeral(RecentFiles::default_path());
    let mut app = App::new(protocol, cells, recent);

    if let Some(input) = &args.input {
        app.open_source(input);
        if let Some(page) = args.page {
            app.goto_page_number(page);
        }
    }

    let mut events = TerminalEventSource;
    let res = run_with_event_source(&mut app, &mut terminal, &mut events);

    // Restore terminal
    let _ = pdfsnip::display::kitty::delete_all(&mut std::io::stdout());
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down pdfsnip");
    Ok(())
}
