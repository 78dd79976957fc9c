use anyhow::{Context, Result};
use clap::Parser;
use country_dash::app::App;
use country_dash::client::HttpCountryClient;
use country_dash::config::AppConfig;
use country_dash::map::MapRenderer;
use country_dash::workflow::Launcher;
use country_dash::{data, ui};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// GeoJSON FeatureCollection of countries
    #[arg(short, long, value_name = "FILE")]
    world: Option<PathBuf>,

    /// REST lookup base URL, the country code is appended
    #[arg(long, value_name = "URL")]
    rest_url: Option<String>,

    #[arg(long, value_name = "URL")]
    graphql_url: Option<String>,

    /// Per-request timeout
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Settings file (or defaults) with command line overrides applied
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::default(),
        };
        if let Some(world) = &self.world {
            config.data.world = world.clone();
        }
        if let Some(url) = &self.rest_url {
            config.endpoints.rest = url.clone();
        }
        if let Some(url) = &self.graphql_url {
            config.endpoints.graphql = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.endpoints.timeout_secs = secs;
        }
        if let Some(file) = &self.log_file {
            config.log.file = file.clone();
        }
        Ok(config)
    }
}

/// Log to a file, the terminal belongs to the UI
fn init_logging(config: &AppConfig) -> Result<()> {
    let file = File::create(&config.log.file)
        .with_context(|| format!("Failed to create log file: {:?}", config.log.file))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(&config)?;

    let atlas = data::load_world(&config.data.world)?;
    info!(regions = atlas.len(), "world loaded");
    if !MapRenderer::new(&atlas.shapes).has_data() {
        warn!(world = ?config.data.world, "world has no outlines to draw");
    }

    // Lookups run on the runtime, the UI loop stays on this thread
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let _guard = runtime.enter();
    let source = Arc::new(HttpCountryClient::new(&config.endpoints)?);
    let (launcher, completions) = Launcher::new(source);

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let app = App::new(atlas, launcher, completions, size.width as usize, size.height as usize);
    let result = run(&mut terminal, app);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    // The map sits behind the dialog and alerts
    if app.dashboard.is_dialog_open() || app.dashboard.front_alert().is_some() {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.begin_drag(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    // An alert blocks everything until dismissed
    if app.dashboard.front_alert().is_some() {
        if matches!(code, KeyCode::Enter | KeyCode::Esc) {
            app.dashboard.dismiss_alert();
        }
        return;
    }

    if app.dashboard.is_dialog_open() {
        if code == KeyCode::Esc {
            app.close_dialog();
        }
        return;
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        KeyCode::Char('n') | KeyCode::Tab => app.move_cursor(1),
        KeyCode::Char('p') | KeyCode::BackTab => app.move_cursor(-1),
        KeyCode::Char(' ') => app.toggle_cursor_region(),
        KeyCode::Char('c') => app.clear_selection(),

        KeyCode::Char('r') | KeyCode::Char('R') => app.open_dialog("REST"),
        KeyCode::Char('g') | KeyCode::Char('G') => app.open_dialog("GraphQL"),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        app.drain_completions();
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps, also the latency for applying finished lookups
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key.code),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
